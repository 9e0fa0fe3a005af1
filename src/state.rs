use std::sync::Arc;

use tokio::task::spawn_blocking;

use crate::{
    config::Config, error::AppError, short_link::ShortLinkAllocator, store::RelationStore,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RelationStore>,
    pub allocator: ShortLinkAllocator,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RelationStore>) -> SharedState {
        let allocator = ShortLinkAllocator::new(config.short_link_length, config.short_link_attempts);

        Arc::new(Self {
            config,
            store,
            allocator,
        })
    }
}

/// Runs store work on the blocking pool; diesel calls are synchronous.
pub async fn blocking<T, F>(state: &SharedState, work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, AppError> + Send + 'static,
{
    let state = Arc::clone(state);

    spawn_blocking(move || work(&state))
        .await
        .map_err(|err| AppError::Internal(format!("Blocking task failed: {err}")))?
}
