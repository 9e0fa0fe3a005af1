use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    auth::{authenticate, CurrentUser},
    error::AppError,
    relations::{RelationKind, RelationshipGuard},
    state::{blocking, SharedState},
    users::{self, SubscriptionView},
};

#[derive(Deserialize, Debug, Default)]
pub struct RecipesLimit {
    recipes_limit: Option<usize>,
}

pub async fn list_subscriptions(
    State(state): State<SharedState>,
    user: CurrentUser,
    Query(limit): Query<RecipesLimit>,
) -> Result<Json<Vec<SubscriptionView>>, AppError> {
    let user_id = user.require()?;

    let views = blocking(&state, move |state| {
        authenticate(state.store.as_ref(), user_id)?;
        users::list_subscriptions(state.store.as_ref(), user_id, limit.recipes_limit)
    })
    .await?;

    Ok(Json(views))
}

pub async fn subscribe(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(author_id): Path<i64>,
    Query(limit): Query<RecipesLimit>,
) -> Result<(StatusCode, Json<SubscriptionView>), AppError> {
    let user_id = user.require()?;

    let view = blocking(&state, move |state| {
        let store = state.store.as_ref();
        authenticate(store, user_id)?;
        RelationshipGuard::new(store).add(RelationKind::Subscription, user_id, author_id)?;
        users::subscription_view(store, user_id, author_id, limit.recipes_limit)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(author_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user_id = user.require()?;

    blocking(&state, move |state| {
        authenticate(state.store.as_ref(), user_id)?;
        RelationshipGuard::new(state.store.as_ref()).remove(
            RelationKind::Subscription,
            user_id,
            author_id,
        )
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
