//! Foodgram recipe backend.
//!
//! Users publish recipes, favorite them, collect them in a shopping cart and
//! follow other authors. The cart can be exported as one summed shopping list,
//! and every recipe gets a short link that redirects to its page.
//!
//! # Layout
//! - [`store`]: the [`RelationStore`](store::RelationStore) repository, backed by
//!   PostgreSQL through diesel or by an in-memory map set.
//! - [`shopping`]: cart aggregation and CSV export.
//! - [`relations`]: add and remove rules for favorites, cart entries and subscriptions.
//! - [`short_link`]: token allocation and resolution.
//! - [`recipes`], [`users`]: use cases and their read models.
//! - [`routes`]: the axum HTTP surface.
//!
//! # Setup
//!
//! Apply migrations with the diesel CLI.
//! ```sh
//! diesel migration run
//! ```
//!
//! Load ingredient fixtures.
//! ```sh
//! cargo run --bin import-data -- ingredients data/ingredients.csv
//! ```
//!
//! Start the server.
//! ```sh
//! cargo run
//! ```
use std::{sync::Arc, time::Duration};

use axum::http::{header::CONTENT_TYPE, HeaderName, Method};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod fixtures;
pub mod recipes;
pub mod relations;
pub mod routes;
pub mod shopping;
pub mod short_link;
pub mod state;
pub mod store;
pub mod users;

use config::Config;
use database::connection::establish_pooled_connection;
use error::StartError;
use state::AppState;
use store::pg_store::PgStore;

pub async fn start_server() -> Result<(), StartError> {
    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Connecting to database...");
    let pool = establish_pooled_connection(&config.database_url, config.pool_size)?;
    let state = AppState::new(config, Arc::new(PgStore::new(pool)));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(auth::USER_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    let app = routes::router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartError::Serve)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!("Failed to listen for Ctrl+C: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
