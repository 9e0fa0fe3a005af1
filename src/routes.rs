use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod catalog;
pub mod recipes;
pub mod short_links;
pub mod users;

/// Every endpoint of the service, with request tracing.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/tags/", get(catalog::list_tags))
        .route("/api/tags/{id}/", get(catalog::get_tag))
        .route("/api/ingredients/", get(catalog::list_ingredients))
        .route("/api/ingredients/{id}/", get(catalog::get_ingredient))
        .route(
            "/api/recipes/",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart/",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/api/recipes/{id}/",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/api/recipes/{id}/get-link/", get(short_links::get_link))
        .route(
            "/api/recipes/{id}/favorite/",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart/",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/api/users/subscriptions/", get(users::list_subscriptions))
        .route(
            "/api/users/{id}/subscribe/",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/s/{token}/", get(short_links::redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
