use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::AppError,
    state::{blocking, SharedState},
};

/// Short link for a recipe as `<host>/s/<token>/`, taking the host from the request.
pub async fn get_link(
    State(state): State<SharedState>,
    Path(recipe_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = blocking(&state, move |state| {
        if !state.store.recipe_exists(recipe_id)? {
            return Err(AppError::NotFound("Recipe"));
        }
        state.allocator.link_for(state.store.as_ref(), recipe_id)
    })
    .await?;

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    Ok(Json(json!({ "short-link": format!("{host}/s/{token}/") })))
}

pub async fn redirect(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recipe_id = blocking(&state, move |state| {
        state.allocator.resolve(state.store.as_ref(), &token)
    })
    .await?;
    debug!("Redirecting short link to recipe {recipe_id}");

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, format!("/recipes/{recipe_id}/"))],
    ))
}
