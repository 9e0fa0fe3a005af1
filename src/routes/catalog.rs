use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    database::models::{ingredient::Ingredient, tag::Tag},
    error::AppError,
    state::{blocking, SharedState},
};

#[derive(Deserialize, Debug, Default)]
pub struct IngredientSearch {
    name: Option<String>,
}

pub async fn list_tags(State(state): State<SharedState>) -> Result<Json<Vec<Tag>>, AppError> {
    let tags = blocking(&state, |state| Ok(state.store.list_tags()?)).await?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<SharedState>,
    Path(tag_id): Path<i64>,
) -> Result<Json<Tag>, AppError> {
    let tag = blocking(&state, move |state| {
        state.store.find_tag(tag_id)?.ok_or(AppError::NotFound("Tag"))
    })
    .await?;

    Ok(Json(tag))
}

pub async fn list_ingredients(
    State(state): State<SharedState>,
    Query(search): Query<IngredientSearch>,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    let ingredients = blocking(&state, move |state| {
        let prefix = search.name.as_deref().filter(|name| !name.is_empty());
        Ok(state.store.search_ingredients(prefix)?)
    })
    .await?;

    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<SharedState>,
    Path(ingredient_id): Path<i64>,
) -> Result<Json<Ingredient>, AppError> {
    let ingredient = blocking(&state, move |state| {
        state
            .store
            .find_ingredient(ingredient_id)?
            .ok_or(AppError::NotFound("Ingredient"))
    })
    .await?;

    Ok(Json(ingredient))
}
