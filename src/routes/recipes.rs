use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    auth::{authenticate, CurrentUser},
    error::AppError,
    recipes::{self, RecipeDraft, RecipeQuery, RecipeSummary, RecipeView},
    relations::{RelationKind, RelationshipGuard},
    shopping::{build_shopping_list, render_as_table},
    state::{blocking, SharedState},
};

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true")
}

/// Folds raw query pairs into a [`RecipeQuery`]; `tags` may repeat.
fn parse_query(pairs: Vec<(String, String)>) -> Result<RecipeQuery, AppError> {
    let mut query = RecipeQuery::default();

    for (key, value) in pairs {
        match key.as_str() {
            "author" => {
                let author = value.parse().map_err(|_| {
                    AppError::ValidationFailed(format!("Invalid author id {value:?}"))
                })?;
                query.author = Some(author);
            }
            "tags" => query.tags.push(value),
            "is_favorited" => query.is_favorited = parse_flag(&value),
            "is_in_shopping_cart" => query.is_in_shopping_cart = parse_flag(&value),
            _ => {}
        }
    }

    Ok(query)
}

pub async fn list_recipes(
    State(state): State<SharedState>,
    viewer: CurrentUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<RecipeView>>, AppError> {
    let query = parse_query(pairs)?;

    let views = blocking(&state, move |state| {
        recipes::list_recipes(state.store.as_ref(), &query, viewer.0)
    })
    .await?;

    Ok(Json(views))
}

pub async fn create_recipe(
    State(state): State<SharedState>,
    user: CurrentUser,
    payload: Result<Json<RecipeDraft>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = user.require()?;
    let Json(draft) = payload?;

    let view = blocking(&state, move |state| {
        authenticate(state.store.as_ref(), author_id)?;
        recipes::create_recipe(state.store.as_ref(), &state.allocator, author_id, &draft)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_recipe(
    State(state): State<SharedState>,
    viewer: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<Json<RecipeView>, AppError> {
    let view = blocking(&state, move |state| {
        recipes::get_recipe(state.store.as_ref(), recipe_id, viewer.0)
    })
    .await?;

    Ok(Json(view))
}

pub async fn update_recipe(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
    payload: Result<Json<RecipeDraft>, JsonRejection>,
) -> Result<Json<RecipeView>, AppError> {
    let user_id = user.require()?;
    let Json(draft) = payload?;

    let view = blocking(&state, move |state| {
        authenticate(state.store.as_ref(), user_id)?;
        recipes::update_recipe(state.store.as_ref(), user_id, recipe_id, &draft)
    })
    .await?;

    Ok(Json(view))
}

pub async fn delete_recipe(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user_id = user.require()?;

    blocking(&state, move |state| {
        authenticate(state.store.as_ref(), user_id)?;
        recipes::delete_recipe(state.store.as_ref(), user_id, recipe_id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_relation(
    state: SharedState,
    user: CurrentUser,
    kind: RelationKind,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeSummary>), AppError> {
    let user_id = user.require()?;

    let summary = blocking(&state, move |state| {
        let store = state.store.as_ref();
        authenticate(store, user_id)?;
        RelationshipGuard::new(store).add(kind, user_id, recipe_id)?;
        recipes::recipe_summary(store, recipe_id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

async fn remove_relation(
    state: SharedState,
    user: CurrentUser,
    kind: RelationKind,
    recipe_id: i64,
) -> Result<StatusCode, AppError> {
    let user_id = user.require()?;

    blocking(&state, move |state| {
        authenticate(state.store.as_ref(), user_id)?;
        RelationshipGuard::new(state.store.as_ref()).remove(kind, user_id, recipe_id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    add_relation(state, user, RelationKind::Favorite, recipe_id).await
}

pub async fn remove_favorite(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    remove_relation(state, user, RelationKind::Favorite, recipe_id).await
}

pub async fn add_to_cart(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    add_relation(state, user, RelationKind::ShoppingCart, recipe_id).await
}

pub async fn remove_from_cart(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    remove_relation(state, user, RelationKind::ShoppingCart, recipe_id).await
}

pub async fn download_shopping_cart(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.require()?;

    let table = blocking(&state, move |state| {
        authenticate(state.store.as_ref(), user_id)?;
        let items = build_shopping_list(state.store.as_ref(), user_id)?;
        render_as_table(&items)
    })
    .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.config.export_filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        table,
    ))
}
