use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace_span, warn};

use crate::{
    database::models::{recipe::Recipe, tag::Tag},
    error::AppError,
    relations::RelationKind,
    short_link::ShortLinkAllocator,
    store::{RecipeFilter, RecipeRecord, RelationStore},
    users::{author_view, AuthorView},
};

pub const MAX_NAME_LENGTH: usize = 256;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i32,
}

/// Inbound shape of a recipe, used for both create and update.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.ingredients.is_empty() {
            return Err(invalid("A recipe needs at least one ingredient"));
        }
        if !self.ingredients.iter().map(|line| line.id).all_unique() {
            return Err(invalid("Ingredients must not repeat"));
        }
        if self.ingredients.iter().any(|line| line.amount < 1) {
            return Err(invalid("Ingredient amount must be at least 1"));
        }

        if self.tags.is_empty() {
            return Err(invalid("A recipe needs at least one tag"));
        }
        if !self.tags.iter().all_unique() {
            return Err(invalid("Tags must not repeat"));
        }

        if self.cooking_time < 1 {
            return Err(invalid("Cooking time must be at least 1 minute"));
        }

        let name_length = self.name.chars().count();
        if name_length == 0 || name_length > MAX_NAME_LENGTH {
            return Err(AppError::ValidationFailed(format!(
                "Recipe name must be 1 to {MAX_NAME_LENGTH} characters long"
            )));
        }
        if self.image.trim().is_empty() {
            return Err(invalid("Recipe image is required"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::ValidationFailed(message.to_owned())
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientView {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Outbound shape of a single recipe, flags computed for the viewer.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeView {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: AuthorView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Short form returned by relation endpoints and inside subscriptions.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Query parameters of the recipe list after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author: Option<i64>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Stores the recipe and gives it a short link.
///
/// A recipe that could not get a link is removed again so no recipe exists
/// without one.
pub fn create_recipe(
    store: &dyn RelationStore,
    allocator: &ShortLinkAllocator,
    author_id: i64,
    draft: &RecipeDraft,
) -> Result<RecipeView, AppError> {
    let span = trace_span!("creating recipe", author_id);
    let _guard = span.enter();

    draft.validate()?;

    let recipe_id = store.insert_recipe(author_id, draft)?;

    if let Err(err) = allocator.allocate(store, recipe_id) {
        warn!("Removing recipe {recipe_id}, no short link: {err}");
        if let Err(cleanup) = store.delete_recipe(recipe_id) {
            error!("Failed to remove recipe {recipe_id} without short link: {cleanup}");
        }
        return Err(err);
    }

    info!("User {author_id} created recipe {recipe_id}");
    get_recipe(store, recipe_id, Some(author_id))
}

pub fn update_recipe(
    store: &dyn RelationStore,
    user_id: i64,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<RecipeView, AppError> {
    let span = trace_span!("updating recipe", user_id, recipe_id);
    let _guard = span.enter();

    ensure_author(store, user_id, recipe_id)?;
    draft.validate()?;

    store.update_recipe(recipe_id, draft)?;
    debug!("User {user_id} updated recipe {recipe_id}");

    get_recipe(store, recipe_id, Some(user_id))
}

pub fn delete_recipe(store: &dyn RelationStore, user_id: i64, recipe_id: i64) -> Result<(), AppError> {
    let span = trace_span!("deleting recipe", user_id, recipe_id);
    let _guard = span.enter();

    ensure_author(store, user_id, recipe_id)?;

    if !store.delete_recipe(recipe_id)? {
        return Err(AppError::NotFound("Recipe"));
    }
    info!("User {user_id} deleted recipe {recipe_id}");

    Ok(())
}

fn ensure_author(store: &dyn RelationStore, user_id: i64, recipe_id: i64) -> Result<(), AppError> {
    let record = store
        .find_recipe(recipe_id)?
        .ok_or(AppError::NotFound("Recipe"))?;

    if record.recipe.author_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn get_recipe(
    store: &dyn RelationStore,
    recipe_id: i64,
    viewer: Option<i64>,
) -> Result<RecipeView, AppError> {
    let record = store
        .find_recipe(recipe_id)?
        .ok_or(AppError::NotFound("Recipe"))?;

    recipe_view(store, record, viewer)
}

/// Recipes matching the query, newest first.
///
/// Anonymous callers have no favorites or cart, so asking for either yields
/// nothing.
pub fn list_recipes(
    store: &dyn RelationStore,
    query: &RecipeQuery,
    viewer: Option<i64>,
) -> Result<Vec<RecipeView>, AppError> {
    if viewer.is_none() && (query.is_favorited || query.is_in_shopping_cart) {
        debug!("Relation filter without a viewer, returning no recipes");
        return Ok(Vec::new());
    }

    let filter = RecipeFilter {
        author_id: query.author,
        tag_slugs: query.tags.clone(),
        favorited_by: viewer.filter(|_| query.is_favorited),
        in_cart_of: viewer.filter(|_| query.is_in_shopping_cart),
    };

    store
        .list_recipes(&filter)?
        .into_iter()
        .map(|recipe_id| get_recipe(store, recipe_id, viewer))
        .collect()
}

pub fn recipe_summary(store: &dyn RelationStore, recipe_id: i64) -> Result<RecipeSummary, AppError> {
    store
        .find_recipe(recipe_id)?
        .map(|record| RecipeSummary::from(record.recipe))
        .ok_or(AppError::NotFound("Recipe"))
}

fn recipe_view(
    store: &dyn RelationStore,
    record: RecipeRecord,
    viewer: Option<i64>,
) -> Result<RecipeView, AppError> {
    let RecipeRecord {
        recipe,
        author,
        tags,
        ingredients,
    } = record;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            store.relation_exists(RelationKind::Favorite, user_id, recipe.id)?,
            store.relation_exists(RelationKind::ShoppingCart, user_id, recipe.id)?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author: author_view(store, author, viewer)?,
        ingredients: ingredients
            .into_iter()
            .map(|line| RecipeIngredientView {
                id: line.ingredient_id,
                name: line.name,
                measurement_unit: line.measurement_unit,
                amount: line.amount,
            })
            .collect(),
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}
