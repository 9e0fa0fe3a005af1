#[cfg(test)]
pub mod faulty_store;
pub mod memory_store;
pub mod pg_store;

use crate::{
    database::models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::Recipe,
        tag::{NewTag, Tag},
        user::User,
    },
    error::StoreResult,
    recipes::RecipeDraft,
    relations::RelationKind,
    shopping::ShoppingItem,
};

/// One ingredient line of a recipe, joined with the ingredient it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientLine {
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A recipe row together with everything needed to render it.
#[derive(Debug, Clone)]
pub struct RecipeRecord {
    pub recipe: Recipe,
    pub author: User,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredientLine>,
}

/// Narrowing applied by [`RelationStore::list_recipes`]; every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,
    /// Recipes carrying any of these tag slugs.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
}

/// Repository over the relational schema.
///
/// Implementations must enforce the schema's unique keys and report a
/// collision as [`StoreError::UniqueViolation`](crate::error::StoreError::UniqueViolation),
/// and must cascade recipe deletion to every row referencing the recipe.
pub trait RelationStore: Send + Sync {
    fn find_user(&self, user_id: i64) -> StoreResult<Option<User>>;

    fn list_tags(&self) -> StoreResult<Vec<Tag>>;
    fn find_tag(&self, tag_id: i64) -> StoreResult<Option<Tag>>;
    fn insert_tags(&self, tags: &[NewTag]) -> StoreResult<usize>;

    /// Ingredients ordered by name, optionally narrowed to a case-insensitive name prefix.
    fn search_ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>>;
    fn find_ingredient(&self, ingredient_id: i64) -> StoreResult<Option<Ingredient>>;
    /// Returns the number of inserted rows, rows hitting an existing (name, unit) pair are skipped.
    fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> StoreResult<usize>;

    /// Stores the recipe with its ingredient and tag rows atomically, returning the new id.
    fn insert_recipe(&self, author_id: i64, draft: &RecipeDraft) -> StoreResult<i64>;
    /// Replaces the recipe's fields, ingredient rows and tag rows atomically.
    fn update_recipe(&self, recipe_id: i64, draft: &RecipeDraft) -> StoreResult<()>;
    fn delete_recipe(&self, recipe_id: i64) -> StoreResult<bool>;
    fn recipe_exists(&self, recipe_id: i64) -> StoreResult<bool>;
    fn find_recipe(&self, recipe_id: i64) -> StoreResult<Option<RecipeRecord>>;
    /// Matching recipe ids, newest first.
    fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<Vec<i64>>;
    fn recipes_by_author(&self, author_id: i64, limit: Option<usize>) -> StoreResult<Vec<Recipe>>;
    fn count_recipes_by_author(&self, author_id: i64) -> StoreResult<i64>;

    fn relation_exists(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<bool>;
    fn insert_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<()>;
    fn delete_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<usize>;
    /// Authors the user is subscribed to, ordered by username.
    fn subscribed_authors(&self, user_id: i64) -> StoreResult<Vec<User>>;

    /// Cart ingredient amounts summed per (name, measurement unit), ordered by name.
    fn cart_ingredient_totals(&self, user_id: i64) -> StoreResult<Vec<ShoppingItem>>;

    fn insert_short_link(&self, recipe_id: i64, token: &str) -> StoreResult<()>;
    fn resolve_short_link(&self, token: &str) -> StoreResult<Option<i64>>;
    fn short_link_for_recipe(&self, recipe_id: i64) -> StoreResult<Option<String>>;
}
