use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    database::models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::Recipe,
        tag::{NewTag, Tag},
        user::User,
    },
    error::{StoreError, StoreResult},
    recipes::RecipeDraft,
    relations::RelationKind,
    shopping::ShoppingItem,
};

use super::{memory_store::MemoryStore, RecipeFilter, RecipeRecord, RelationStore};

/// [`MemoryStore`] with switchable failures for exercising error paths.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Existence checks answer "absent" and the first relation insert is
    /// preceded by a concurrent identical insert.
    pub racing_relations: bool,
    pub failing_deletes: bool,
    raced: AtomicBool,
}

impl FaultyStore {
    pub fn racing(inner: MemoryStore) -> Self {
        Self {
            inner,
            racing_relations: true,
            ..Default::default()
        }
    }

    pub fn failing_deletes(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_deletes: true,
            ..Default::default()
        }
    }
}

impl RelationStore for FaultyStore {
    fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        self.inner.find_user(user_id)
    }
    fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        self.inner.list_tags()
    }
    fn find_tag(&self, tag_id: i64) -> StoreResult<Option<Tag>> {
        self.inner.find_tag(tag_id)
    }
    fn insert_tags(&self, tags: &[NewTag]) -> StoreResult<usize> {
        self.inner.insert_tags(tags)
    }
    fn search_ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        self.inner.search_ingredients(name_prefix)
    }
    fn find_ingredient(&self, ingredient_id: i64) -> StoreResult<Option<Ingredient>> {
        self.inner.find_ingredient(ingredient_id)
    }
    fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> StoreResult<usize> {
        self.inner.insert_ingredients(ingredients)
    }
    fn insert_recipe(&self, author_id: i64, draft: &RecipeDraft) -> StoreResult<i64> {
        self.inner.insert_recipe(author_id, draft)
    }
    fn update_recipe(&self, recipe_id: i64, draft: &RecipeDraft) -> StoreResult<()> {
        self.inner.update_recipe(recipe_id, draft)
    }
    fn delete_recipe(&self, recipe_id: i64) -> StoreResult<bool> {
        if self.failing_deletes {
            return Err(StoreError::NotFound);
        }
        self.inner.delete_recipe(recipe_id)
    }
    fn recipe_exists(&self, recipe_id: i64) -> StoreResult<bool> {
        self.inner.recipe_exists(recipe_id)
    }
    fn find_recipe(&self, recipe_id: i64) -> StoreResult<Option<RecipeRecord>> {
        self.inner.find_recipe(recipe_id)
    }
    fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<Vec<i64>> {
        self.inner.list_recipes(filter)
    }
    fn recipes_by_author(&self, author_id: i64, limit: Option<usize>) -> StoreResult<Vec<Recipe>> {
        self.inner.recipes_by_author(author_id, limit)
    }
    fn count_recipes_by_author(&self, author_id: i64) -> StoreResult<i64> {
        self.inner.count_recipes_by_author(author_id)
    }
    fn relation_exists(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<bool> {
        if self.racing_relations {
            return Ok(false);
        }
        self.inner.relation_exists(kind, user_id, target_id)
    }
    fn insert_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<()> {
        if self.racing_relations && !self.raced.swap(true, Ordering::SeqCst) {
            self.inner.insert_relation(kind, user_id, target_id)?;
        }
        self.inner.insert_relation(kind, user_id, target_id)
    }
    fn delete_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<usize> {
        self.inner.delete_relation(kind, user_id, target_id)
    }
    fn subscribed_authors(&self, user_id: i64) -> StoreResult<Vec<User>> {
        self.inner.subscribed_authors(user_id)
    }
    fn cart_ingredient_totals(&self, user_id: i64) -> StoreResult<Vec<ShoppingItem>> {
        self.inner.cart_ingredient_totals(user_id)
    }
    fn insert_short_link(&self, recipe_id: i64, token: &str) -> StoreResult<()> {
        self.inner.insert_short_link(recipe_id, token)
    }
    fn resolve_short_link(&self, token: &str) -> StoreResult<Option<i64>> {
        self.inner.resolve_short_link(token)
    }
    fn short_link_for_recipe(&self, recipe_id: i64) -> StoreResult<Option<String>> {
        self.inner.short_link_for_recipe(recipe_id)
    }
}
