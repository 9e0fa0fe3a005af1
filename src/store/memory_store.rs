use std::{
    collections::{BTreeMap, BTreeSet},
    time::SystemTime,
};

use parking_lot::Mutex;
use tracing::trace;

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
    shopping::{ShoppingItem, ShoppingList},
};

use super::{RecipeFilter, RecipeIngredientLine, RecipeRecord, RelationStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, Tag>,
    ingredients: BTreeMap<i64, Ingredient>,
    recipes: BTreeMap<i64, Recipe>,
    // (recipe, ingredient, amount) in insertion order
    recipe_ingredients: Vec<(i64, i64, i32)>,
    recipe_tags: Vec<(i64, i64)>,
    favorites: BTreeSet<(i64, i64)>,
    shopping_carts: BTreeSet<(i64, i64)>,
    subscriptions: BTreeSet<(i64, i64)>,
    short_links: BTreeMap<String, i64>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn relation(&self, kind: RelationKind) -> &BTreeSet<(i64, i64)> {
        match kind {
            RelationKind::Favorite => &self.favorites,
            RelationKind::ShoppingCart => &self.shopping_carts,
            RelationKind::Subscription => &self.subscriptions,
        }
    }

    fn relation_mut(&mut self, kind: RelationKind) -> &mut BTreeSet<(i64, i64)> {
        match kind {
            RelationKind::Favorite => &mut self.favorites,
            RelationKind::ShoppingCart => &mut self.shopping_carts,
            RelationKind::Subscription => &mut self.subscriptions,
        }
    }

    fn check_components(&self, draft: &RecipeDraft) -> StoreResult<()> {
        let ingredients_known = draft
            .ingredients
            .iter()
            .all(|line| self.ingredients.contains_key(&line.id));
        let tags_known = draft.tags.iter().all(|tag_id| self.tags.contains_key(tag_id));

        if ingredients_known && tags_known {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation)
        }
    }

    fn replace_components(&mut self, recipe_id: i64, draft: &RecipeDraft) {
        self.recipe_ingredients.retain(|(recipe, _, _)| *recipe != recipe_id);
        self.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);

        self.recipe_ingredients.extend(
            draft
                .ingredients
                .iter()
                .map(|line| (recipe_id, line.id, line.amount)),
        );
        self.recipe_tags
            .extend(draft.tags.iter().map(|tag_id| (recipe_id, *tag_id)));
    }

    fn newest_first(&self, mut recipes: Vec<&Recipe>) -> Vec<Recipe> {
        recipes.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        recipes.into_iter().cloned().collect()
    }
}

/// In-process store holding every table in a single lock.
///
/// Mirrors the unique keys, foreign keys and cascades of the SQL schema so the
/// domain layer can be exercised without a database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts are managed elsewhere; this only seeds the users table.
    pub fn insert_user(&self, email: &str, username: &str, first_name: &str, last_name: &str) -> i64 {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.users.insert(
            id,
            User::new(
                id,
                email.to_owned(),
                username.to_owned(),
                first_name.to_owned(),
                last_name.to_owned(),
            ),
        );
        id
    }

    pub fn insert_ingredient(&self, name: &str, measurement_unit: &str) -> i64 {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.ingredients.insert(
            id,
            Ingredient::new(id, name.to_owned(), measurement_unit.to_owned()),
        );
        id
    }

    pub fn insert_tag(&self, name: &str, slug: &str) -> i64 {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables
            .tags
            .insert(id, Tag::new(id, name.to_owned(), slug.to_owned()));
        id
    }
}

impl RelationStore for MemoryStore {
    fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().users.get(&user_id).cloned())
    }

    fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.tables.lock().tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn find_tag(&self, tag_id: i64) -> StoreResult<Option<Tag>> {
        Ok(self.tables.lock().tags.get(&tag_id).cloned())
    }

    fn insert_tags(&self, new_tags: &[NewTag]) -> StoreResult<usize> {
        let mut tables = self.tables.lock();
        let mut inserted = 0;

        for new_tag in new_tags {
            let taken = tables
                .tags
                .values()
                .any(|tag| tag.name == new_tag.name || tag.slug == new_tag.slug);
            if taken {
                continue;
            }

            let id = tables.next_id();
            tables
                .tags
                .insert(id, Tag::new(id, new_tag.name.clone(), new_tag.slug.clone()));
            inserted += 1;
        }

        Ok(inserted)
    }

    fn search_ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let prefix = name_prefix.map(str::to_lowercase);

        let mut found: Vec<Ingredient> = self
            .tables
            .lock()
            .ingredients
            .values()
            .filter(|ingredient| match &prefix {
                Some(prefix) => ingredient.name.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            (&a.name, &a.measurement_unit).cmp(&(&b.name, &b.measurement_unit))
        });
        Ok(found)
    }

    fn find_ingredient(&self, ingredient_id: i64) -> StoreResult<Option<Ingredient>> {
        Ok(self.tables.lock().ingredients.get(&ingredient_id).cloned())
    }

    fn insert_ingredients(&self, new_ingredients: &[NewIngredient]) -> StoreResult<usize> {
        let mut tables = self.tables.lock();
        let mut inserted = 0;

        for new_ingredient in new_ingredients {
            let taken = tables.ingredients.values().any(|ingredient| {
                ingredient.name == new_ingredient.name
                    && ingredient.measurement_unit == new_ingredient.measurement_unit
            });
            if taken {
                continue;
            }

            let id = tables.next_id();
            tables.ingredients.insert(
                id,
                Ingredient::new(
                    id,
                    new_ingredient.name.clone(),
                    new_ingredient.measurement_unit.clone(),
                ),
            );
            inserted += 1;
        }

        Ok(inserted)
    }

    fn insert_recipe(&self, author_id: i64, draft: &RecipeDraft) -> StoreResult<i64> {
        let mut tables = self.tables.lock();

        if !tables.users.contains_key(&author_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        tables.check_components(draft)?;

        let id = tables.next_id();
        tables.recipes.insert(
            id,
            Recipe {
                id,
                name: draft.name.clone(),
                text: draft.text.clone(),
                image: draft.image.clone(),
                cooking_time: draft.cooking_time,
                author_id,
                created_at: SystemTime::now(),
            },
        );
        tables.replace_components(id, draft);
        trace!("Stored recipe {id} in memory");

        Ok(id)
    }

    fn update_recipe(&self, recipe_id: i64, draft: &RecipeDraft) -> StoreResult<()> {
        let mut tables = self.tables.lock();

        if !tables.recipes.contains_key(&recipe_id) {
            return Err(StoreError::NotFound);
        }
        tables.check_components(draft)?;

        if let Some(recipe) = tables.recipes.get_mut(&recipe_id) {
            recipe.name = draft.name.clone();
            recipe.text = draft.text.clone();
            recipe.image = draft.image.clone();
            recipe.cooking_time = draft.cooking_time;
        }
        tables.replace_components(recipe_id, draft);

        Ok(())
    }

    fn delete_recipe(&self, recipe_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock();

        if tables.recipes.remove(&recipe_id).is_none() {
            return Ok(false);
        }

        tables.recipe_ingredients.retain(|(recipe, _, _)| *recipe != recipe_id);
        tables.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
        tables.favorites.retain(|(_, recipe)| *recipe != recipe_id);
        tables.shopping_carts.retain(|(_, recipe)| *recipe != recipe_id);
        tables.short_links.retain(|_, recipe| *recipe != recipe_id);

        Ok(true)
    }

    fn recipe_exists(&self, recipe_id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().recipes.contains_key(&recipe_id))
    }

    fn find_recipe(&self, recipe_id: i64) -> StoreResult<Option<RecipeRecord>> {
        let tables = self.tables.lock();

        let Some(recipe) = tables.recipes.get(&recipe_id).cloned() else {
            return Ok(None);
        };
        let author = tables
            .users
            .get(&recipe.author_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        let mut tag_list: Vec<Tag> = tables
            .recipe_tags
            .iter()
            .filter(|(recipe, _)| *recipe == recipe_id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect();
        tag_list.sort_by_key(|tag| tag.id);

        let ingredients = tables
            .recipe_ingredients
            .iter()
            .filter(|(recipe, _, _)| *recipe == recipe_id)
            .filter_map(|(_, ingredient_id, amount)| {
                tables
                    .ingredients
                    .get(ingredient_id)
                    .map(|ingredient| RecipeIngredientLine {
                        ingredient_id: ingredient.id,
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: *amount,
                    })
            })
            .collect();

        Ok(Some(RecipeRecord {
            recipe,
            author,
            tags: tag_list,
            ingredients,
        }))
    }

    fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<Vec<i64>> {
        let tables = self.tables.lock();

        let matching = tables
            .recipes
            .values()
            .filter(|recipe| filter.author_id.map_or(true, |author| recipe.author_id == author))
            .filter(|recipe| {
                filter.tag_slugs.is_empty()
                    || tables.recipe_tags.iter().any(|(recipe_id, tag_id)| {
                        *recipe_id == recipe.id
                            && tables
                                .tags
                                .get(tag_id)
                                .is_some_and(|tag| filter.tag_slugs.contains(&tag.slug))
                    })
            })
            .filter(|recipe| {
                filter
                    .favorited_by
                    .map_or(true, |user| tables.favorites.contains(&(user, recipe.id)))
            })
            .filter(|recipe| {
                filter
                    .in_cart_of
                    .map_or(true, |user| tables.shopping_carts.contains(&(user, recipe.id)))
            })
            .collect();

        Ok(tables
            .newest_first(matching)
            .into_iter()
            .map(|recipe| recipe.id)
            .collect())
    }

    fn recipes_by_author(&self, author_id: i64, limit: Option<usize>) -> StoreResult<Vec<Recipe>> {
        let tables = self.tables.lock();

        let own = tables
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .collect();
        let mut recipes = tables.newest_first(own);

        if let Some(limit) = limit {
            recipes.truncate(limit);
        }
        Ok(recipes)
    }

    fn count_recipes_by_author(&self, author_id: i64) -> StoreResult<i64> {
        let count = self
            .tables
            .lock()
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .count();
        Ok(count as i64)
    }

    fn relation_exists(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().relation(kind).contains(&(user_id, target_id)))
    }

    fn insert_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.lock();

        let target_known = match kind {
            RelationKind::Favorite | RelationKind::ShoppingCart => {
                tables.recipes.contains_key(&target_id)
            }
            RelationKind::Subscription => tables.users.contains_key(&target_id),
        };
        if !tables.users.contains_key(&user_id) || !target_known {
            return Err(StoreError::ForeignKeyViolation);
        }

        if tables.relation_mut(kind).insert((user_id, target_id)) {
            Ok(())
        } else {
            Err(StoreError::UniqueViolation)
        }
    }

    fn delete_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<usize> {
        let removed = self
            .tables
            .lock()
            .relation_mut(kind)
            .remove(&(user_id, target_id));
        Ok(usize::from(removed))
    }

    fn subscribed_authors(&self, user_id: i64) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock();

        let mut authors: Vec<User> = tables
            .subscriptions
            .iter()
            .filter(|(subscriber, _)| *subscriber == user_id)
            .filter_map(|(_, author_id)| tables.users.get(author_id).cloned())
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(authors)
    }

    fn cart_ingredient_totals(&self, user_id: i64) -> StoreResult<Vec<ShoppingItem>> {
        let tables = self.tables.lock();

        let list: ShoppingList = tables
            .recipe_ingredients
            .iter()
            .filter(|(recipe_id, _, _)| tables.shopping_carts.contains(&(user_id, *recipe_id)))
            .filter_map(|(_, ingredient_id, amount)| {
                tables.ingredients.get(ingredient_id).map(|ingredient| {
                    ShoppingItem::new(
                        ingredient.name.clone(),
                        ingredient.measurement_unit.clone(),
                        i64::from(*amount),
                    )
                })
            })
            .collect();

        Ok(list.into_items())
    }

    fn insert_short_link(&self, recipe_id: i64, token: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock();

        if !tables.recipes.contains_key(&recipe_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        if tables.short_links.contains_key(token) {
            return Err(StoreError::UniqueViolation);
        }

        tables.short_links.insert(token.to_owned(), recipe_id);
        Ok(())
    }

    fn resolve_short_link(&self, token: &str) -> StoreResult<Option<i64>> {
        Ok(self.tables.lock().short_links.get(token).copied())
    }

    fn short_link_for_recipe(&self, recipe_id: i64) -> StoreResult<Option<String>> {
        Ok(self
            .tables
            .lock()
            .short_links
            .iter()
            .find(|(_, recipe)| **recipe == recipe_id)
            .map(|(token, _)| token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::IngredientAmount;

    fn draft(ingredients: Vec<IngredientAmount>, tags: Vec<i64>) -> RecipeDraft {
        RecipeDraft {
            ingredients,
            tags,
            image: "recipes/images/pie.png".to_owned(),
            name: "Pie".to_owned(),
            text: "Bake".to_owned(),
            cooking_time: 40,
        }
    }

    #[test]
    fn rejects_unknown_ingredient() {
        let store = MemoryStore::new();
        let author = store.insert_user("a@example.com", "a", "A", "A");

        let err = store
            .insert_recipe(author, &draft(vec![IngredientAmount { id: 999, amount: 1 }], vec![]))
            .unwrap_err();

        assert!(matches!(err, StoreError::ForeignKeyViolation));
    }

    #[test]
    fn lists_newest_first_and_filters_by_tag() {
        let store = MemoryStore::new();
        let author = store.insert_user("a@example.com", "a", "A", "A");
        let lunch = store.insert_tag("Lunch", "lunch");
        let dinner = store.insert_tag("Dinner", "dinner");

        let first = store.insert_recipe(author, &draft(vec![], vec![lunch])).unwrap();
        let second = store.insert_recipe(author, &draft(vec![], vec![dinner])).unwrap();

        assert_eq!(
            store.list_recipes(&RecipeFilter::default()).unwrap(),
            vec![second, first]
        );
        assert_eq!(
            store
                .list_recipes(&RecipeFilter {
                    tag_slugs: vec!["lunch".to_owned()],
                    ..Default::default()
                })
                .unwrap(),
            vec![first]
        );
    }

    #[test]
    fn skips_duplicate_ingredients_on_import() {
        let store = MemoryStore::new();
        store.insert_ingredient("Milk", "ml");

        let inserted = store
            .insert_ingredients(&[
                NewIngredient::new("Milk".to_owned(), "ml".to_owned()),
                NewIngredient::new("Milk".to_owned(), "l".to_owned()),
            ])
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.search_ingredients(Some("mi")).unwrap().len(), 2);
    }

    #[test]
    fn update_replaces_components() {
        let store = MemoryStore::new();
        let author = store.insert_user("a@example.com", "a", "A", "A");
        let milk = store.insert_ingredient("Milk", "ml");
        let egg = store.insert_ingredient("Egg", "pcs");
        let recipe = store
            .insert_recipe(author, &draft(vec![IngredientAmount { id: milk, amount: 200 }], vec![]))
            .unwrap();

        store
            .update_recipe(recipe, &draft(vec![IngredientAmount { id: egg, amount: 3 }], vec![]))
            .unwrap();

        let record = store.find_recipe(recipe).unwrap().unwrap();
        assert_eq!(record.ingredients.len(), 1);
        assert_eq!(record.ingredients[0].name, "Egg");
        assert!(matches!(
            store.update_recipe(recipe + 100, &draft(vec![], vec![])),
            Err(StoreError::NotFound)
        ));
    }
}
