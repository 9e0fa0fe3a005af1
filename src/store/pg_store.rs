use diesel::{
    dsl::{exists, sum},
    pg::PgConnection,
    prelude::*,
    r2d2::{ConnectionManager, PooledConnection},
    select,
};
use lombok::AllArgsConstructor;
use tracing::{trace, trace_span};

use crate::{
    database::{
        connection::PgPool,
        models::{
            favorite::NewFavorite,
            ingredient::{Ingredient, NewIngredient},
            recipe::{NewRecipe, Recipe, RecipeChanges},
            recipe_ingredient::{NewRecipeIngredient, RecipeIngredient},
            recipe_tag::NewRecipeTag,
            shopping_cart::NewShoppingCart,
            short_link::NewShortLink,
            subscription::NewSubscription,
            tag::{NewTag, Tag},
            user::User,
        },
        schema::{
            favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_carts,
            short_links, subscriptions, tags, users,
        },
    },
    error::{StoreError, StoreResult},
    recipes::RecipeDraft,
    relations::RelationKind,
    shopping::ShoppingItem,
};

use super::{RecipeFilter, RecipeIngredientLine, RecipeRecord, RelationStore};

/// PostgreSQL-backed store; every call checks a connection out of the pool.
#[derive(AllArgsConstructor, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    fn connection(&self) -> StoreResult<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }

    fn replace_components(
        connection: &mut PgConnection,
        recipe_id: i64,
        draft: &RecipeDraft,
    ) -> StoreResult<()> {
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
            .execute(connection)?;
        diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
            .execute(connection)?;

        let ingredient_rows: Vec<_> = draft
            .ingredients
            .iter()
            .map(|line| NewRecipeIngredient::new(recipe_id, line.id, line.amount))
            .collect();
        diesel::insert_into(recipe_ingredients::table)
            .values(&ingredient_rows)
            .execute(connection)?;

        let tag_rows: Vec<_> = draft
            .tags
            .iter()
            .map(|tag_id| NewRecipeTag::new(recipe_id, *tag_id))
            .collect();
        diesel::insert_into(recipe_tags::table)
            .values(&tag_rows)
            .execute(connection)?;

        Ok(())
    }
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl RelationStore for PgStore {
    fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let mut connection = self.connection()?;

        Ok(users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let mut connection = self.connection()?;

        Ok(tags::table
            .order(tags::name.asc())
            .select(Tag::as_select())
            .load(&mut connection)?)
    }

    fn find_tag(&self, tag_id: i64) -> StoreResult<Option<Tag>> {
        let mut connection = self.connection()?;

        Ok(tags::table
            .find(tag_id)
            .select(Tag::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_tags(&self, new_tags: &[NewTag]) -> StoreResult<usize> {
        let span = trace_span!("inserting tags", count = new_tags.len());
        let _guard = span.enter();

        let mut connection = self.connection()?;

        Ok(diesel::insert_into(tags::table)
            .values(new_tags)
            .on_conflict_do_nothing()
            .execute(&mut connection)?)
    }

    fn search_ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let mut connection = self.connection()?;

        let mut query = ingredients::table
            .select(Ingredient::as_select())
            .order((ingredients::name.asc(), ingredients::measurement_unit.asc()))
            .into_boxed();

        if let Some(prefix) = name_prefix {
            query = query.filter(ingredients::name.ilike(format!("{}%", escape_like(prefix))));
        }

        Ok(query.load(&mut connection)?)
    }

    fn find_ingredient(&self, ingredient_id: i64) -> StoreResult<Option<Ingredient>> {
        let mut connection = self.connection()?;

        Ok(ingredients::table
            .find(ingredient_id)
            .select(Ingredient::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_ingredients(&self, new_ingredients: &[NewIngredient]) -> StoreResult<usize> {
        let span = trace_span!("inserting ingredients", count = new_ingredients.len());
        let _guard = span.enter();

        let mut connection = self.connection()?;

        Ok(diesel::insert_into(ingredients::table)
            .values(new_ingredients)
            .on_conflict_do_nothing()
            .execute(&mut connection)?)
    }

    fn insert_recipe(&self, author_id: i64, draft: &RecipeDraft) -> StoreResult<i64> {
        let span = trace_span!("inserting recipe", author_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        connection.transaction::<_, StoreError, _>(|connection| {
            let recipe_id = diesel::insert_into(recipes::table)
                .values(NewRecipe {
                    name: &draft.name,
                    text: &draft.text,
                    image: &draft.image,
                    cooking_time: draft.cooking_time,
                    author_id,
                })
                .returning(recipes::id)
                .get_result::<i64>(connection)?;

            trace!("Inserting ingredients and tags of recipe {recipe_id}");
            Self::replace_components(connection, recipe_id, draft)?;

            Ok(recipe_id)
        })
    }

    fn update_recipe(&self, recipe_id: i64, draft: &RecipeDraft) -> StoreResult<()> {
        let span = trace_span!("updating recipe", recipe_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        connection.transaction::<_, StoreError, _>(|connection| {
            let updated = diesel::update(recipes::table.find(recipe_id))
                .set(RecipeChanges {
                    name: &draft.name,
                    text: &draft.text,
                    image: &draft.image,
                    cooking_time: draft.cooking_time,
                })
                .execute(connection)?;

            if updated == 0 {
                return Err(StoreError::NotFound);
            }

            Self::replace_components(connection, recipe_id, draft)
        })
    }

    fn delete_recipe(&self, recipe_id: i64) -> StoreResult<bool> {
        let span = trace_span!("deleting recipe", recipe_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        // ingredient, tag, favorite, cart and short link rows go with it via ON DELETE CASCADE
        let deleted = diesel::delete(recipes::table.find(recipe_id)).execute(&mut connection)?;

        Ok(deleted > 0)
    }

    fn recipe_exists(&self, recipe_id: i64) -> StoreResult<bool> {
        let mut connection = self.connection()?;

        Ok(select(exists(recipes::table.find(recipe_id))).get_result(&mut connection)?)
    }

    fn find_recipe(&self, recipe_id: i64) -> StoreResult<Option<RecipeRecord>> {
        let span = trace_span!("loading recipe", recipe_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        let Some(recipe) = recipes::table
            .find(recipe_id)
            .select(Recipe::as_select())
            .first(&mut connection)
            .optional()?
        else {
            return Ok(None);
        };

        let author = users::table
            .find(recipe.author_id)
            .select(User::as_select())
            .first(&mut connection)?;

        let tag_list = recipe_tags::table
            .inner_join(tags::table)
            .filter(recipe_tags::recipe_id.eq(recipe.id))
            .order(tags::id.asc())
            .select(Tag::as_select())
            .load(&mut connection)?;

        let ingredients = RecipeIngredient::belonging_to(&recipe)
            .inner_join(ingredients::table)
            .order(recipe_ingredients::id.asc())
            .select((
                ingredients::id,
                ingredients::name,
                ingredients::measurement_unit,
                recipe_ingredients::amount,
            ))
            .load::<(i64, String, String, i32)>(&mut connection)?
            .into_iter()
            .map(
                |(ingredient_id, name, measurement_unit, amount)| RecipeIngredientLine {
                    ingredient_id,
                    name,
                    measurement_unit,
                    amount,
                },
            )
            .collect();

        Ok(Some(RecipeRecord {
            recipe,
            author,
            tags: tag_list,
            ingredients,
        }))
    }

    fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<Vec<i64>> {
        let span = trace_span!("listing recipes", ?filter);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        let mut query = recipes::table
            .select(recipes::id)
            .order((recipes::created_at.desc(), recipes::id.desc()))
            .into_boxed();

        if let Some(author_id) = filter.author_id {
            query = query.filter(recipes::author_id.eq(author_id));
        }

        if !filter.tag_slugs.is_empty() {
            query = query.filter(
                recipes::id.eq_any(
                    recipe_tags::table
                        .inner_join(tags::table)
                        .filter(tags::slug.eq_any(filter.tag_slugs.clone()))
                        .select(recipe_tags::recipe_id),
                ),
            );
        }

        if let Some(user_id) = filter.favorited_by {
            query = query.filter(
                recipes::id.eq_any(
                    favorites::table
                        .filter(favorites::user_id.eq(user_id))
                        .select(favorites::recipe_id),
                ),
            );
        }

        if let Some(user_id) = filter.in_cart_of {
            query = query.filter(
                recipes::id.eq_any(
                    shopping_carts::table
                        .filter(shopping_carts::user_id.eq(user_id))
                        .select(shopping_carts::recipe_id),
                ),
            );
        }

        Ok(query.load(&mut connection)?)
    }

    fn recipes_by_author(&self, author_id: i64, limit: Option<usize>) -> StoreResult<Vec<Recipe>> {
        let mut connection = self.connection()?;

        let mut query = recipes::table
            .filter(recipes::author_id.eq(author_id))
            .order((recipes::created_at.desc(), recipes::id.desc()))
            .select(Recipe::as_select())
            .into_boxed();

        if let Some(limit) = limit {
            query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        Ok(query.load(&mut connection)?)
    }

    fn count_recipes_by_author(&self, author_id: i64) -> StoreResult<i64> {
        let mut connection = self.connection()?;

        Ok(recipes::table
            .filter(recipes::author_id.eq(author_id))
            .count()
            .get_result(&mut connection)?)
    }

    fn relation_exists(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<bool> {
        let mut connection = self.connection()?;

        let found: bool = match kind {
            RelationKind::Favorite => select(exists(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq(target_id)),
            ))
            .get_result(&mut connection)?,
            RelationKind::ShoppingCart => select(exists(
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user_id))
                    .filter(shopping_carts::recipe_id.eq(target_id)),
            ))
            .get_result(&mut connection)?,
            RelationKind::Subscription => select(exists(
                subscriptions::table
                    .filter(subscriptions::user_id.eq(user_id))
                    .filter(subscriptions::author_id.eq(target_id)),
            ))
            .get_result(&mut connection)?,
        };

        Ok(found)
    }

    fn insert_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<()> {
        let span = trace_span!("inserting relation", ?kind, user_id, target_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        match kind {
            RelationKind::Favorite => diesel::insert_into(favorites::table)
                .values(NewFavorite::new(user_id, target_id))
                .execute(&mut connection)?,
            RelationKind::ShoppingCart => diesel::insert_into(shopping_carts::table)
                .values(NewShoppingCart::new(user_id, target_id))
                .execute(&mut connection)?,
            RelationKind::Subscription => diesel::insert_into(subscriptions::table)
                .values(NewSubscription::new(user_id, target_id))
                .execute(&mut connection)?,
        };

        Ok(())
    }

    fn delete_relation(&self, kind: RelationKind, user_id: i64, target_id: i64) -> StoreResult<usize> {
        let span = trace_span!("deleting relation", ?kind, user_id, target_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        let deleted = match kind {
            RelationKind::Favorite => diesel::delete(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq(target_id)),
            )
            .execute(&mut connection)?,
            RelationKind::ShoppingCart => diesel::delete(
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user_id))
                    .filter(shopping_carts::recipe_id.eq(target_id)),
            )
            .execute(&mut connection)?,
            RelationKind::Subscription => diesel::delete(
                subscriptions::table
                    .filter(subscriptions::user_id.eq(user_id))
                    .filter(subscriptions::author_id.eq(target_id)),
            )
            .execute(&mut connection)?,
        };

        Ok(deleted)
    }

    fn subscribed_authors(&self, user_id: i64) -> StoreResult<Vec<User>> {
        let mut connection = self.connection()?;

        Ok(users::table
            .inner_join(subscriptions::table.on(subscriptions::author_id.eq(users::id)))
            .filter(subscriptions::user_id.eq(user_id))
            .order(users::username.asc())
            .select(User::as_select())
            .load(&mut connection)?)
    }

    fn cart_ingredient_totals(&self, user_id: i64) -> StoreResult<Vec<ShoppingItem>> {
        let span = trace_span!("summing cart ingredients", user_id);
        let _guard = span.enter();

        let mut connection = self.connection()?;

        let rows = recipe_ingredients::table
            .inner_join(ingredients::table)
            .inner_join(
                shopping_carts::table
                    .on(shopping_carts::recipe_id.eq(recipe_ingredients::recipe_id)),
            )
            .filter(shopping_carts::user_id.eq(user_id))
            .group_by((ingredients::name, ingredients::measurement_unit))
            .select((
                ingredients::name,
                ingredients::measurement_unit,
                sum(recipe_ingredients::amount),
            ))
            .order((ingredients::name.asc(), ingredients::measurement_unit.asc()))
            .load::<(String, String, Option<i64>)>(&mut connection)?;

        trace!("Loaded {} ingredient groups", rows.len());

        Ok(rows
            .into_iter()
            .map(|(name, measurement_unit, amount)| {
                ShoppingItem::new(name, measurement_unit, amount.unwrap_or_default())
            })
            .collect())
    }

    fn insert_short_link(&self, recipe_id: i64, token: &str) -> StoreResult<()> {
        let mut connection = self.connection()?;

        diesel::insert_into(short_links::table)
            .values(NewShortLink::new(recipe_id, token.to_owned()))
            .execute(&mut connection)?;

        Ok(())
    }

    fn resolve_short_link(&self, token: &str) -> StoreResult<Option<i64>> {
        let mut connection = self.connection()?;

        Ok(short_links::table
            .filter(short_links::token.eq(token))
            .select(short_links::recipe_id)
            .first(&mut connection)
            .optional()?)
    }

    fn short_link_for_recipe(&self, recipe_id: i64) -> StoreResult<Option<String>> {
        let mut connection = self.connection()?;

        Ok(short_links::table
            .filter(short_links::recipe_id.eq(recipe_id))
            .select(short_links::token)
            .first(&mut connection)
            .optional()?)
    }
}
