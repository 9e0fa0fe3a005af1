use std::{
    collections::BTreeMap,
    ops::Deref,
};

use lombok::AllArgsConstructor;
use serde::Serialize;
use tracing::{debug, trace_span};

use crate::{error::AppError, store::RelationStore};

pub const TABLE_HEADER: [&str; 3] = ["ингредиент", "единица измерения", "количество"];

/// One line of a shopping list: everything needed of one ingredient across the cart.
#[derive(AllArgsConstructor, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Amounts keyed by (ingredient name, measurement unit).
///
/// Keys compare byte-wise, so iteration order is the case-sensitive order of
/// names and the unit only separates same-named ingredients.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    inner: BTreeMap<(String, String), i64>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    pub fn add_item(&mut self, name: &str, measurement_unit: &str, amount: i64) {
        self.inner
            .entry((name.to_owned(), measurement_unit.to_owned()))
            .and_modify(|current_amount| {
                *current_amount += amount;
            })
            .or_insert(amount);
    }

    pub fn add_items<I: IntoIterator<Item = ShoppingItem>>(&mut self, items: I) {
        items.into_iter().for_each(|item| {
            self.add_item(&item.name, &item.measurement_unit, item.amount);
        });
    }

    pub fn into_items(self) -> Vec<ShoppingItem> {
        self.inner
            .into_iter()
            .map(|((name, measurement_unit), amount)| {
                ShoppingItem::new(name, measurement_unit, amount)
            })
            .collect()
    }
}

impl FromIterator<ShoppingItem> for ShoppingList {
    fn from_iter<I: IntoIterator<Item = ShoppingItem>>(iter: I) -> Self {
        let mut list = Self::new();
        list.add_items(iter);
        list
    }
}

impl Deref for ShoppingList {
    type Target = BTreeMap<(String, String), i64>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for ShoppingList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

/// Sums the ingredients of every recipe in the user's cart.
///
/// The store already groups and sums; folding its rows through a
/// [`ShoppingList`] pins the order to byte-wise name order whatever collation
/// the database sorted with.
pub fn build_shopping_list(
    store: &dyn RelationStore,
    user_id: i64,
) -> Result<Vec<ShoppingItem>, AppError> {
    let span = trace_span!("building shopping list", user_id);
    let _guard = span.enter();

    let list: ShoppingList = store.cart_ingredient_totals(user_id)?.into_iter().collect();
    debug!("Shopping list of user {user_id} has {} lines", list.len());

    Ok(list.into_items())
}

/// Renders a shopping list as CSV with a fixed header row.
pub fn render_as_table(items: &[ShoppingItem]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(TABLE_HEADER).map_err(internal)?;
    for item in items {
        writer
            .write_record([
                item.name.as_str(),
                item.measurement_unit.as_str(),
                item.amount.to_string().as_str(),
            ])
            .map_err(internal)?;
    }

    writer.into_inner().map_err(|e| internal(e.into_error()))
}

fn internal<E: std::fmt::Display>(err: E) -> AppError {
    AppError::Internal(format!("Failed to render shopping list: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        recipes::{IngredientAmount, RecipeDraft},
        relations::RelationKind,
        store::memory_store::MemoryStore,
    };

    fn draft(name: &str, ingredients: &[(i64, i32)]) -> RecipeDraft {
        RecipeDraft {
            ingredients: ingredients
                .iter()
                .map(|(id, amount)| IngredientAmount {
                    id: *id,
                    amount: *amount,
                })
                .collect(),
            tags: vec![],
            image: "recipes/images/test.png".to_owned(),
            name: name.to_owned(),
            text: "Mix and bake".to_owned(),
            cooking_time: 30,
        }
    }

    struct Kitchen {
        store: MemoryStore,
        cook: i64,
        flour: i64,
        sugar: i64,
        egg: i64,
    }

    fn kitchen() -> Kitchen {
        let store = MemoryStore::new();
        let cook = store.insert_user("cook@example.com", "cook", "Ann", "Cook");
        let flour = store.insert_ingredient("Flour", "g");
        let sugar = store.insert_ingredient("Sugar", "g");
        let egg = store.insert_ingredient("Egg", "pcs");

        Kitchen {
            store,
            cook,
            flour,
            sugar,
            egg,
        }
    }

    #[test]
    fn adds_up_same_key() {
        let mut list = ShoppingList::new();
        list.add_item("Flour", "g", 200);
        list.add_item("Flour", "g", 100);
        list.add_item("Flour", "kg", 1);

        assert_eq!(list.get(&("Flour".to_owned(), "g".to_owned())), Some(&300));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn orders_case_sensitively_by_name() {
        let list: ShoppingList = vec![
            ShoppingItem::new("apple".into(), "pcs".into(), 1),
            ShoppingItem::new("Banana".into(), "pcs".into(), 2),
            ShoppingItem::new("Apple".into(), "pcs".into(), 3),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = list.into_items().into_iter().map(|item| item.name).collect();
        assert_eq!(names, vec!["Apple", "Banana", "apple"]);
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        let kitchen = kitchen();
        let items = build_shopping_list(&kitchen.store, kitchen.cook).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn merges_ingredients_across_cart_recipes() {
        let k = kitchen();
        let a = k
            .store
            .insert_recipe(k.cook, &draft("A", &[(k.flour, 200), (k.sugar, 50)]))
            .unwrap();
        let b = k
            .store
            .insert_recipe(k.cook, &draft("B", &[(k.flour, 100), (k.egg, 2)]))
            .unwrap();
        k.store
            .insert_relation(RelationKind::ShoppingCart, k.cook, a)
            .unwrap();
        k.store
            .insert_relation(RelationKind::ShoppingCart, k.cook, b)
            .unwrap();

        let items = build_shopping_list(&k.store, k.cook).unwrap();

        assert_eq!(
            items,
            vec![
                ShoppingItem::new("Egg".into(), "pcs".into(), 2),
                ShoppingItem::new("Flour".into(), "g".into(), 300),
                ShoppingItem::new("Sugar".into(), "g".into(), 50),
            ]
        );
        assert_eq!(build_shopping_list(&k.store, k.cook).unwrap(), items);
    }

    #[test]
    fn same_name_with_other_unit_stays_apart() {
        let k = kitchen();
        let spoon = k.store.insert_ingredient("Sugar", "tsp");
        let a = k
            .store
            .insert_recipe(k.cook, &draft("A", &[(k.sugar, 50), (spoon, 2)]))
            .unwrap();
        k.store
            .insert_relation(RelationKind::ShoppingCart, k.cook, a)
            .unwrap();

        let items = build_shopping_list(&k.store, k.cook).unwrap();

        assert_eq!(
            items,
            vec![
                ShoppingItem::new("Sugar".into(), "g".into(), 50),
                ShoppingItem::new("Sugar".into(), "tsp".into(), 2),
            ]
        );
    }

    #[test]
    fn ignores_recipes_outside_the_cart() {
        let k = kitchen();
        let a = k
            .store
            .insert_recipe(k.cook, &draft("A", &[(k.flour, 200)]))
            .unwrap();
        k.store
            .insert_recipe(k.cook, &draft("B", &[(k.flour, 100)]))
            .unwrap();
        k.store
            .insert_relation(RelationKind::ShoppingCart, k.cook, a)
            .unwrap();
        k.store
            .insert_relation(RelationKind::Favorite, k.cook, a)
            .unwrap();

        let items = build_shopping_list(&k.store, k.cook).unwrap();

        assert_eq!(items, vec![ShoppingItem::new("Flour".into(), "g".into(), 200)]);
    }

    #[test]
    fn deleting_a_recipe_drops_every_row_pointing_at_it() {
        let k = kitchen();
        let guest = k.store.insert_user("guest@example.com", "guest", "Bo", "Guest");
        let a = k
            .store
            .insert_recipe(k.cook, &draft("A", &[(k.flour, 200)]))
            .unwrap();
        k.store
            .insert_relation(RelationKind::ShoppingCart, k.cook, a)
            .unwrap();
        k.store
            .insert_relation(RelationKind::ShoppingCart, guest, a)
            .unwrap();
        k.store
            .insert_relation(RelationKind::Favorite, guest, a)
            .unwrap();
        k.store.insert_short_link(a, "Ab3dE6gH9j").unwrap();

        assert!(k.store.delete_recipe(a).unwrap());

        assert_eq!(k.store.resolve_short_link("Ab3dE6gH9j").unwrap(), None);
        assert_eq!(k.store.short_link_for_recipe(a).unwrap(), None);
        assert!(!k
            .store
            .relation_exists(RelationKind::Favorite, guest, a)
            .unwrap());

        assert!(!k
            .store
            .relation_exists(RelationKind::ShoppingCart, k.cook, a)
            .unwrap());
        assert!(!k
            .store
            .relation_exists(RelationKind::ShoppingCart, guest, a)
            .unwrap());
        assert!(build_shopping_list(&k.store, k.cook).unwrap().is_empty());
        assert!(build_shopping_list(&k.store, guest).unwrap().is_empty());
    }

    #[test]
    fn renders_header_then_rows() {
        let items = vec![
            ShoppingItem::new("Egg".into(), "pcs".into(), 2),
            ShoppingItem::new("Flour".into(), "g".into(), 300),
        ];

        let table = String::from_utf8(render_as_table(&items).unwrap()).unwrap();

        assert_eq!(
            table,
            "ингредиент,единица измерения,количество\nEgg,pcs,2\nFlour,g,300\n"
        );
    }

    #[test]
    fn renders_only_header_for_empty_list() {
        let table = String::from_utf8(render_as_table(&[]).unwrap()).unwrap();
        assert_eq!(table, "ингредиент,единица измерения,количество\n");
    }

    #[test]
    fn quotes_names_containing_delimiters() {
        let items = vec![ShoppingItem::new("Salt, coarse".into(), "g".into(), 5)];
        let table = String::from_utf8(render_as_table(&items).unwrap()).unwrap();
        assert!(table.ends_with("\"Salt, coarse\",g,5\n"));
    }
}
