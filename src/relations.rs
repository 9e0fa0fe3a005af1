use tracing::{debug, trace_span};

use crate::{
    error::{AppError, StoreError},
    store::RelationStore,
};

/// The three user-owned relations: a user and either a recipe or an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl RelationKind {
    fn target_name(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "Recipe",
            RelationKind::Subscription => "Author",
        }
    }

    fn entry_name(self) -> &'static str {
        match self {
            RelationKind::Favorite => "Favorite entry",
            RelationKind::ShoppingCart => "Shopping cart entry",
            RelationKind::Subscription => "Subscription",
        }
    }

    fn duplicate_message(self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is already in favorites",
            RelationKind::ShoppingCart => "Recipe is already in the shopping cart",
            RelationKind::Subscription => "Already subscribed to this author",
        }
    }
}

/// Existence-gated add and remove for favorites, cart entries and subscriptions.
///
/// The pre-check only avoids a pointless insert; the store's unique key
/// decides when two adds race.
pub struct RelationshipGuard<'a> {
    store: &'a dyn RelationStore,
}

impl<'a> RelationshipGuard<'a> {
    pub fn new(store: &'a dyn RelationStore) -> Self {
        Self { store }
    }

    pub fn add(&self, kind: RelationKind, user_id: i64, target_id: i64) -> Result<(), AppError> {
        let span = trace_span!("adding relation", ?kind, user_id, target_id);
        let _guard = span.enter();

        if kind == RelationKind::Subscription && user_id == target_id {
            return Err(AppError::InvalidTarget("You cannot subscribe to yourself"));
        }

        self.ensure_target(kind, target_id)?;

        if self.store.relation_exists(kind, user_id, target_id)? {
            return Err(AppError::AlreadyExists(kind.duplicate_message()));
        }

        match self.store.insert_relation(kind, user_id, target_id) {
            Ok(()) => {
                debug!("User {user_id} added {kind:?} {target_id}");
                Ok(())
            }
            Err(StoreError::UniqueViolation) => {
                debug!("Concurrent add of {kind:?} {target_id} for user {user_id}");
                Err(AppError::AlreadyExists(kind.duplicate_message()))
            }
            Err(StoreError::ForeignKeyViolation) => Err(AppError::NotFound(kind.target_name())),
            Err(err) => Err(err.into()),
        }
    }

    pub fn remove(&self, kind: RelationKind, user_id: i64, target_id: i64) -> Result<(), AppError> {
        let span = trace_span!("removing relation", ?kind, user_id, target_id);
        let _guard = span.enter();

        self.ensure_target(kind, target_id)?;

        match self.store.delete_relation(kind, user_id, target_id)? {
            0 => Err(AppError::NotFound(kind.entry_name())),
            _ => {
                debug!("User {user_id} removed {kind:?} {target_id}");
                Ok(())
            }
        }
    }

    fn ensure_target(&self, kind: RelationKind, target_id: i64) -> Result<(), AppError> {
        let exists = match kind {
            RelationKind::Favorite | RelationKind::ShoppingCart => {
                self.store.recipe_exists(target_id)?
            }
            RelationKind::Subscription => self.store.find_user(target_id)?.is_some(),
        };

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(kind.target_name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        recipes::{IngredientAmount, RecipeDraft},
        store::{faulty_store::FaultyStore, memory_store::MemoryStore},
    };

    struct Fixture {
        store: MemoryStore,
        reader: i64,
        author: i64,
        recipe: i64,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let reader = store.insert_user("reader@example.com", "reader", "Rita", "Reader");
        let author = store.insert_user("author@example.com", "author", "Artem", "Author");
        let salt = store.insert_ingredient("Salt", "g");
        let recipe = store
            .insert_recipe(
                author,
                &RecipeDraft {
                    ingredients: vec![IngredientAmount { id: salt, amount: 5 }],
                    tags: vec![],
                    image: "recipes/images/soup.png".to_owned(),
                    name: "Soup".to_owned(),
                    text: "Boil".to_owned(),
                    cooking_time: 20,
                },
            )
            .unwrap();

        Fixture {
            store,
            reader,
            author,
            recipe,
        }
    }

    fn target(f: &Fixture, kind: RelationKind) -> i64 {
        match kind {
            RelationKind::Subscription => f.author,
            _ => f.recipe,
        }
    }

    #[rstest]
    #[case(RelationKind::Favorite)]
    #[case(RelationKind::ShoppingCart)]
    #[case(RelationKind::Subscription)]
    fn second_add_is_rejected(#[case] kind: RelationKind) {
        let f = fixture();
        let guard = RelationshipGuard::new(&f.store);
        let target = target(&f, kind);

        guard.add(kind, f.reader, target).unwrap();
        assert!(f.store.relation_exists(kind, f.reader, target).unwrap());

        let err = guard.add(kind, f.reader, target).unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[rstest]
    #[case(RelationKind::Favorite)]
    #[case(RelationKind::ShoppingCart)]
    #[case(RelationKind::Subscription)]
    fn remove_without_add_is_not_found(#[case] kind: RelationKind) {
        let f = fixture();
        let guard = RelationshipGuard::new(&f.store);

        let err = guard.remove(kind, f.reader, target(&f, kind)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[rstest]
    #[case(RelationKind::Favorite)]
    #[case(RelationKind::ShoppingCart)]
    #[case(RelationKind::Subscription)]
    fn add_then_remove_round_trips(#[case] kind: RelationKind) {
        let f = fixture();
        let guard = RelationshipGuard::new(&f.store);
        let target = target(&f, kind);

        guard.add(kind, f.reader, target).unwrap();
        guard.remove(kind, f.reader, target).unwrap();

        assert!(!f.store.relation_exists(kind, f.reader, target).unwrap());
        assert!(matches!(
            guard.remove(kind, f.reader, target).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn favorites_and_cart_are_independent() {
        let f = fixture();
        let guard = RelationshipGuard::new(&f.store);

        guard.add(RelationKind::Favorite, f.reader, f.recipe).unwrap();
        guard.add(RelationKind::ShoppingCart, f.reader, f.recipe).unwrap();
        guard.remove(RelationKind::Favorite, f.reader, f.recipe).unwrap();

        assert!(f
            .store
            .relation_exists(RelationKind::ShoppingCart, f.reader, f.recipe)
            .unwrap());
    }

    #[test]
    fn self_subscription_is_invalid_whatever_the_state() {
        let f = fixture();
        let guard = RelationshipGuard::new(&f.store);

        let err = guard
            .add(RelationKind::Subscription, f.author, f.author)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget(_)));

        let ghost = 9_999;
        let err = guard
            .add(RelationKind::Subscription, ghost, ghost)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget(_)));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let f = fixture();
        let guard = RelationshipGuard::new(&f.store);

        assert!(matches!(
            guard.add(RelationKind::Favorite, f.reader, 404).unwrap_err(),
            AppError::NotFound("Recipe")
        ));
        assert!(matches!(
            guard
                .add(RelationKind::Subscription, f.reader, 404)
                .unwrap_err(),
            AppError::NotFound("Author")
        ));
    }

    #[test]
    fn unique_key_wins_over_stale_pre_check() {
        let f = fixture();
        let store = FaultyStore::racing(f.store);
        let guard = RelationshipGuard::new(&store);

        let err = guard
            .add(RelationKind::Favorite, f.reader, f.recipe)
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists(_)));
    }
}
