use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tracing::{debug, trace_span, warn};

use crate::{
    error::{AppError, StoreError},
    store::RelationStore,
};

type TokenGenerator = Box<dyn Fn(usize) -> String + Send + Sync>;

/// Hands out the per-recipe tokens behind `/s/{token}/`.
pub struct ShortLinkAllocator {
    length: usize,
    max_attempts: u32,
    generator: TokenGenerator,
}

impl ShortLinkAllocator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length,
            max_attempts,
            generator: Box::new(random_token),
        }
    }

    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.generator = Box::new(generator);
        self
    }

    /// Stores a fresh token for the recipe, drawing again whenever the token is taken.
    pub fn allocate(&self, store: &dyn RelationStore, recipe_id: i64) -> Result<String, AppError> {
        let span = trace_span!("allocating short link", recipe_id);
        let _guard = span.enter();

        for attempt in 1..=self.max_attempts {
            let token = (self.generator)(self.length);

            match store.insert_short_link(recipe_id, &token) {
                Ok(()) => {
                    debug!("Recipe {recipe_id} got short link {token} on attempt {attempt}");
                    return Ok(token);
                }
                Err(StoreError::UniqueViolation) => {
                    warn!(
                        "Short link {token} already taken, attempt {attempt} of {}",
                        self.max_attempts
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::ShortLinkExhausted(self.max_attempts))
    }

    pub fn resolve(&self, store: &dyn RelationStore, token: &str) -> Result<i64, AppError> {
        store
            .resolve_short_link(token)?
            .ok_or(AppError::NotFound("Short link"))
    }

    pub fn link_for(&self, store: &dyn RelationStore, recipe_id: i64) -> Result<String, AppError> {
        store
            .short_link_for_recipe(recipe_id)?
            .ok_or(AppError::NotFound("Short link"))
    }
}

pub fn random_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        recipes::{IngredientAmount, RecipeDraft},
        store::memory_store::MemoryStore,
    };

    fn store_with_recipe() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let author = store.insert_user("chef@example.com", "chef", "Chef", "Cook");
        let rice = store.insert_ingredient("Rice", "g");
        let recipe = store
            .insert_recipe(
                author,
                &RecipeDraft {
                    ingredients: vec![IngredientAmount { id: rice, amount: 100 }],
                    tags: vec![],
                    image: "recipes/images/rice.png".to_owned(),
                    name: "Rice".to_owned(),
                    text: "Steam".to_owned(),
                    cooking_time: 15,
                },
            )
            .unwrap();
        (store, recipe)
    }

    fn scripted(tokens: &[&str]) -> impl Fn(usize) -> String + Send + Sync + 'static {
        let queue = Mutex::new(tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>());
        move |_| queue.lock().unwrap().remove(0)
    }

    #[test]
    fn random_tokens_are_alphanumeric_of_requested_length() {
        let token = random_token(10);
        assert_eq!(token.len(), 10);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn allocated_token_resolves_to_recipe() {
        let (store, recipe) = store_with_recipe();
        let allocator = ShortLinkAllocator::new(10, 5);

        let token = allocator.allocate(&store, recipe).unwrap();

        assert_eq!(token.len(), 10);
        assert_eq!(allocator.resolve(&store, &token).unwrap(), recipe);
        assert_eq!(allocator.link_for(&store, recipe).unwrap(), token);
    }

    #[test]
    fn retries_past_a_taken_token() {
        let (store, recipe) = store_with_recipe();
        store.insert_short_link(recipe, "AAAAAAAAAA").unwrap();
        let author = store.find_recipe(recipe).unwrap().unwrap().author.id;
        let second = store
            .insert_recipe(
                author,
                &RecipeDraft {
                    ingredients: vec![],
                    tags: vec![],
                    image: "recipes/images/second.png".to_owned(),
                    name: "Second".to_owned(),
                    text: "Again".to_owned(),
                    cooking_time: 1,
                },
            )
            .unwrap();
        let allocator =
            ShortLinkAllocator::new(10, 5).with_generator(scripted(&["AAAAAAAAAA", "BBBBBBBBBB"]));

        let token = allocator.allocate(&store, second).unwrap();

        assert_eq!(token, "BBBBBBBBBB");
        assert_eq!(allocator.resolve(&store, "AAAAAAAAAA").unwrap(), recipe);
        assert_eq!(allocator.resolve(&store, "BBBBBBBBBB").unwrap(), second);
    }

    #[test]
    fn gives_up_after_budget() {
        let (store, recipe) = store_with_recipe();
        store.insert_short_link(recipe, "SAME").unwrap();
        let allocator = ShortLinkAllocator::new(4, 3).with_generator(|_| "SAME".to_owned());

        let err = allocator.allocate(&store, recipe).unwrap_err();

        assert!(matches!(err, AppError::ShortLinkExhausted(3)));
    }

    #[test]
    fn unknown_token_is_not_found() {
        let (store, _) = store_with_recipe();
        let allocator = ShortLinkAllocator::new(10, 5);

        assert!(matches!(
            allocator.resolve(&store, "missing").unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
