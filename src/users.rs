use serde::Serialize;
use tracing::trace_span;

use crate::{
    database::models::user::User,
    error::AppError,
    recipes::RecipeSummary,
    relations::RelationKind,
    store::RelationStore,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorView {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// An author the viewer follows, with their newest recipes.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: AuthorView,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

pub fn author_view(
    store: &dyn RelationStore,
    author: User,
    viewer: Option<i64>,
) -> Result<AuthorView, AppError> {
    let is_subscribed = match viewer {
        Some(user_id) => store.relation_exists(RelationKind::Subscription, user_id, author.id)?,
        None => false,
    };

    Ok(AuthorView {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed,
    })
}

pub fn subscription_view(
    store: &dyn RelationStore,
    user_id: i64,
    author_id: i64,
    recipes_limit: Option<usize>,
) -> Result<SubscriptionView, AppError> {
    let author = store
        .find_user(author_id)?
        .ok_or(AppError::NotFound("Author"))?;

    build_view(store, user_id, author, recipes_limit)
}

pub fn list_subscriptions(
    store: &dyn RelationStore,
    user_id: i64,
    recipes_limit: Option<usize>,
) -> Result<Vec<SubscriptionView>, AppError> {
    let span = trace_span!("listing subscriptions", user_id);
    let _guard = span.enter();

    store
        .subscribed_authors(user_id)?
        .into_iter()
        .map(|author| build_view(store, user_id, author, recipes_limit))
        .collect()
}

fn build_view(
    store: &dyn RelationStore,
    user_id: i64,
    author: User,
    recipes_limit: Option<usize>,
) -> Result<SubscriptionView, AppError> {
    let recipes = store
        .recipes_by_author(author.id, recipes_limit)?
        .into_iter()
        .map(RecipeSummary::from)
        .collect();
    let recipes_count = store.count_recipes_by_author(author.id)?;

    Ok(SubscriptionView {
        author: author_view(store, author, Some(user_id))?,
        recipes,
        recipes_count,
    })
}
