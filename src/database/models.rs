pub mod favorite;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod shopping_cart;
pub mod short_link;
pub mod subscription;
pub mod tag;
pub mod user;
