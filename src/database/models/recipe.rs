use std::time::SystemTime;

use diesel::prelude::*;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub author_id: i64,
    pub created_at: SystemTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe<'a> {
    pub name: &'a str,
    pub text: &'a str,
    pub image: &'a str,
    pub cooking_time: i32,
    pub author_id: i64,
}

// created_at and author_id never change after insert
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChanges<'a> {
    pub name: &'a str,
    pub text: &'a str,
    pub image: &'a str,
    pub cooking_time: i32,
}
