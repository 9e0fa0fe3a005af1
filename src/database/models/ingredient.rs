use diesel::prelude::*;
use lombok::AllArgsConstructor;
use serde::{Deserialize, Serialize};

#[derive(
    Queryable,
    Selectable,
    Identifiable,
    AllArgsConstructor,
    Serialize,
    Debug,
    Clone,
    PartialEq,
    Eq,
)]
#[diesel(table_name = crate::database::schema::ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

// (name, measurement_unit) is unique, rows colliding with an existing pair are skipped on import
#[derive(Insertable, AllArgsConstructor, Deserialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}
