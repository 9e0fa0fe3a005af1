use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::recipe_tags)]
pub struct NewRecipeTag {
    pub recipe_id: i64,
    pub tag_id: i64,
}
