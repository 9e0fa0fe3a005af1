use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::short_links)]
pub struct NewShortLink {
    pub recipe_id: i64,
    pub token: String,
}
