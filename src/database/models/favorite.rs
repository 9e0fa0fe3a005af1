use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::favorites)]
pub struct NewFavorite {
    pub user_id: i64,
    pub recipe_id: i64,
}
