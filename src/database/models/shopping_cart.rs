use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::shopping_carts)]
pub struct NewShoppingCart {
    pub user_id: i64,
    pub recipe_id: i64,
}
