use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::subscriptions)]
pub struct NewSubscription {
    pub user_id: i64,
    pub author_id: i64,
}
