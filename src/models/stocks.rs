use diesel::prelude::*;

use crate::schema::stocks;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = stocks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Stock {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub latest_price: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = stocks)]
pub struct NewStock {
    pub code: String,
    pub name: String,
    pub latest_price: f64,
}
