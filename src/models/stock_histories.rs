use chrono::NaiveDate;
use diesel::prelude::*;

use crate::schema::stock_histories;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = stock_histories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StockHistory {
    pub id: i32,
    pub stock_id: i32,
    pub date: NaiveDate,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = stock_histories)]
pub struct NewStockHistory {
    pub stock_id: i32,
    pub date: NaiveDate,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: i64,
}
