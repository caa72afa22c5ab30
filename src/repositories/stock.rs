use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::OptionalExtension;

use crate::models::{NewStock, Stock};
use crate::schema::stocks::dsl::*;

pub type PgPoolConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create(conn: &mut PgPoolConn, new_stock: &NewStock) -> Result<Stock, diesel::result::Error> {
    diesel::insert_into(stocks)
        .values(new_stock)
        .get_result(conn)
}

pub fn list_all(conn: &mut PgPoolConn) -> Result<Vec<Stock>, diesel::result::Error> {
    stocks.order(id.asc()).load(conn)
}

pub fn find_by_code(conn: &mut PgPoolConn, ticker_code: &str) -> Result<Option<Stock>, diesel::result::Error> {
    stocks
        .filter(code.eq(ticker_code))
        .first(conn)
        .optional()
}

pub fn update_latest_price(
    conn: &mut PgPoolConn,
    sid: i32,
    price: f64,
) -> Result<Stock, diesel::result::Error> {
    diesel::update(stocks.find(sid))
        .set(latest_price.eq(price))
        .get_result(conn)
}
