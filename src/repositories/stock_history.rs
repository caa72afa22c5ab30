use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use crate::models::{NewStockHistory, StockHistory};
use crate::schema::stock_histories::dsl::*;

pub type PgPoolConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create(
    conn: &mut PgPoolConn,
    new_row: &NewStockHistory,
) -> Result<StockHistory, diesel::result::Error> {
    diesel::insert_into(stock_histories)
        .values(new_row)
        .get_result(conn)
}

pub fn list_by_stock_id(
    conn: &mut PgPoolConn,
    sid: i32,
) -> Result<Vec<StockHistory>, diesel::result::Error> {
    stock_histories
        .filter(stock_id.eq(sid))
        .order(date.asc())
        .load(conn)
}
