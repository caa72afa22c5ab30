use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::handler::stock::{create_stock, list_stocks, stock_detail_get, stock_detail_post};
use crate::handler::stock_history::{import_stock_history, list_stock_history};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stocks", get(list_stocks).post(create_stock))
        .route("/stocks/:ticker", get(stock_detail_get).post(stock_detail_post))
        .route("/stocks/:ticker/history", get(list_stock_history))
        .route("/stocks/:ticker/history/import", post(import_stock_history))
}
