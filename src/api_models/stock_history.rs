use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HistoryRowResponse {
    pub date: NaiveDate,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImportHistoryRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportHistoryResponse {
    pub ticker: String,
    pub total: usize,
    pub imported_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<String>,
}
