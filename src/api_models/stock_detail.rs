use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 詳細ページの入力。GET はクエリ、POST はフォームで同じ形を受ける
#[derive(Debug, Deserialize, Default)]
pub struct StockDetailParams {
    pub stock_symbol: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PriceRowResponse {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// フロントのチャートライブラリへ渡す系列
#[derive(Debug, Serialize, PartialEq)]
pub struct ChartSeriesResponse {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub predicted_close: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StockDetailResponse {
    pub ticker: String,
    pub stock_name: Option<String>,
    pub latest_price: Option<f64>,
    pub predicted_close: Option<f64>,
    pub change_today: String,
    pub rows: Vec<PriceRowResponse>,
    pub chart: ChartSeriesResponse,
    pub message: Option<String>,
}
