use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateStockRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub code: String,
    pub name: String,
    pub latest_price: f64,
}
