pub mod stock;
pub mod stock_detail;
pub mod stock_history;

#[allow(unused_imports)]
pub use stock::{CreateStockRequest, StockResponse};
#[allow(unused_imports)]
pub use stock_detail::{
    ChartSeriesResponse, PriceRowResponse, StockDetailParams, StockDetailResponse,
};
#[allow(unused_imports)]
pub use stock_history::{HistoryRowResponse, ImportHistoryRequest, ImportHistoryResponse};
