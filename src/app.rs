use std::sync::Arc;

use axum::Router;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use crate::routes;
use crate::services::forecast::{Forecaster, LstmForecaster};
use crate::services::market_data::{MarketData, YahooMarketData};
use crate::utils::middleware;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub market_data: Arc<dyn MarketData>,
    pub forecaster: Arc<dyn Forecaster>,
}

pub fn build_app() -> Router {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let db_pool = Pool::builder()
        .build(manager)
        .expect("Failed to create DB pool");
    let market_data: Arc<dyn MarketData> =
        Arc::new(YahooMarketData::new().expect("Failed to create market data client"));
    let forecaster: Arc<dyn Forecaster> = Arc::new(LstmForecaster::default());
    build_app_with_state(AppState {
        db_pool,
        market_data,
        forecaster,
    })
}

pub fn build_app_with_state(state: AppState) -> Router {
    routes::build_routes()
        .with_state(state)
        .layer(middleware::cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
