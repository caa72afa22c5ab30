use axum::Router;

use crate::app::AppState;

mod root;
mod stock;

pub fn build_routes() -> Router<AppState> {
    Router::new()
        // ルートとヘルスチェック
        .merge(root::router())
        // 業務 API は /api 配下にまとめる
        .nest("/api", stock::router())
}
