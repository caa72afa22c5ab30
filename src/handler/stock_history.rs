use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use chrono_tz::Asia::Tokyo;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::api_models::stock_history::{
    HistoryRowResponse, ImportHistoryRequest, ImportHistoryResponse,
};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::handler::stock::{parse_date_range, MSG_INVALID_DATE};
use crate::models::{NewStockHistory, StockHistory};
use crate::repositories::{stock, stock_history};

impl From<StockHistory> for HistoryRowResponse {
    fn from(h: StockHistory) -> Self {
        Self {
            date: h.date,
            open_price: h.open_price,
            high_price: h.high_price,
            low_price: h.low_price,
            close_price: h.close_price,
            volume: h.volume,
        }
    }
}

/// 永続化済みの日次履歴を日付昇順で返す
pub async fn list_stock_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<Vec<HistoryRowResponse>>, AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::Internal)?;
    let stock_rec = stock::find_by_code(&mut conn, &ticker)
        .map_err(|_| AppError::Internal)?
        .ok_or(AppError::NotFound)?;
    let rows = stock_history::list_by_stock_id(&mut conn, stock_rec.id).map_err(map_err)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// 取得口から株価を取り込んで履歴に追記する。
/// 既存の (銘柄, 日付) 行は一意制約に任せてスキップ
pub async fn import_stock_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(payload): Json<ImportHistoryRequest>,
) -> Result<Json<ImportHistoryResponse>, AppError> {
    let today = Utc::now().with_timezone(&Tokyo).date_naive();
    let (start, end) = parse_date_range(
        payload.start_date.as_deref(),
        payload.end_date.as_deref(),
        today,
    )
    .map_err(|_| AppError::BadRequest(MSG_INVALID_DATE.to_string()))?;

    let stock_rec = {
        let mut conn = state.db_pool.get().map_err(|_| AppError::Internal)?;
        stock::find_by_code(&mut conn, &ticker)
            .map_err(|_| AppError::Internal)?
            .ok_or(AppError::NotFound)?
    };

    let bars = state.market_data.daily_bars(&ticker, start, end).await;

    let mut conn = state.db_pool.get().map_err(|_| AppError::Internal)?;
    let mut imported_count = 0;
    let mut skipped_count = 0;
    let mut errors = Vec::new();

    for b in &bars {
        let new_row = NewStockHistory {
            stock_id: stock_rec.id,
            date: b.date,
            open_price: b.open,
            high_price: b.high,
            low_price: b.low,
            close_price: b.close,
            volume: b.volume,
        };
        match stock_history::create(&mut conn, &new_row) {
            Ok(_) => imported_count += 1,
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                skipped_count += 1
            }
            Err(e) => errors.push(format!("{} の登録に失敗しました: {}", b.date, e)),
        }
    }

    // 取り込んだ最新の終値でカタログ側の価格を更新する
    if let Some(last) = bars.last() {
        if let Err(e) = stock::update_latest_price(&mut conn, stock_rec.id, last.close) {
            errors.push(format!("最新価格の更新に失敗しました: {}", e));
        }
    }

    Ok(Json(ImportHistoryResponse {
        ticker,
        total: bars.len(),
        imported_count,
        skipped_count,
        errors,
    }))
}

fn map_err(err: DieselError) -> AppError {
    match err {
        DieselError::NotFound => AppError::NotFound,
        _ => AppError::Internal,
    }
}
