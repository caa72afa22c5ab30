use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Form, Json,
};
use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Asia::Tokyo;

use crate::api_models::stock::{CreateStockRequest, StockResponse};
use crate::api_models::stock_detail::{
    ChartSeriesResponse, PriceRowResponse, StockDetailParams, StockDetailResponse,
};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::models::{NewStock, Stock};
use crate::repositories::stock;
use crate::services::forecast::{change_today, format_change};
use crate::services::market_data::DailyBar;

pub const MSG_TICKER_REQUIRED: &str = "企業コードを入力してください";
pub const MSG_INVALID_DATE: &str = "日付の形式が正しくありません (YYYY-MM-DD)";
pub const MSG_NO_DATA: &str = "指定された期間のデータがありません";
pub const MSG_INSUFFICIENT_DATA: &str = "予測に必要なデータが不足しています";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

impl From<Stock> for StockResponse {
    fn from(s: Stock) -> Self {
        Self {
            code: s.code,
            name: s.name,
            latest_price: s.latest_price,
        }
    }
}

impl From<&DailyBar> for PriceRowResponse {
    fn from(b: &DailyBar) -> Self {
        Self {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        }
    }
}

/// 既知銘柄の一覧
pub async fn list_stocks(State(state): State<AppState>) -> Result<Json<Vec<StockResponse>>, AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::Internal)?;
    let items = stock::list_all(&mut conn).map_err(|_| AppError::Internal)?;
    let response: Vec<StockResponse> = items.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// 銘柄をカタログへ登録する。価格は取り込みで更新されるまで 0
pub async fn create_stock(
    State(state): State<AppState>,
    Json(payload): Json<CreateStockRequest>,
) -> Result<(StatusCode, Json<StockResponse>), AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::Internal)?;
    let new_stock = NewStock {
        code: payload.code,
        name: payload.name,
        latest_price: 0.0,
    };
    let created = stock::create(&mut conn, &new_stock).map_err(|e| match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => AppError::BadRequest(format!("銘柄コード {} は登録済みです", new_stock.code)),
        _ => AppError::Internal,
    })?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn stock_detail_get(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<StockDetailParams>,
) -> Result<Json<StockDetailResponse>, AppError> {
    stock_detail(state, ticker, params).await
}

pub async fn stock_detail_post(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Form(params): Form<StockDetailParams>,
) -> Result<Json<StockDetailResponse>, AppError> {
    stock_detail(state, ticker, params).await
}

/// 銘柄詳細: 株価系列の取得、予測、前日比、表・チャート用データの組み立て。
/// 入力不備や上流のデータ欠如は message に載せて 200 で返す
async fn stock_detail(
    state: AppState,
    path_ticker: String,
    params: StockDetailParams,
) -> Result<Json<StockDetailResponse>, AppError> {
    let ticker = resolve_ticker(&path_ticker, params.stock_symbol.as_deref());
    if ticker.is_empty() {
        return Ok(Json(message_response(ticker, MSG_TICKER_REQUIRED)));
    }

    let today = Utc::now().with_timezone(&Tokyo).date_naive();
    let (start, end) = match parse_date_range(
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        today,
    ) {
        Ok(range) => range,
        Err(_) => return Ok(Json(message_response(ticker, MSG_INVALID_DATE))),
    };

    let catalog = {
        let mut conn = state.db_pool.get().map_err(|_| AppError::Internal)?;
        stock::find_by_code(&mut conn, &ticker).map_err(|_| AppError::Internal)?
    };

    let bars = state.market_data.daily_bars(&ticker, start, end).await;

    let predicted = if bars.is_empty() {
        None
    } else {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        state.forecaster.predict_next(&closes).unwrap_or_else(|e| {
            tracing::error!("forecast failed for {}: {}", ticker, e);
            None
        })
    };

    Ok(Json(build_detail_response(ticker, catalog, bars, predicted)))
}

/// フォーム/クエリの stock_symbol があればパスの銘柄コードより優先する
fn resolve_ticker(path_ticker: &str, stock_symbol: Option<&str>) -> String {
    match stock_symbol {
        Some(s) => s.trim().to_string(),
        None => path_ticker.trim().to_string(),
    }
}

pub(crate) fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), chrono::ParseError> {
    let end_date = match end {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)?,
        _ => today,
    };
    let start_date = match start {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)?,
        _ => today - Duration::days(DEFAULT_LOOKBACK_DAYS),
    };
    Ok((start_date, end_date))
}

fn message_response(ticker: String, message: &str) -> StockDetailResponse {
    StockDetailResponse {
        ticker,
        stock_name: None,
        latest_price: None,
        predicted_close: None,
        change_today: format_change(0.0),
        rows: Vec::new(),
        chart: ChartSeriesResponse {
            dates: Vec::new(),
            closes: Vec::new(),
            predicted_close: None,
        },
        message: Some(message.to_string()),
    }
}

fn build_detail_response(
    ticker: String,
    catalog: Option<Stock>,
    bars: Vec<DailyBar>,
    predicted: Option<f64>,
) -> StockDetailResponse {
    if bars.is_empty() {
        let mut resp = message_response(ticker, MSG_NO_DATA);
        if let Some(s) = catalog {
            resp.stock_name = Some(s.name);
            resp.latest_price = Some(s.latest_price);
        }
        return resp;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let change = change_today(&closes);
    let message = predicted
        .is_none()
        .then(|| MSG_INSUFFICIENT_DATA.to_string());

    StockDetailResponse {
        ticker,
        stock_name: catalog.as_ref().map(|s| s.name.clone()),
        latest_price: catalog.as_ref().map(|s| s.latest_price),
        predicted_close: predicted,
        change_today: format_change(change),
        rows: bars.iter().map(Into::into).collect(),
        chart: ChartSeriesResponse {
            dates: bars.iter().map(|b| b.date).collect(),
            closes,
            predicted_close: predicted,
        },
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, close: f64) -> DailyBar {
        DailyBar {
            date,
            open: 150.0,
            high: 155.0,
            low: 145.0,
            close,
            volume: 1000,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn stock_symbol_overrides_path_ticker() {
        assert_eq!(resolve_ticker("AAPL", None), "AAPL");
        assert_eq!(resolve_ticker("AAPL", Some("MSFT")), "MSFT");
        assert_eq!(resolve_ticker("AAPL", Some("  ")), "");
    }

    #[test]
    fn date_range_defaults_to_lookback_window() {
        let today = day(31);
        let (start, end) = parse_date_range(None, None, today).unwrap();
        assert_eq!(end, today);
        assert_eq!(start, today - Duration::days(DEFAULT_LOOKBACK_DAYS));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let today = day(31);
        assert!(parse_date_range(Some("2023-13-40"), None, today).is_err());
        assert!(parse_date_range(None, Some("not-a-date"), today).is_err());
        let (start, end) =
            parse_date_range(Some("2023-01-01"), Some("2023-01-31"), day(15)).unwrap();
        assert_eq!(start, day(1));
        assert_eq!(end, day(31));
    }

    #[test]
    fn empty_series_renders_no_data_message() {
        let resp = build_detail_response("AAPL".to_string(), None, Vec::new(), None);
        assert_eq!(resp.message.as_deref(), Some(MSG_NO_DATA));
        assert!(resp.predicted_close.is_none());
        assert!(resp.rows.is_empty());
    }

    #[test]
    fn single_bar_has_zero_change_and_no_forecast() {
        let resp = build_detail_response("AAPL".to_string(), None, vec![bar(day(2), 152.0)], None);
        assert_eq!(resp.change_today, "0.00円");
        assert!(resp.predicted_close.is_none());
        assert_eq!(resp.message.as_deref(), Some(MSG_INSUFFICIENT_DATA));
        assert_eq!(resp.rows.len(), 1);
        assert_eq!(resp.chart.closes, vec![152.0]);
    }

    #[test]
    fn change_is_positive_with_plus_prefix() {
        let bars = vec![bar(day(2), 150.0), bar(day(3), 152.0)];
        let resp = build_detail_response("AAPL".to_string(), None, bars, Some(152.5));
        assert_eq!(resp.change_today, "+2.00円");
        assert_eq!(resp.predicted_close, Some(152.5));
        assert!(resp.message.is_none());
        assert_eq!(resp.chart.predicted_close, Some(152.5));
    }

    #[test]
    fn catalog_entry_fills_name_and_latest_price() {
        let catalog = Some(Stock {
            id: 1,
            code: "AAPL".to_string(),
            name: "Apple".to_string(),
            latest_price: 152.0,
        });
        let resp =
            build_detail_response("AAPL".to_string(), catalog, vec![bar(day(2), 152.0)], None);
        assert_eq!(resp.stock_name.as_deref(), Some("Apple"));
        assert_eq!(resp.latest_price, Some(152.0));
    }
}
