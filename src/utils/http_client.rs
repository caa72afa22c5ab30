use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::Client;

/// Yahoo Finance チャート API 用の HTTP クライアント。
/// ブラウザ相当のヘッダを付けないと 429 が返りやすい
pub fn create_yahoo_client() -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://finance.yahoo.com/"));

    Client::builder()
        .default_headers(headers)
        .gzip(true)
        .build()
}
