use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{Value, json};

use invoicer_infra::currency::{CurrencyConverter, CurrencyError, HttpRateProvider, RateProvider};

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<String>>>,
}

struct RateServer {
    base_url: String,
    seen: Seen,
    handle: tokio::task::JoinHandle<()>,
}

impl RateServer {
    async fn spawn() -> Self {
        let seen = Seen::default();
        let app = Router::new()
            .route("/v4/latest/:base", get(latest))
            .route("/v4/:date", get(historical))
            .with_state(seen.clone());

        // Bind to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/v4", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            seen,
            handle,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.seen.requests.lock().unwrap().clone()
    }
}

impl Drop for RateServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn latest(
    State(seen): State<Seen>,
    Path(base): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    seen.requests.lock().unwrap().push(format!(
        "latest {base} key={}",
        query.get("apiKey").map(String::as_str).unwrap_or("-")
    ));
    match base.as_str() {
        "USD" => Ok(Json(json!({
            "base": "USD",
            "date": "2024-03-15",
            "rates": { "USD": 1.0, "EUR": 0.9 }
        }))),
        "BAD" => Ok(Json(json!({ "unexpected": true }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn historical(
    State(seen): State<Seen>,
    Path(date): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let base = query.get("base").cloned().unwrap_or_default();
    seen.requests
        .lock()
        .unwrap()
        .push(format!("historical {date} base={base}"));
    Json(json!({
        "base": base,
        "date": date,
        "rates": { "EUR": 0.5 }
    }))
}

#[tokio::test]
async fn latest_rates_convert_an_amount() {
    let srv = RateServer::spawn().await;
    let provider = HttpRateProvider::new(srv.base_url.clone(), Some("k-123".to_string()), None).unwrap();
    let converter = CurrencyConverter::new(provider);

    let conversion = converter.convert(220.0, "USD", "EUR", None).await.unwrap();

    assert!((conversion.converted - 198.0).abs() < 1e-9);
    assert_eq!(srv.requests(), vec!["latest USD key=k-123".to_string()]);
}

#[tokio::test]
async fn historical_rates_pass_the_base_as_query() {
    let srv = RateServer::spawn().await;
    let provider = HttpRateProvider::new(srv.base_url.clone(), None, None).unwrap();
    let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();

    let table = provider.historical("USD", date).await.unwrap();

    assert_eq!(table.rate("EUR"), Some(0.5));
    assert_eq!(srv.requests(), vec!["historical 2023-06-01 base=USD".to_string()]);
}

#[tokio::test]
async fn missing_target_currency_is_rate_unavailable() {
    let srv = RateServer::spawn().await;
    let converter = CurrencyConverter::new(HttpRateProvider::new(srv.base_url.clone(), None, None).unwrap());

    let err = converter.convert(1.0, "USD", "JPY", None).await.unwrap_err();
    assert!(matches!(err, CurrencyError::RateUnavailable { .. }));
}

#[tokio::test]
async fn error_status_and_bad_body_are_provider_unavailable() {
    let srv = RateServer::spawn().await;
    let provider = HttpRateProvider::new(srv.base_url.clone(), None, None).unwrap();

    let not_found = provider.latest("XYZ").await.unwrap_err();
    assert!(matches!(not_found, CurrencyError::ProviderUnavailable(_)));

    let bad_body = provider.latest("BAD").await.unwrap_err();
    assert!(matches!(bad_body, CurrencyError::ProviderUnavailable(_)));
}

#[tokio::test]
async fn unreachable_provider_is_provider_unavailable() {
    // Nothing listens on this port once the server is dropped.
    let base_url = {
        let srv = RateServer::spawn().await;
        srv.base_url.clone()
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let provider = HttpRateProvider::new(base_url, None, Some(std::time::Duration::from_secs(2))).unwrap();
    let err = provider.latest("USD").await.unwrap_err();
    assert!(matches!(err, CurrencyError::ProviderUnavailable(_)));
}
