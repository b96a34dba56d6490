use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use async_trait::async_trait;
use history_api::{app, build_router, AppState};
use history_metrics::MetricsService;
use history_models::{
    AccountQuery, CollectorCursor, FileSequence, HistoryError, Payment, Trustline,
};
use history_store::{HistoryStore, MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const SOURCE: &str = "GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H";
const OTHER: &str = "GABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEJXA";

fn time(secs: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(secs, 0).unwrap()
}

fn payment(tx_hash: String, op_index: u32, ledger: u32) -> Payment {
    Payment {
        source: SOURCE.to_string(),
        destination: OTHER.to_string(),
        amount: 150_000,
        memo_text: Some("1-test-order".to_string()),
        tx_hash,
        op_index,
        ledger_sequence: ledger,
        time: time(1_546_300_800),
    }
}

async fn seeded_state() -> AppState {
    let store = Arc::new(MemoryStore::new());
    let payments: Vec<Payment> = (0..30)
        .map(|i| payment(format!("{:064x}", i), 0, 100 + i))
        .collect();
    let trustlines = vec![Trustline {
        source: OTHER.to_string(),
        limit: i64::MAX,
        memo_text: None,
        tx_hash: "ff".repeat(32),
        op_index: 0,
        ledger_sequence: 99,
        time: time(1_546_300_700),
    }];
    store
        .commit_checkpoint(FileSequence::new(0x7f), &payments, &trustlines)
        .await
        .unwrap();
    AppState::new(store, Arc::new(MetricsService::new().unwrap()))
}

/// A store whose database has gone away.
struct UnreachableStore;

fn connection_refused() -> HistoryError {
    HistoryError::DatabaseError {
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl HistoryStore for UnreachableStore {
    async fn cursor(&self) -> Result<Option<CollectorCursor>, HistoryError> {
        Err(connection_refused())
    }

    async fn seed_cursor(&self, _file: FileSequence) -> Result<(), HistoryError> {
        Err(connection_refused())
    }

    async fn commit_checkpoint(
        &self,
        _file: FileSequence,
        _payments: &[Payment],
        _trustlines: &[Trustline],
    ) -> Result<(), HistoryError> {
        Err(connection_refused())
    }

    async fn payments_by_source(&self, _query: &AccountQuery) -> Result<Vec<Payment>, HistoryError> {
        Err(connection_refused())
    }

    async fn payment_by_hash(&self, _tx_hash: &str) -> Result<Option<Payment>, HistoryError> {
        Err(connection_refused())
    }

    async fn trustlines_by_source(&self, _query: &AccountQuery) -> Result<Vec<Trustline>, HistoryError> {
        Err(connection_refused())
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        Err(connection_refused())
    }
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(state, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_payments_newest_first_with_default_limit() {
    let (status, body) = get_json(seeded_state().await, &format!("/payments?source={}", SOURCE)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 20);
    assert_eq!(rows[0]["ledger_sequence"], 129);
    assert_eq!(rows[0]["date"], "2019-01-01");
    assert_eq!(rows[0]["time"], "2019-01-01T00:00:00Z");
    assert_eq!(rows[0]["memo_text"], "1-test-order");
    assert_eq!(rows[0]["amount"], 150_000);
}

#[tokio::test]
async fn test_payments_limit_and_unknown_source() {
    let state = seeded_state().await;
    let (_, body) = get_json(state.clone(), &format!("/payments?source={}&limit=3", SOURCE)).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = get_json(state, &format!("/payments?source={}", OTHER)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_payments_rejects_bad_parameters() {
    let state = seeded_state().await;

    let (status, body) = get_json(state.clone(), "/payments").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "InvalidParameterValueException");

    let (status, _) = get_json(state.clone(), "/payments?source=GBAD").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(state, &format!("/payments?source={}&limit=-1", SOURCE)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tx_lookup() {
    let state = seeded_state().await;
    let hash = format!("{:064x}", 5);

    let (status, body) = get_json(state.clone(), &format!("/tx?id={}", hash.to_uppercase())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tx_hash"], hash);
    assert_eq!(body["ledger_sequence"], 105);

    let (status, body) = get_json(state.clone(), &format!("/tx?id={}", "ab".repeat(32))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "ResourceNotFoundException");

    let (status, _) = get_json(state.clone(), "/tx?id=xyz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(state, "/tx").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trustlines_by_source() {
    let (status, body) = get_json(seeded_state().await, &format!("/trustlines?source={}", OTHER)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["limit"], i64::MAX);
    assert_eq!(rows[0]["date"], "2019-01-01");
}

#[tokio::test]
async fn test_status_reports_cursor() {
    let (_, body) = get_json(seeded_state().await, "/status").await;
    assert_eq!(body["last_file"], "0000007f");
    assert_eq!(body["next_file"], "000000bf");

    let pending = AppState::new(
        Arc::new(MemoryStore::with_cursor(CollectorCursor::pending(FileSequence::new(0x3f)))),
        Arc::new(MetricsService::new().unwrap()),
    );
    let (_, body) = get_json(pending, "/status").await;
    assert!(body["last_file"].is_null());
    assert_eq!(body["next_file"], "0000003f");
}

#[tokio::test]
async fn test_health_and_metrics() {
    let state = seeded_state().await;
    let (status, body) = get(state.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (status, body) = get(state, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("history_files_processed_total"));
}

#[tokio::test]
async fn test_health_reports_unavailable_database() {
    let state = AppState::new(
        Arc::new(UnreachableStore),
        Arc::new(MetricsService::new().unwrap()),
    );
    let (status, body) = get(state.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error_type"], "ServiceException");
    assert_eq!(body["error_message"], "Database error: connection refused");

    let (status, _) = get(state, &format!("/payments?source={}", SOURCE)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_served_app_allows_cross_origin_requests() {
    let response = app(seeded_state().await)
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
