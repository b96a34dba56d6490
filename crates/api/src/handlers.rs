use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use history_models::{
    AccountQuery, CollectorStatus, ErrorShape, HistoryError, Payment, Trustline,
};
use history_xdr::strkey::is_valid_account_id;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, instrument, warn};

type ApiError = (StatusCode, Json<ErrorShape>);

fn api_error(e: HistoryError) -> ApiError {
    if e.http_status() >= 500 {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(e.to_error_shape()))
}

fn invalid(reason: impl Into<String>) -> ApiError {
    api_error(HistoryError::InvalidRequest {
        reason: reason.into(),
    })
}

/// A payment as returned by the API: the stored row plus its UTC day.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub date: String,
}

impl From<Payment> for PaymentView {
    fn from(payment: Payment) -> Self {
        let date = payment.time.format("%Y-%m-%d").to_string();
        Self { payment, date }
    }
}

#[derive(Debug, Serialize)]
pub struct TrustlineView {
    #[serde(flatten)]
    pub trustline: Trustline,
    pub date: String,
}

impl From<Trustline> for TrustlineView {
    fn from(trustline: Trustline) -> Self {
        let date = trustline.time.format("%Y-%m-%d").to_string();
        Self { trustline, date }
    }
}

fn account_query(params: &HashMap<String, String>) -> Result<AccountQuery, ApiError> {
    let source = params
        .get("source")
        .ok_or_else(|| invalid("missing query parameter: source"))?;
    if !is_valid_account_id(source) {
        return Err(invalid(format!("source is not an account id: {}", source)));
    }
    let limit = params
        .get("limit")
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| invalid(format!("limit is not a non-negative integer: {}", raw)))
        })
        .transpose()?;
    Ok(AccountQuery::new(source.clone(), limit))
}

#[instrument(skip(state))]
pub async fn payments(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let query = account_query(&params)?;
    let rows = state
        .store
        .payments_by_source(&query)
        .await
        .map_err(api_error)?;
    Ok(Json(rows.into_iter().map(PaymentView::from).collect()))
}

#[instrument(skip(state))]
pub async fn transaction(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PaymentView>, ApiError> {
    let id = params
        .get("id")
        .ok_or_else(|| invalid("missing query parameter: id"))?
        .to_ascii_lowercase();
    if id.len() != 64 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(format!("id is not a transaction hash: {}", id)));
    }

    match state.store.payment_by_hash(&id).await.map_err(api_error)? {
        Some(payment) => Ok(Json(payment.into())),
        None => Err(api_error(HistoryError::NotFound {
            resource: format!("payment in transaction {}", id),
        })),
    }
}

#[instrument(skip(state))]
pub async fn trustlines(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<TrustlineView>>, ApiError> {
    let query = account_query(&params)?;
    let rows = state
        .store
        .trustlines_by_source(&query)
        .await
        .map_err(api_error)?;
    Ok(Json(rows.into_iter().map(TrustlineView::from).collect()))
}

#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> Result<Json<CollectorStatus>, ApiError> {
    let cursor = state.store.cursor().await.map_err(api_error)?;
    Ok(Json(CollectorStatus::from_cursor(cursor)))
}

pub async fn health_check(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state.store.ping().await.map_err(api_error)?;
    Ok("OK")
}

#[instrument(skip(state))]
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    match state.metrics.render() {
        Ok(metrics) => Ok(metrics),
        Err(e) => {
            error!("Failed to get metrics: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
