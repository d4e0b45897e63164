use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::Payment;
use crate::repository::ledger as ledger_store;
use crate::schemas::{
    clamp_limit_in_range, validate_input, PaymentPath, PaymentsQuery, RecordPaymentInput,
};
use crate::services::ledger;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/payments",
            axum::routing::get(list_payments).post(record_payment),
        )
        .route("/payments/{payment_id}", axum::routing::get(get_payment))
}

/// Record a rent payment. Classification (full vs partial), balance
/// tracking, and the fee split all happen in the ledger engine.
async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<RecordPaymentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let outcome = ledger::record_payment(&state.db_pool, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(outcome)))
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
) -> AppResult<Json<Value>> {
    let rows = ledger_store::list_payments(
        &state.db_pool,
        query.tenant_id,
        clamp_limit_in_range(query.limit, 1, 500),
        query.offset,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
) -> AppResult<Json<Payment>> {
    let payment = ledger_store::get_payment(&state.db_pool, path.payment_id).await?;
    Ok(Json(payment))
}
