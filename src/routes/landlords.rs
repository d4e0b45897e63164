use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{map_db_error, AppResult};
use crate::repository::{ledger as ledger_store, registry};
use crate::schemas::{
    clamp_limit_in_range, validate_input, CreateLandlordInput, CreateLedgerEntryInput,
    LandlordPath, ListQuery, StatementQuery,
};
use crate::services::statement;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/landlords",
            axum::routing::get(list_landlords).post(create_landlord),
        )
        .route("/landlords/{landlord_id}", axum::routing::get(get_landlord))
        .route(
            "/landlords/{landlord_id}/ledger-entries",
            axum::routing::get(list_ledger_entries).post(create_ledger_entry),
        )
        .route(
            "/landlords/{landlord_id}/statement",
            axum::routing::get(get_statement),
        )
}

async fn create_landlord(
    State(state): State<AppState>,
    Json(payload): Json<CreateLandlordInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let created = registry::insert_landlord(&state.db_pool, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_landlords(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let rows = registry::list_landlords(
        &state.db_pool,
        clamp_limit_in_range(query.limit, 1, 500),
        query.offset,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_landlord(
    State(state): State<AppState>,
    Path(path): Path<LandlordPath>,
) -> AppResult<Json<crate::models::Landlord>> {
    let landlord = registry::get_landlord(&state.db_pool, path.landlord_id).await?;
    Ok(Json(landlord))
}

/// Append a manual credit or debit to the landlord's ledger. Entries are
/// immutable once written; corrections are offsetting entries.
async fn create_ledger_entry(
    State(state): State<AppState>,
    Path(path): Path<LandlordPath>,
    Json(payload): Json<CreateLedgerEntryInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let landlord = registry::get_landlord(&state.db_pool, path.landlord_id).await?;

    let entry_date = payload
        .entry_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut conn = state.db_pool.acquire().await.map_err(map_db_error)?;
    let created = ledger_store::insert_entry(
        &mut conn,
        &ledger_store::NewLedgerEntry {
            landlord_id: landlord.id,
            entry_date,
            narration: payload.narration.trim(),
            entry_type: payload.entry_type,
            amount: payload.amount,
            payment_method: &payload.payment_method,
        },
    )
    .await?;

    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_ledger_entries(
    State(state): State<AppState>,
    Path(path): Path<LandlordPath>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    registry::get_landlord(&state.db_pool, path.landlord_id).await?;
    let rows = ledger_store::list_entries(
        &state.db_pool,
        path.landlord_id,
        clamp_limit_in_range(query.limit, 1, 1000),
        query.offset,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_statement(
    State(state): State<AppState>,
    Path(path): Path<LandlordPath>,
    Query(query): Query<StatementQuery>,
) -> AppResult<Json<statement::Statement>> {
    let built = statement::build_statement(&state.db_pool, path.landlord_id, &query).await?;
    Ok(Json(built))
}
