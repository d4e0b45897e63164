use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::Tenant;
use crate::repository::{ledger as ledger_store, registry};
use crate::schemas::{
    clamp_limit_in_range, validate_input, CreateTenantInput, ListQuery, RenewLeaseInput, TenantPath,
};
use crate::services::{ledger, occupancy};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/tenants",
            axum::routing::get(list_tenants).post(create_tenant),
        )
        .route("/tenants/{tenant_id}", axum::routing::get(get_tenant))
        .route(
            "/tenants/{tenant_id}/payments",
            axum::routing::get(payment_history),
        )
        .route("/tenants/{tenant_id}/renew", axum::routing::post(renew_lease))
        .route(
            "/tenants/{tenant_id}/end-lease",
            axum::routing::post(end_lease),
        )
}

async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let created = registry::insert_tenant(&state.db_pool, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_tenants(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let rows = registry::list_tenants(
        &state.db_pool,
        clamp_limit_in_range(query.limit, 1, 500),
        query.offset,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Tenant>> {
    let tenant = registry::get_tenant(&state.db_pool, path.tenant_id).await?;
    Ok(Json(tenant))
}

async fn payment_history(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    registry::get_tenant(&state.db_pool, path.tenant_id).await?;
    let rows = ledger_store::list_payments(
        &state.db_pool,
        Some(path.tenant_id),
        clamp_limit_in_range(query.limit, 1, 500),
        query.offset,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

/// Renew the lease and record the renewal payment in one transaction.
async fn renew_lease(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(payload): Json<RenewLeaseInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let outcome =
        ledger::renew_lease_with_payment(&state.db_pool, path.tenant_id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(outcome)))
}

async fn end_lease(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Value>> {
    occupancy::end_lease(&state.db_pool, path.tenant_id).await?;
    Ok(Json(json!({ "message": "Lease ended successfully." })))
}
