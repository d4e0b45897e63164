use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{Property, PropertyKind};
use crate::repository::registry;
use crate::schemas::{
    clamp_limit_in_range, validate_input, AssignTenantInput, CreatePropertyInput, CreateUnitInput,
    PropertiesQuery, PropertyPath, UnitsQuery,
};
use crate::services::occupancy;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/properties",
            axum::routing::get(list_properties).post(create_property),
        )
        .route(
            "/properties/assign-tenant",
            axum::routing::post(assign_tenant),
        )
        .route("/properties/{property_id}", axum::routing::get(get_property))
        .route(
            "/properties/{property_id}/units",
            axum::routing::get(list_units).post(create_unit),
        )
}

async fn create_property(
    State(state): State<AppState>,
    Json(payload): Json<CreatePropertyInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    match payload.kind {
        PropertyKind::Standard if payload.price.is_none() => {
            return Err(AppError::Validation(
                "A standard property requires a rent price.".to_string(),
            ));
        }
        PropertyKind::MultiUnit if payload.price.is_some() => {
            return Err(AppError::Validation(
                "A multi-unit property carries no price of its own; price the units instead."
                    .to_string(),
            ));
        }
        _ => {}
    }
    registry::get_landlord(&state.db_pool, payload.landlord_id).await?;

    let created = registry::insert_property(&state.db_pool, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<PropertiesQuery>,
) -> AppResult<Json<Value>> {
    let rows = registry::list_properties(
        &state.db_pool,
        query.status,
        clamp_limit_in_range(query.limit, 1, 500),
        query.offset,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
) -> AppResult<Json<Property>> {
    let property = registry::get_property(&state.db_pool, path.property_id).await?;
    Ok(Json(property))
}

async fn create_unit(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Json(payload): Json<CreateUnitInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let property = registry::get_property(&state.db_pool, path.property_id).await?;
    if property.kind != PropertyKind::MultiUnit {
        return Err(AppError::BusinessRule(
            "Units can only be added to a multi-unit property.".to_string(),
        ));
    }

    let created = registry::insert_unit(&state.db_pool, property.id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_units(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Query(query): Query<UnitsQuery>,
) -> AppResult<Json<Value>> {
    registry::get_property(&state.db_pool, path.property_id).await?;
    let rows = registry::list_units(&state.db_pool, path.property_id, query.status).await?;
    Ok(Json(json!({ "data": rows })))
}

async fn assign_tenant(
    State(state): State<AppState>,
    Json(payload): Json<AssignTenantInput>,
) -> AppResult<Json<Value>> {
    occupancy::assign_tenant(&state.db_pool, &payload).await?;
    Ok(Json(json!({ "message": "Tenant assigned successfully." })))
}
