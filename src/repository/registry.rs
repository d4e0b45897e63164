use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::error::{map_db_error, AppError, AppResult};
use crate::models::{Landlord, OccupancyStatus, Property, PropertyKind, Tenant, Unit};
use crate::schemas::{CreateLandlordInput, CreatePropertyInput, CreateTenantInput, CreateUnitInput};

/// Everything the ledger engine needs to know about an assigned tenant,
/// resolved in one query. `rent_due` is the unit price when the tenant
/// holds a unit, the property price otherwise.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BillingContext {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub property_id: i64,
    pub landlord_id: i64,
    pub landlord_name: String,
    pub unit_id: Option<i64>,
    pub rent_due: Option<f64>,
}

impl BillingContext {
    pub fn rent_due(&self) -> AppResult<f64> {
        self.rent_due.ok_or_else(|| {
            AppError::Internal("No rent price is configured for this assignment.".to_string())
        })
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, sqlx::FromRow)]
pub struct EntityCounts {
    pub landlords: i64,
    pub properties: i64,
    pub units: i64,
    pub tenants: i64,
    pub vacant_properties: i64,
    pub occupied_properties: i64,
    pub vacant_units: i64,
    pub occupied_units: i64,
}

pub async fn insert_landlord(pool: &PgPool, input: &CreateLandlordInput) -> AppResult<Landlord> {
    sqlx::query_as::<_, Landlord>(
        "INSERT INTO landlords (full_name, phone, email, address, bank_name, account_number)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&input.address)
    .bind(&input.bank_name)
    .bind(&input.account_number)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn list_landlords(pool: &PgPool, limit: i64, offset: i64) -> AppResult<Vec<Landlord>> {
    sqlx::query_as::<_, Landlord>(
        "SELECT * FROM landlords ORDER BY full_name ASC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn get_landlord(pool: &PgPool, landlord_id: i64) -> AppResult<Landlord> {
    sqlx::query_as::<_, Landlord>("SELECT * FROM landlords WHERE id = $1")
        .bind(landlord_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Landlord not found.".to_string()))
}

pub async fn insert_property(pool: &PgPool, input: &CreatePropertyInput) -> AppResult<Property> {
    let price = match input.kind {
        PropertyKind::MultiUnit => None,
        PropertyKind::Standard => input.price,
    };
    sqlx::query_as::<_, Property>(
        "INSERT INTO properties (title, kind, location, landlord_id, price, description)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&input.title)
    .bind(input.kind)
    .bind(&input.location)
    .bind(input.landlord_id)
    .bind(price)
    .bind(&input.description)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn list_properties(
    pool: &PgPool,
    status: Option<OccupancyStatus>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Property>> {
    sqlx::query_as::<_, Property>(
        "SELECT * FROM properties
         WHERE ($1::occupancy_status IS NULL OR status = $1)
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(limit)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn get_property(pool: &PgPool, property_id: i64) -> AppResult<Property> {
    sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
        .bind(property_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Property not found.".to_string()))
}

pub async fn insert_unit(
    pool: &PgPool,
    property_id: i64,
    input: &CreateUnitInput,
) -> AppResult<Unit> {
    sqlx::query_as::<_, Unit>(
        "INSERT INTO units (property_id, name, price)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(property_id)
    .bind(&input.name)
    .bind(input.price)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn list_units(
    pool: &PgPool,
    property_id: i64,
    status: Option<OccupancyStatus>,
) -> AppResult<Vec<Unit>> {
    sqlx::query_as::<_, Unit>(
        "SELECT * FROM units
         WHERE property_id = $1
           AND ($2::occupancy_status IS NULL OR status = $2)
         ORDER BY name ASC",
    )
    .bind(property_id)
    .bind(status)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn insert_tenant(pool: &PgPool, input: &CreateTenantInput) -> AppResult<Tenant> {
    sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (full_name, phone, email)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.email)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn list_tenants(pool: &PgPool, limit: i64, offset: i64) -> AppResult<Vec<Tenant>> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY full_name ASC LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(pool)
        .await
        .map_err(map_db_error)
}

pub async fn get_tenant(pool: &PgPool, tenant_id: i64) -> AppResult<Tenant> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))
}

/// Transactional fetch with a row lock, so occupancy and balance reads
/// cannot interleave with another writer touching the same tenant.
pub async fn get_tenant_for_update(conn: &mut PgConnection, tenant_id: i64) -> AppResult<Tenant> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 FOR UPDATE")
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))
}

pub async fn get_property_for_update(
    conn: &mut PgConnection,
    property_id: i64,
) -> AppResult<Property> {
    sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1 FOR UPDATE")
        .bind(property_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Property not found.".to_string()))
}

pub async fn get_unit_for_update(conn: &mut PgConnection, unit_id: i64) -> AppResult<Unit> {
    sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = $1 FOR UPDATE")
        .bind(unit_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Unit not found.".to_string()))
}

pub async fn billing_context(
    conn: &mut PgConnection,
    tenant_id: i64,
) -> AppResult<Option<BillingContext>> {
    sqlx::query_as::<_, BillingContext>(
        "SELECT t.id AS tenant_id,
                t.full_name AS tenant_name,
                p.id AS property_id,
                p.landlord_id AS landlord_id,
                l.full_name AS landlord_name,
                t.unit_id AS unit_id,
                CASE WHEN t.unit_id IS NOT NULL THEN u.price ELSE p.price END AS rent_due
         FROM tenants t
         JOIN properties p ON t.property_id = p.id
         JOIN landlords l ON p.landlord_id = l.id
         LEFT JOIN units u ON t.unit_id = u.id
         WHERE t.id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)
}

pub async fn link_tenant(
    conn: &mut PgConnection,
    tenant_id: i64,
    property_id: i64,
    unit_id: Option<i64>,
    lease_start_date: Option<NaiveDate>,
    lease_end_date: Option<NaiveDate>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE tenants
         SET property_id = $2,
             unit_id = $3,
             lease_start_date = COALESCE($4, lease_start_date),
             lease_end_date = COALESCE($5, lease_end_date),
             is_active = TRUE
         WHERE id = $1",
    )
    .bind(tenant_id)
    .bind(property_id)
    .bind(unit_id)
    .bind(lease_start_date)
    .bind(lease_end_date)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

/// Keeps the tenant row for history; only the assignment and the active
/// flag are cleared.
pub async fn clear_tenant_assignment(conn: &mut PgConnection, tenant_id: i64) -> AppResult<()> {
    sqlx::query(
        "UPDATE tenants
         SET property_id = NULL, unit_id = NULL, is_active = FALSE
         WHERE id = $1",
    )
    .bind(tenant_id)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

pub async fn update_lease_dates(
    conn: &mut PgConnection,
    tenant_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<()> {
    sqlx::query("UPDATE tenants SET lease_start_date = $2, lease_end_date = $3 WHERE id = $1")
        .bind(tenant_id)
        .bind(start)
        .bind(end)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn set_unit_occupancy(
    conn: &mut PgConnection,
    unit_id: i64,
    status: OccupancyStatus,
    tenant_id: Option<i64>,
) -> AppResult<()> {
    sqlx::query("UPDATE units SET status = $2, tenant_id = $3 WHERE id = $1")
        .bind(unit_id)
        .bind(status)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn set_property_occupancy(
    conn: &mut PgConnection,
    property_id: i64,
    status: OccupancyStatus,
) -> AppResult<()> {
    sqlx::query("UPDATE properties SET status = $2 WHERE id = $1")
        .bind(property_id)
        .bind(status)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// (total, occupied) unit counts for a property.
pub async fn unit_counts(conn: &mut PgConnection, property_id: i64) -> AppResult<(i64, i64)> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE status = 'occupied')
         FROM units
         WHERE property_id = $1",
    )
    .bind(property_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// Number of other tenants still holding a unit under this property.
pub async fn other_unit_tenants(
    conn: &mut PgConnection,
    property_id: i64,
    tenant_id: i64,
) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM tenants
         WHERE property_id = $1 AND id <> $2 AND unit_id IS NOT NULL",
    )
    .bind(property_id)
    .bind(tenant_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

pub async fn entity_counts(pool: &PgPool) -> AppResult<EntityCounts> {
    sqlx::query_as::<_, EntityCounts>(
        "SELECT (SELECT COUNT(*) FROM landlords) AS landlords,
                (SELECT COUNT(*) FROM properties) AS properties,
                (SELECT COUNT(*) FROM units) AS units,
                (SELECT COUNT(*) FROM tenants) AS tenants,
                (SELECT COUNT(*) FROM properties WHERE status = 'vacant') AS vacant_properties,
                (SELECT COUNT(*) FROM properties WHERE status = 'occupied') AS occupied_properties,
                (SELECT COUNT(*) FROM units WHERE status = 'vacant') AS vacant_units,
                (SELECT COUNT(*) FROM units WHERE status = 'occupied') AS occupied_units",
    )
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}
