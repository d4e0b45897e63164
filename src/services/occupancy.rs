use sqlx::PgPool;
use tracing::info;

use crate::error::{map_db_error, AppError, AppResult};
use crate::models::{OccupancyStatus, PropertyKind};
use crate::repository::registry;
use crate::schemas::AssignTenantInput;

/// Place an unassigned tenant into a vacant unit or standalone property.
/// All checks run before any write; a unit assignment promotes the parent
/// property to occupied once every unit is taken.
pub async fn assign_tenant(pool: &PgPool, input: &AssignTenantInput) -> AppResult<()> {
    if let (Some(start), Some(end)) = (input.lease_start_date, input.lease_end_date) {
        if end <= start {
            return Err(AppError::Validation(
                "Lease end date must be after the start date.".to_string(),
            ));
        }
    }

    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let tenant = registry::get_tenant_for_update(&mut tx, input.tenant_id).await?;
    if tenant.is_assigned() {
        return Err(AppError::BusinessRule(
            "Tenant is already assigned to a property or unit.".to_string(),
        ));
    }

    match input.unit_id {
        Some(unit_id) => {
            let unit = registry::get_unit_for_update(&mut tx, unit_id).await?;
            if unit.property_id != input.property_id {
                return Err(AppError::BusinessRule(
                    "Unit does not belong to the selected property.".to_string(),
                ));
            }
            if unit.status != OccupancyStatus::Vacant {
                return Err(AppError::BusinessRule("Unit is not available.".to_string()));
            }

            registry::link_tenant(
                &mut tx,
                tenant.id,
                input.property_id,
                Some(unit.id),
                input.lease_start_date,
                input.lease_end_date,
            )
            .await?;
            registry::set_unit_occupancy(
                &mut tx,
                unit.id,
                OccupancyStatus::Occupied,
                Some(tenant.id),
            )
            .await?;

            let (total, occupied) = registry::unit_counts(&mut tx, input.property_id).await?;
            if total > 0 && occupied == total {
                registry::set_property_occupancy(
                    &mut tx,
                    input.property_id,
                    OccupancyStatus::Occupied,
                )
                .await?;
            }
        }
        None => {
            let property = registry::get_property_for_update(&mut tx, input.property_id).await?;
            if property.kind == PropertyKind::MultiUnit {
                return Err(AppError::BusinessRule(
                    "Multi-unit property requires a specific unit.".to_string(),
                ));
            }
            if property.status != OccupancyStatus::Vacant {
                return Err(AppError::BusinessRule(
                    "Property is not available.".to_string(),
                ));
            }

            registry::link_tenant(
                &mut tx,
                tenant.id,
                property.id,
                None,
                input.lease_start_date,
                input.lease_end_date,
            )
            .await?;
            registry::set_property_occupancy(&mut tx, property.id, OccupancyStatus::Occupied)
                .await?;
        }
    }

    tx.commit().await.map_err(map_db_error)?;

    info!(
        tenant_id = input.tenant_id,
        property_id = input.property_id,
        unit_id = input.unit_id,
        "Assigned tenant"
    );
    Ok(())
}

/// Terminate a tenant's lease: vacate the unit or property, clear the
/// assignment, and keep every payment and ledger row for history. A
/// multi-unit parent only goes vacant once no other tenant holds one of
/// its units.
pub async fn end_lease(pool: &PgPool, tenant_id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let tenant = registry::get_tenant_for_update(&mut tx, tenant_id).await?;

    if let Some(unit_id) = tenant.unit_id {
        registry::set_unit_occupancy(&mut tx, unit_id, OccupancyStatus::Vacant, None).await?;
    }
    if let Some(property_id) = tenant.property_id {
        let others = registry::other_unit_tenants(&mut tx, property_id, tenant.id).await?;
        if tenant.unit_id.is_none() || others == 0 {
            registry::set_property_occupancy(&mut tx, property_id, OccupancyStatus::Vacant).await?;
        }
    }
    registry::clear_tenant_assignment(&mut tx, tenant.id).await?;

    tx.commit().await.map_err(map_db_error)?;

    info!(tenant_id, "Ended lease");
    Ok(())
}
