use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::account::service::find_account;
use crate::account::Actor;
use crate::error::{ApiError, ApiResult};
use crate::vehicle::model::{normalize_plate, CreateVehicleRequest, UpdateVehicleRequest, Vehicle};

/// Look up a vehicle that must belong to `owner_id`
pub(crate) async fn find_owned_vehicle(
    conn: &mut PgConnection,
    owner_id: Uuid,
    vehicle_id: Uuid,
) -> ApiResult<Vehicle> {
    sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 AND owner_id = $2")
        .bind(vehicle_id)
        .bind(owner_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Vehicle {} not found", vehicle_id)))
}

#[derive(Clone)]
pub struct VehicleService {
    db_pool: PgPool,
}

impl VehicleService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_vehicle(
        &self,
        actor: Actor,
        request: CreateVehicleRequest,
    ) -> ApiResult<Vehicle> {
        let mut tx = self.db_pool.begin().await?;

        let owner = find_account(&mut *tx, actor.account_id).await?;
        owner.driver_profile()?;

        let plate = normalize_plate(&request.plate_number);
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE plate_number = $1)")
                .bind(&plate)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(ApiError::Conflict(format!(
                "Vehicle with plate {} already registered",
                plate
            )));
        }

        let now = Utc::now();
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, owner_id, brand, model, color, plate_number,
                                  first_registration, energy, seats, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner.id)
        .bind(&request.brand)
        .bind(&request.model)
        .bind(&request.color)
        .bind(&plate)
        .bind(request.first_registration)
        .bind(request.energy)
        .bind(request.seats)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(vehicle_id = %vehicle.id, owner_id = %vehicle.owner_id, "Vehicle registered");

        Ok(vehicle)
    }

    pub async fn update_vehicle(
        &self,
        actor: Actor,
        vehicle_id: Uuid,
        request: UpdateVehicleRequest,
    ) -> ApiResult<Vehicle> {
        let mut tx = self.db_pool.begin().await?;

        let current = find_owned_vehicle(&mut *tx, actor.account_id, vehicle_id).await?;

        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET color = $1, energy = $2, seats = $3, updated_at = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(request.color.unwrap_or(current.color))
        .bind(request.energy.unwrap_or(current.energy))
        .bind(request.seats.unwrap_or(current.seats))
        .bind(Utc::now())
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(vehicle)
    }

    pub async fn list_vehicles(&self, owner_id: Uuid) -> ApiResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(vehicles)
    }
}
