use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::account::service::{credit_account, find_account};
use crate::account::{Actor, CreditKind, LedgerReference, Role};
use crate::booking::Booking;
use crate::error::{ApiError, ApiResult};
use crate::incident::model::{Incident, IncidentFilter};
use crate::ride::Ride;

/// One incident per passenger and ride
pub(crate) async fn ensure_not_reported(
    conn: &mut PgConnection,
    ride_id: Uuid,
    passenger_id: Uuid,
) -> ApiResult<()> {
    let already_reported: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM incidents WHERE ride_id = $1 AND passenger_id = $2)",
    )
    .bind(ride_id)
    .bind(passenger_id)
    .fetch_one(conn)
    .await?;
    if already_reported {
        return Err(ApiError::Conflict(format!(
            "An incident was already reported for ride {}",
            ride_id
        )));
    }
    Ok(())
}

/// Record a pending incident inside the caller's transaction. The booking
/// must already be completed without payout.
pub(crate) async fn open_incident(
    conn: &mut PgConnection,
    booking: &Booking,
    ride: &Ride,
    description: &str,
    fee_per_seat: i64,
) -> ApiResult<Incident> {
    ensure_not_reported(&mut *conn, ride.id, booking.passenger_id).await?;

    let passenger = find_account(&mut *conn, booking.passenger_id).await?;
    let driver = find_account(&mut *conn, ride.driver_id).await?;
    let incident = Incident::open(booking, ride, &passenger, &driver, description, fee_per_seat)?;

    let incident = sqlx::query_as::<_, Incident>(
        r#"
        INSERT INTO incidents (id, booking_id, ride_id, passenger_id, driver_id, description,
                               ride_snapshot, passenger_snapshot, driver_snapshot, reward_amount,
                               status, assigned_to, closure, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(incident.id)
    .bind(incident.booking_id)
    .bind(incident.ride_id)
    .bind(incident.passenger_id)
    .bind(incident.driver_id)
    .bind(&incident.description)
    .bind(&incident.ride_snapshot)
    .bind(&incident.passenger_snapshot)
    .bind(&incident.driver_snapshot)
    .bind(incident.reward_amount)
    .bind(incident.status)
    .bind(incident.assigned_to)
    .bind(&incident.closure)
    .bind(incident.created_at)
    .bind(incident.updated_at)
    .fetch_one(conn)
    .await?;

    tracing::info!(
        incident_id = %incident.id,
        booking_id = %incident.booking_id,
        reward_amount = incident.reward_amount,
        "Incident opened"
    );

    Ok(incident)
}

async fn lock_incident(conn: &mut PgConnection, incident_id: Uuid) -> ApiResult<Incident> {
    sqlx::query_as::<_, Incident>("SELECT * FROM incidents WHERE id = $1 FOR UPDATE")
        .bind(incident_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Incident {} not found", incident_id)))
}

async fn save_incident_state(conn: &mut PgConnection, incident: &Incident) -> ApiResult<Incident> {
    let saved = sqlx::query_as::<_, Incident>(
        r#"
        UPDATE incidents
        SET status = $1, assigned_to = $2, closure = $3, updated_at = $4
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(incident.status)
    .bind(incident.assigned_to)
    .bind(&incident.closure)
    .bind(Utc::now())
    .bind(incident.id)
    .fetch_one(conn)
    .await?;

    Ok(saved)
}

/// Incident handling for employees
#[derive(Clone)]
pub struct IncidentService {
    db_pool: PgPool,
}

impl IncidentService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn assign_incident(&self, actor: Actor, incident_id: Uuid) -> ApiResult<Incident> {
        actor.require_role(Role::Employee)?;

        let mut tx = self.db_pool.begin().await?;

        let mut incident = lock_incident(&mut *tx, incident_id).await?;
        incident.assign(actor.account_id)?;
        let incident = save_incident_state(&mut *tx, &incident).await?;

        tx.commit().await?;

        tracing::info!(
            incident_id = %incident.id,
            employee_id = %actor.account_id,
            "Incident assigned"
        );

        Ok(incident)
    }

    /// Close the incident and release the withheld payout to the driver
    pub async fn resolve_incident(
        &self,
        actor: Actor,
        incident_id: Uuid,
        note: &str,
    ) -> ApiResult<Incident> {
        actor.require_role(Role::Employee)?;

        let mut tx = self.db_pool.begin().await?;

        let mut incident = lock_incident(&mut *tx, incident_id).await?;
        incident.resolve(actor.account_id, note, Utc::now())?;
        let incident = save_incident_state(&mut *tx, &incident).await?;

        if incident.reward_amount > 0 {
            credit_account(
                &mut *tx,
                incident.driver_id,
                incident.reward_amount,
                CreditKind::IncidentPayout,
                LedgerReference::incident(incident.id, incident.booking_id),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            incident_id = %incident.id,
            employee_id = %actor.account_id,
            driver_id = %incident.driver_id,
            payout = incident.reward_amount,
            "Incident resolved"
        );

        Ok(incident)
    }

    pub async fn get_incident(&self, actor: Actor, incident_id: Uuid) -> ApiResult<Incident> {
        actor.require_role(Role::Employee)?;

        sqlx::query_as::<_, Incident>("SELECT * FROM incidents WHERE id = $1")
            .bind(incident_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Incident {} not found", incident_id)))
    }

    pub async fn list_incidents(
        &self,
        actor: Actor,
        filter: IncidentFilter,
    ) -> ApiResult<Vec<Incident>> {
        actor.require_role(Role::Employee)?;

        let incidents = sqlx::query_as::<_, Incident>(
            r#"
            SELECT * FROM incidents
            WHERE ($1::incident_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(incidents)
    }
}
