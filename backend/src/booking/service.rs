//! Booking orchestration: seats, credits and both state machines in one transaction
//!
//! Row locks are always taken ride first, then booking, then account. A ride
//! cascade touches several accounts, so it visits them in passenger id order.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::account::service::{credit_account, debit_account, lock_account};
use crate::account::{Actor, CreditKind, LedgerReference, Role};
use crate::booking::model::{Booking, BookingStatus};
use crate::booking::settlement::Settlement;
use crate::error::{ApiError, ApiResult};
use crate::incident::service::{ensure_not_reported, open_incident};
use crate::incident::Incident;
use crate::ride::model::{Ride, RideStatus};
use crate::ride::service::{lock_ride, save_ride_state};

/// Active bookings on a ride, locked for a cascade and ordered by passenger
pub(crate) async fn active_bookings_for_update(
    conn: &mut PgConnection,
    ride_id: Uuid,
) -> ApiResult<Vec<Booking>> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE ride_id = $1 AND status IN ('confirmed', 'awaiting_feedback')
        ORDER BY passenger_id, id
        FOR UPDATE
        "#,
    )
    .bind(ride_id)
    .fetch_all(conn)
    .await?;

    Ok(bookings)
}

pub(crate) async fn save_booking_status(
    conn: &mut PgConnection,
    booking: &Booking,
) -> ApiResult<()> {
    sqlx::query("UPDATE bookings SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(booking.status)
        .bind(Utc::now())
        .bind(booking.id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn find_passenger_booking(
    conn: &mut PgConnection,
    passenger_id: Uuid,
    booking_id: Uuid,
) -> ApiResult<Booking> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 AND passenger_id = $2")
        .bind(booking_id)
        .bind(passenger_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", booking_id)))
}

async fn lock_booking(conn: &mut PgConnection, booking_id: Uuid) -> ApiResult<Booking> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", booking_id)))
}

/// Lock the ride, then the passenger's booking on it
async fn lock_ride_and_booking(
    conn: &mut PgConnection,
    passenger_id: Uuid,
    booking_id: Uuid,
) -> ApiResult<(Ride, Booking)> {
    let found = find_passenger_booking(&mut *conn, passenger_id, booking_id).await?;
    let ride = lock_ride(&mut *conn, found.ride_id).await?;
    let booking = lock_booking(&mut *conn, found.id).await?;
    Ok((ride, booking))
}

/// Booking service
#[derive(Clone)]
pub struct BookingService {
    db_pool: PgPool,
    platform_fee_per_seat: i64,
}

impl BookingService {
    pub fn new(db_pool: PgPool, platform_fee_per_seat: i64) -> Self {
        Self {
            db_pool,
            platform_fee_per_seat,
        }
    }

    /// Reserve `seats` on a ride and debit the passenger
    pub async fn create_booking(&self, actor: Actor, ride_id: Uuid, seats: i32) -> ApiResult<Booking> {
        let mut tx = self.db_pool.begin().await?;

        let mut ride = lock_ride(&mut *tx, ride_id).await?;
        let passenger = lock_account(&mut *tx, actor.account_id).await?;
        passenger.passenger_profile()?;

        if ride.status != RideStatus::Open {
            return Err(ApiError::InvalidState(format!(
                "Ride {} is {} and not open for booking",
                ride.id,
                ride.status.as_str()
            )));
        }
        if ride.is_driven_by(passenger.id) {
            return Err(ApiError::Forbidden(
                "Drivers cannot book their own ride".to_string(),
            ));
        }

        let already_booked: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE ride_id = $1 AND passenger_id = $2
                  AND status IN ('confirmed', 'awaiting_feedback')
            )
            "#,
        )
        .bind(ride.id)
        .bind(passenger.id)
        .fetch_one(&mut *tx)
        .await?;
        if already_booked {
            return Err(ApiError::Conflict(format!(
                "An active booking already exists on ride {}",
                ride.id
            )));
        }

        ride.remove_seats(seats)?;
        let price = ride.total_price(seats);

        let now = Utc::now();
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, ride_id, passenger_id, seats_booked, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ride.id)
        .bind(passenger.id)
        .bind(seats)
        .bind(BookingStatus::Confirmed)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        save_ride_state(&mut *tx, &ride).await?;
        let passenger = debit_account(
            &mut *tx,
            passenger.id,
            price,
            CreditKind::BookingDebit,
            LedgerReference::booking(booking.id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            ride_id = %ride.id,
            passenger_id = %passenger.id,
            seats,
            debited = price,
            balance = passenger.credits(),
            available_seats = ride.available_seats,
            "Booking confirmed"
        );

        Ok(booking)
    }

    /// Cancel a confirmed booking with a full refund
    pub async fn cancel_booking(&self, actor: Actor, booking_id: Uuid) -> ApiResult<Booking> {
        let mut tx = self.db_pool.begin().await?;

        let (mut ride, mut booking) =
            lock_ride_and_booking(&mut *tx, actor.account_id, booking_id).await?;

        booking.transition_to(BookingStatus::Cancelled)?;
        ride.add_seats(booking.seats_booked)?;

        save_booking_status(&mut *tx, &booking).await?;
        save_ride_state(&mut *tx, &ride).await?;

        let refund = ride.total_price(booking.seats_booked);
        let passenger = credit_account(
            &mut *tx,
            booking.passenger_id,
            refund,
            CreditKind::BookingRefund,
            LedgerReference::booking(booking.id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            ride_id = %ride.id,
            refunded = refund,
            balance = passenger.credits(),
            "Booking cancelled"
        );

        Ok(booking)
    }

    /// Passenger confirms the ride went well; the driver is paid now
    pub async fn confirm_successful_booking(
        &self,
        actor: Actor,
        booking_id: Uuid,
    ) -> ApiResult<Booking> {
        let mut tx = self.db_pool.begin().await?;

        let (ride, mut booking) =
            lock_ride_and_booking(&mut *tx, actor.account_id, booking_id).await?;

        booking.ensure_awaiting_feedback()?;
        booking.transition_to(BookingStatus::Completed)?;
        save_booking_status(&mut *tx, &booking).await?;

        let settlement =
            Settlement::for_booking(ride.price, booking.seats_booked, self.platform_fee_per_seat);
        if settlement.driver_payout > 0 {
            credit_account(
                &mut *tx,
                ride.driver_id,
                settlement.driver_payout,
                CreditKind::DriverPayout,
                LedgerReference::booking(booking.id),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            driver_id = %ride.driver_id,
            payout = settlement.driver_payout,
            platform_fee = settlement.platform_fee,
            "Booking settled"
        );

        Ok(booking)
    }

    /// Passenger reports a problem; the driver payout is withheld until the
    /// incident is resolved
    pub async fn confirm_booking_with_incident(
        &self,
        actor: Actor,
        booking_id: Uuid,
        description: &str,
    ) -> ApiResult<Incident> {
        let mut tx = self.db_pool.begin().await?;

        let (ride, mut booking) =
            lock_ride_and_booking(&mut *tx, actor.account_id, booking_id).await?;

        // A repeated report is a conflict even though the booking has moved on
        ensure_not_reported(&mut *tx, ride.id, booking.passenger_id).await?;
        booking.ensure_awaiting_feedback()?;
        booking.transition_to(BookingStatus::Completed)?;
        save_booking_status(&mut *tx, &booking).await?;

        let incident = open_incident(
            &mut *tx,
            &booking,
            &ride,
            description,
            self.platform_fee_per_seat,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            incident_id = %incident.id,
            withheld = incident.reward_amount,
            "Booking completed with incident"
        );

        Ok(incident)
    }

    /// Visible to its passenger, the ride's driver and staff
    pub async fn get_booking(&self, actor: Actor, booking_id: Uuid) -> ApiResult<Booking> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            JOIN rides r ON r.id = b.ride_id
            WHERE b.id = $1 AND (b.passenger_id = $2 OR r.driver_id = $2 OR $3)
            "#,
        )
        .bind(booking_id)
        .bind(actor.account_id)
        .bind(actor.role != Role::User)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", booking_id)))?;

        Ok(booking)
    }

    pub async fn list_passenger_bookings(&self, actor: Actor) -> ApiResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE passenger_id = $1 ORDER BY created_at DESC",
        )
        .bind(actor.account_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(bookings)
    }

    /// Bookings on a ride, for its driver only
    pub async fn list_ride_bookings(&self, actor: Actor, ride_id: Uuid) -> ApiResult<Vec<Booking>> {
        let owns_ride: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rides WHERE id = $1 AND driver_id = $2)",
        )
        .bind(ride_id)
        .bind(actor.account_id)
        .fetch_one(&self.db_pool)
        .await?;
        if !owns_ride {
            return Err(ApiError::NotFound(format!("Ride {} not found", ride_id)));
        }

        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE ride_id = $1 ORDER BY created_at",
        )
        .bind(ride_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(bookings)
    }
}
