//! Ride service: publication, search and the driver-side lifecycle

use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::account::service::{credit_account, find_account};
use crate::account::{Actor, CreditKind, LedgerReference};
use crate::booking::service::{active_bookings_for_update, save_booking_status};
use crate::booking::BookingStatus;
use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::ride::model::{validate_schedule, CreateRideRequest, Ride, RideFilter, RideStatus};
use crate::vehicle::service::find_owned_vehicle;

/// Fetch a ride and hold its row lock until the transaction ends
pub(crate) async fn lock_ride(conn: &mut PgConnection, ride_id: Uuid) -> ApiResult<Ride> {
    sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1 FOR UPDATE")
        .bind(ride_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ride {} not found", ride_id)))
}

/// Lock a ride that must be driven by `driver_id`; anything else reads as missing
pub(crate) async fn lock_owned_ride(
    conn: &mut PgConnection,
    driver_id: Uuid,
    ride_id: Uuid,
) -> ApiResult<Ride> {
    sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1 AND driver_id = $2 FOR UPDATE")
        .bind(ride_id)
        .bind(driver_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ride {} not found", ride_id)))
}

/// Persist status and seat inventory after an in-memory mutation
pub(crate) async fn save_ride_state(conn: &mut PgConnection, ride: &Ride) -> ApiResult<()> {
    sqlx::query(
        "UPDATE rides SET status = $1, available_seats = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(ride.status)
    .bind(ride.available_seats)
    .bind(Utc::now())
    .bind(ride.id)
    .execute(conn)
    .await?;
    Ok(())
}

fn push_search_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &RideFilter) {
    builder.push(" WHERE r.status = ");
    builder.push_bind(RideStatus::Open);

    if let Some(city) = filter.departure_city.as_deref().filter(|c| !c.is_empty()) {
        builder.push(" AND r.departure_city ILIKE ");
        builder.push_bind(city.to_string());
    }
    if let Some(city) = filter.arrival_city.as_deref().filter(|c| !c.is_empty()) {
        builder.push(" AND r.arrival_city ILIKE ");
        builder.push_bind(city.to_string());
    }
    if let Some(date) = filter.date {
        let day_start = date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        if let Some(start) = day_start {
            builder.push(" AND r.departure_at >= ");
            builder.push_bind(start);
            builder.push(" AND r.departure_at < ");
            builder.push_bind(start + Duration::days(1));
        }
    }
    if filter.eco_only.unwrap_or(false) {
        builder.push(" AND r.is_eco_friendly = TRUE");
    }
    if let Some(max_price) = filter.max_price {
        builder.push(" AND r.price <= ");
        builder.push_bind(max_price);
    }
    if let Some(min_rating) = filter.min_rating {
        builder.push(" AND a.rating >= ");
        builder.push_bind(min_rating);
    }
}

#[derive(Clone)]
pub struct RideService {
    db_pool: PgPool,
}

impl RideService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Publish a ride on one of the driver's vehicles
    pub async fn create_ride(&self, actor: Actor, request: CreateRideRequest) -> ApiResult<Ride> {
        validate_schedule(request.departure_at, request.arrival_at, Utc::now())?;

        let mut tx = self.db_pool.begin().await?;

        let driver = find_account(&mut *tx, actor.account_id).await?;
        driver.driver_profile()?;

        let vehicle = find_owned_vehicle(&mut *tx, driver.id, request.vehicle_id).await?;
        if request.offered_seats > vehicle.seats {
            return Err(ApiError::BadRequest(format!(
                "Vehicle {} only has {} seats",
                vehicle.id, vehicle.seats
            )));
        }

        let now = Utc::now();
        let ride = sqlx::query_as::<_, Ride>(
            r#"
            INSERT INTO rides (id, driver_id, vehicle_id, departure_city, departure_address,
                               departure_at, arrival_city, arrival_address, arrival_at, price,
                               offered_seats, available_seats, is_eco_friendly, status,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12, $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(driver.id)
        .bind(vehicle.id)
        .bind(&request.departure_city)
        .bind(&request.departure_address)
        .bind(request.departure_at)
        .bind(&request.arrival_city)
        .bind(&request.arrival_address)
        .bind(request.arrival_at)
        .bind(request.price)
        .bind(request.offered_seats)
        .bind(vehicle.is_eco_vehicle())
        .bind(RideStatus::Open)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            ride_id = %ride.id,
            driver_id = %ride.driver_id,
            seats = ride.offered_seats,
            price = ride.price,
            eco = ride.is_eco_friendly,
            "Ride published"
        );

        Ok(ride)
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> ApiResult<Ride> {
        sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1")
            .bind(ride_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Ride {} not found", ride_id)))
    }

    /// Open rides matching the filter, soonest departure first
    pub async fn search_rides(&self, filter: RideFilter) -> ApiResult<PaginatedResponse<Ride>> {
        let (page, limit, offset) = PaginationParams {
            page: filter.page,
            limit: filter.limit,
        }
        .resolve();

        let mut count_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM rides r JOIN accounts a ON a.id = r.driver_id",
        );
        push_search_filters(&mut count_query, &filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.db_pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT r.* FROM rides r JOIN accounts a ON a.id = r.driver_id",
        );
        push_search_filters(&mut query, &filter);
        query.push(" ORDER BY r.departure_at ASC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rides = query
            .build_query_as::<Ride>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: rides,
            total,
            page,
            limit,
        })
    }

    pub async fn list_driver_rides(&self, driver_id: Uuid) -> ApiResult<Vec<Ride>> {
        let rides = sqlx::query_as::<_, Ride>(
            "SELECT * FROM rides WHERE driver_id = $1 ORDER BY departure_at DESC",
        )
        .bind(driver_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rides)
    }

    pub async fn start_ride(&self, actor: Actor, ride_id: Uuid) -> ApiResult<Ride> {
        let mut tx = self.db_pool.begin().await?;

        let mut ride = lock_owned_ride(&mut *tx, actor.account_id, ride_id).await?;
        ride.transition_to(RideStatus::InProgress)?;
        save_ride_state(&mut *tx, &ride).await?;

        tx.commit().await?;

        tracing::info!(ride_id = %ride.id, driver_id = %ride.driver_id, "Ride started");

        Ok(ride)
    }

    /// Complete the ride and move its confirmed bookings to awaiting feedback
    pub async fn end_ride(&self, actor: Actor, ride_id: Uuid) -> ApiResult<Ride> {
        let mut tx = self.db_pool.begin().await?;

        let mut ride = lock_owned_ride(&mut *tx, actor.account_id, ride_id).await?;
        ride.transition_to(RideStatus::Completed)?;
        save_ride_state(&mut *tx, &ride).await?;

        let bookings = active_bookings_for_update(&mut *tx, ride.id).await?;
        let mut awaiting = 0;
        for mut booking in bookings {
            if booking.status != BookingStatus::Confirmed {
                continue;
            }
            booking.transition_to(BookingStatus::AwaitingFeedback)?;
            save_booking_status(&mut *tx, &booking).await?;
            awaiting += 1;
        }

        tx.commit().await?;

        tracing::info!(
            ride_id = %ride.id,
            driver_id = %ride.driver_id,
            bookings_awaiting_feedback = awaiting,
            "Ride completed"
        );

        Ok(ride)
    }

    /// Cancel the ride, cancelling and refunding every confirmed booking on it
    pub async fn cancel_ride(&self, actor: Actor, ride_id: Uuid) -> ApiResult<Ride> {
        let mut tx = self.db_pool.begin().await?;

        let mut ride = lock_owned_ride(&mut *tx, actor.account_id, ride_id).await?;
        ride.transition_to(RideStatus::Cancelled)?;
        save_ride_state(&mut *tx, &ride).await?;

        let bookings = active_bookings_for_update(&mut *tx, ride.id).await?;
        let mut refunded = 0;
        for mut booking in bookings {
            booking.transition_to(BookingStatus::Cancelled)?;
            save_booking_status(&mut *tx, &booking).await?;

            credit_account(
                &mut *tx,
                booking.passenger_id,
                ride.total_price(booking.seats_booked),
                CreditKind::BookingRefund,
                LedgerReference::booking(booking.id),
            )
            .await?;
            refunded += 1;
        }

        tx.commit().await?;

        tracing::info!(
            ride_id = %ride.id,
            driver_id = %ride.driver_id,
            bookings_refunded = refunded,
            "Ride cancelled"
        );

        Ok(ride)
    }
}
