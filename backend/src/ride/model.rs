//! Ride models: lifecycle state machine and seat inventory

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

pub const MIN_PRICE: i32 = 10;
pub const MAX_PRICE: i32 = 500;
pub const MAX_OFFERED_SEATS: i32 = 6;

/// Ride lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ride_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Open,
    Full,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl RideStatus {
    /// Allow-list of lifecycle transitions
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Open, Full)
                | (Open, Cancelled)
                | (Open, InProgress)
                | (Full, InProgress)
                | (Full, Cancelled)
                | (Full, NoShow)
                | (InProgress, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::Cancelled | RideStatus::NoShow
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Open => "open",
            RideStatus::Full => "full",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::NoShow => "no_show",
        }
    }
}

/// Ride model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Ride {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub departure_city: String,
    pub departure_address: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_city: String,
    pub arrival_address: String,
    pub arrival_at: DateTime<Utc>,
    pub price: i32,
    pub offered_seats: i32,
    pub available_seats: i32,
    pub is_eco_friendly: bool,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    /// Move to `next` if the allow-list permits it; status is untouched otherwise
    pub fn transition_to(&mut self, next: RideStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidState(format!(
                "ride {} cannot go from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Take `n` seats out of the inventory; the last seat fills the ride
    pub fn remove_seats(&mut self, n: i32) -> Result<(), DomainError> {
        ensure_positive_seats(n)?;
        if !matches!(self.status, RideStatus::Open | RideStatus::Full) {
            return Err(DomainError::InvalidState(format!(
                "ride {} is {} and not bookable",
                self.id,
                self.status.as_str()
            )));
        }
        if n > self.available_seats {
            return Err(DomainError::InsufficientCapacity {
                requested: n,
                available: self.available_seats,
            });
        }

        self.available_seats -= n;
        if self.available_seats == 0 && self.status == RideStatus::Open {
            self.transition_to(RideStatus::Full)?;
        }
        Ok(())
    }

    /// Return `n` seats to a ride still accepting bookings, capped at the offer
    pub fn add_seats(&mut self, n: i32) -> Result<(), DomainError> {
        ensure_positive_seats(n)?;
        if self.status != RideStatus::Open {
            return Err(DomainError::InvalidState(format!(
                "seats can only be returned to an open ride, ride {} is {}",
                self.id,
                self.status.as_str()
            )));
        }

        // Full rides are refused above, so the status never has to flip back here.
        self.available_seats = (self.available_seats + n).min(self.offered_seats);
        Ok(())
    }

    /// Credits owed by a passenger for `seats`
    pub fn total_price(&self, seats: i32) -> i64 {
        i64::from(self.price) * i64::from(seats)
    }

    pub fn is_driven_by(&self, account_id: Uuid) -> bool {
        self.driver_id == account_id
    }
}

fn ensure_positive_seats(n: i32) -> Result<(), DomainError> {
    if n < 1 {
        return Err(DomainError::Invalid(
            "seat count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Departure strictly before arrival, and in the future when published
pub fn validate_schedule(
    departure_at: DateTime<Utc>,
    arrival_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if departure_at >= arrival_at {
        return Err(DomainError::Invalid(
            "departure must be before arrival".to_string(),
        ));
    }
    if departure_at <= now {
        return Err(DomainError::Invalid(
            "departure must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Point-in-time copy of a ride kept inside incident records
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RideSnapshot {
    pub id: Uuid,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub price: i32,
    pub vehicle_id: Uuid,
}

impl From<&Ride> for RideSnapshot {
    fn from(ride: &Ride) -> Self {
        Self {
            id: ride.id,
            departure_city: ride.departure_city.clone(),
            arrival_city: ride.arrival_city.clone(),
            departure_at: ride.departure_at,
            arrival_at: ride.arrival_at,
            price: ride.price,
            vehicle_id: ride.vehicle_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRideRequest {
    pub vehicle_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub departure_city: String,
    #[validate(length(min = 1, max = 255))]
    pub departure_address: String,
    pub departure_at: DateTime<Utc>,
    #[validate(length(min = 1, max = 100))]
    pub arrival_city: String,
    #[validate(length(min = 1, max = 255))]
    pub arrival_address: String,
    pub arrival_at: DateTime<Utc>,
    #[validate(range(min = 10, max = 500))]
    pub price: i32,
    #[validate(range(min = 1, max = 6))]
    pub offered_seats: i32,
}

/// Search filter for open rides
#[derive(Debug, Deserialize, Default)]
pub struct RideFilter {
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub date: Option<NaiveDate>,
    pub eco_only: Option<bool>,
    pub max_price: Option<i32>,
    pub min_rating: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
pub(crate) fn sample_ride(price: i32, offered_seats: i32) -> Ride {
    let departure_at = Utc::now() + chrono::Duration::days(1);
    Ride {
        id: Uuid::new_v4(),
        driver_id: Uuid::new_v4(),
        vehicle_id: Uuid::new_v4(),
        departure_city: "Lyon".to_string(),
        departure_address: "Place Bellecour".to_string(),
        departure_at,
        arrival_city: "Grenoble".to_string(),
        arrival_address: "Gare".to_string(),
        arrival_at: departure_at + chrono::Duration::hours(2),
        price,
        offered_seats,
        available_seats: offered_seats,
        is_eco_friendly: false,
        status: RideStatus::Open,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
