//! Booking models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

/// Seats taken by one reservation made over the API
pub const BOOKED_SEATS_PER_RESERVATION: i32 = 1;

/// Booking status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    AwaitingFeedback,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Confirmed, AwaitingFeedback)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (AwaitingFeedback, Completed)
        )
    }

    /// Active bookings hold a seat and count against the one-per-ride rule
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::AwaitingFeedback)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::AwaitingFeedback => "awaiting_feedback",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub seats_booked: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn transition_to(&mut self, next: BookingStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidState(format!(
                "booking {} cannot go from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Passenger attestation is only accepted once the ride has ended
    pub fn ensure_awaiting_feedback(&self) -> Result<(), DomainError> {
        match self.status {
            BookingStatus::AwaitingFeedback => Ok(()),
            BookingStatus::Completed => Err(DomainError::InvalidState(format!(
                "booking {} is already completed",
                self.id
            ))),
            other => Err(DomainError::InvalidState(format!(
                "booking {} is {} and not awaiting feedback",
                self.id,
                other.as_str()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub ride_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReportIncidentRequest {
    #[validate(length(min = 10, max = 2000))]
    pub description: String,
}

#[cfg(test)]
pub(crate) fn sample_booking(ride_id: Uuid, passenger_id: Uuid, status: BookingStatus) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        ride_id,
        passenger_id,
        seats_booked: BOOKED_SEATS_PER_RESERVATION,
        status,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(status: BookingStatus) -> Booking {
        sample_booking(Uuid::new_v4(), Uuid::new_v4(), status)
    }

    #[test]
    fn test_confirmed_exits() {
        for next in [
            BookingStatus::AwaitingFeedback,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            let mut b = booking(BookingStatus::Confirmed);
            b.transition_to(next).unwrap();
            assert_eq!(b.status, next);
        }
    }

    #[test]
    fn test_awaiting_feedback_cannot_be_cancelled() {
        let mut b = booking(BookingStatus::AwaitingFeedback);
        assert!(matches!(
            b.transition_to(BookingStatus::Cancelled),
            Err(DomainError::InvalidState(_))
        ));
        assert_eq!(b.status, BookingStatus::AwaitingFeedback);
    }

    #[test]
    fn test_terminal_bookings_stay_put() {
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            let mut b = booking(status);
            assert!(b.transition_to(BookingStatus::Confirmed).is_err());
            assert_eq!(b.status, status);
        }
    }

    #[test]
    fn test_ensure_awaiting_feedback() {
        assert!(booking(BookingStatus::AwaitingFeedback)
            .ensure_awaiting_feedback()
            .is_ok());
        assert!(booking(BookingStatus::Confirmed)
            .ensure_awaiting_feedback()
            .is_err());
        assert!(booking(BookingStatus::Completed)
            .ensure_awaiting_feedback()
            .is_err());
    }

    #[test]
    fn test_active_statuses() {
        assert!(BookingStatus::Confirmed.is_active());
        assert!(BookingStatus::AwaitingFeedback.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(!BookingStatus::Completed.is_active());
    }

    #[test]
    fn test_incident_description_length() {
        let request = ReportIncidentRequest {
            description: "late".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
