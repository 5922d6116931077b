//! Incident records with frozen snapshots and the withheld driver payout

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::account::{Account, AccountSnapshot};
use crate::booking::{Booking, Settlement};
use crate::error::DomainError;
use crate::ride::{Ride, RideSnapshot, RideStatus};

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "incident_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Pending,
    Assigned,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::Assigned => "assigned",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

/// How an incident was closed
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Closure {
    pub at: DateTime<Utc>,
    pub note: String,
}

/// Snapshots are captured once at creation and never re-synced with the
/// live ride or accounts.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Incident {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Uuid,
    pub description: String,
    pub ride_snapshot: Json<RideSnapshot>,
    pub passenger_snapshot: Json<AccountSnapshot>,
    pub driver_snapshot: Json<AccountSnapshot>,
    pub reward_amount: i64,
    pub status: IncidentStatus,
    pub assigned_to: Option<Uuid>,
    pub closure: Option<Json<Closure>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Build a pending incident for a booking on a completed ride
    pub fn open(
        booking: &Booking,
        ride: &Ride,
        passenger: &Account,
        driver: &Account,
        description: &str,
        fee_per_seat: i64,
    ) -> Result<Self, DomainError> {
        if ride.status != RideStatus::Completed {
            return Err(DomainError::InvalidState(format!(
                "incidents can only be reported on completed rides, ride {} is {}",
                ride.id,
                ride.status.as_str()
            )));
        }

        let settlement = Settlement::for_booking(ride.price, booking.seats_booked, fee_per_seat);
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            ride_id: ride.id,
            passenger_id: passenger.id,
            driver_id: driver.id,
            description: description.to_string(),
            ride_snapshot: Json(RideSnapshot::from(ride)),
            passenger_snapshot: Json(AccountSnapshot::from(passenger)),
            driver_snapshot: Json(AccountSnapshot::from(driver)),
            reward_amount: settlement.driver_payout,
            status: IncidentStatus::Pending,
            assigned_to: None,
            closure: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Hand the incident to an employee. Reassignment is refused, even to the
    /// same employee.
    pub fn assign(&mut self, employee_id: Uuid) -> Result<(), DomainError> {
        if self.status == IncidentStatus::Resolved {
            return Err(DomainError::InvalidState(format!(
                "incident {} is already resolved",
                self.id
            )));
        }
        if let Some(current) = self.assigned_to {
            return Err(DomainError::Conflict(format!(
                "incident {} is already assigned to {}",
                self.id, current
            )));
        }
        self.assigned_to = Some(employee_id);
        self.status = IncidentStatus::Assigned;
        Ok(())
    }

    /// Close the incident. Only the assigned employee may do so, once.
    pub fn resolve(
        &mut self,
        employee_id: Uuid,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match self.status {
            IncidentStatus::Assigned => {}
            IncidentStatus::Resolved => {
                return Err(DomainError::InvalidState(format!(
                    "incident {} is already resolved",
                    self.id
                )))
            }
            IncidentStatus::Pending => {
                return Err(DomainError::InvalidState(format!(
                    "incident {} must be assigned before it is resolved",
                    self.id
                )))
            }
        }
        if self.assigned_to != Some(employee_id) {
            return Err(DomainError::Forbidden(format!(
                "incident {} is assigned to another employee",
                self.id
            )));
        }

        self.status = IncidentStatus::Resolved;
        self.closure = Some(Json(Closure {
            at,
            note: note.to_string(),
        }));
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResolveIncidentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub note: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::model::sample_account;
    use crate::booking::model::sample_booking;
    use crate::booking::BookingStatus;
    use crate::ride::model::sample_ride;

    fn pending_incident() -> Incident {
        let passenger = sample_account(10);
        let driver = sample_account(0);
        let mut ride = sample_ride(20, 2);
        ride.driver_id = driver.id;
        ride.status = RideStatus::Completed;
        let booking = sample_booking(ride.id, passenger.id, BookingStatus::Completed);
        Incident::open(&booking, &ride, &passenger, &driver, "Driver was very late", 2).unwrap()
    }

    #[test]
    fn test_open_computes_withheld_payout() {
        let incident = pending_incident();
        assert_eq!(incident.status, IncidentStatus::Pending);
        assert_eq!(incident.reward_amount, 18);
        assert_eq!(incident.ride_snapshot.0.price, 20);
        assert!(incident.assigned_to.is_none());
        assert!(incident.closure.is_none());
    }

    #[test]
    fn test_open_requires_completed_ride() {
        let account = sample_account(0);
        let ride = sample_ride(20, 2);
        let booking = sample_booking(ride.id, account.id, BookingStatus::Confirmed);
        let err = Incident::open(&booking, &ride, &account, &account, "too early", 2).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn test_double_assignment_conflicts() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut incident = pending_incident();
        incident.assign(first).unwrap();

        assert!(matches!(incident.assign(second), Err(DomainError::Conflict(_))));
        assert!(matches!(incident.assign(first), Err(DomainError::Conflict(_))));
        assert_eq!(incident.assigned_to, Some(first));
    }

    #[test]
    fn test_resolve_rules() {
        let employee = Uuid::new_v4();
        let mut incident = pending_incident();

        assert!(matches!(
            incident.resolve(employee, "done", Utc::now()),
            Err(DomainError::InvalidState(_))
        ));

        incident.assign(employee).unwrap();
        assert!(matches!(
            incident.resolve(Uuid::new_v4(), "done", Utc::now()),
            Err(DomainError::Forbidden(_))
        ));

        incident.resolve(employee, "Refund not warranted", Utc::now()).unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert_eq!(
            incident.closure.as_ref().map(|c| c.0.note.as_str()),
            Some("Refund not warranted")
        );

        assert!(matches!(
            incident.resolve(employee, "again", Utc::now()),
            Err(DomainError::InvalidState(_))
        ));
        assert!(matches!(
            incident.assign(employee),
            Err(DomainError::InvalidState(_))
        ));
    }
}
