//! Account models: roles, capability profiles, credit balance and ledger rows

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

/// Account roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::Invalid(format!("unknown role '{}'", other))),
        }
    }
}

/// Account row. A single record type for every role; ride capabilities are
/// flags resolved into [`DriverProfile`] / [`PassengerProfile`].
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub pseudo: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub credits: i64,
    pub is_driver: bool,
    pub is_passenger: bool,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Proof that an account may publish rides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverProfile {
    pub account_id: Uuid,
}

/// Proof that an account may book seats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassengerProfile {
    pub account_id: Uuid,
}

impl Account {
    pub fn driver_profile(&self) -> Result<DriverProfile, DomainError> {
        if self.role == Role::User && self.is_driver {
            Ok(DriverProfile {
                account_id: self.id,
            })
        } else {
            Err(DomainError::Forbidden(
                "driver capability required".to_string(),
            ))
        }
    }

    pub fn passenger_profile(&self) -> Result<PassengerProfile, DomainError> {
        if self.role == Role::User && self.is_passenger {
            Ok(PassengerProfile {
                account_id: self.id,
            })
        } else {
            Err(DomainError::Forbidden(
                "passenger capability required".to_string(),
            ))
        }
    }

    /// Credit the balance. Returns the new balance.
    pub fn add_credits(&mut self, amount: i64) -> Result<i64, DomainError> {
        if amount <= 0 {
            return Err(DomainError::Invalid(
                "credit amount must be positive".to_string(),
            ));
        }
        self.credits = self
            .credits
            .checked_add(amount)
            .ok_or_else(|| DomainError::Invalid("credit balance overflow".to_string()))?;
        Ok(self.credits)
    }

    /// Debit the balance after checking sufficiency. Returns the new balance.
    pub fn remove_credits(&mut self, amount: i64) -> Result<i64, DomainError> {
        if amount <= 0 {
            return Err(DomainError::Invalid(
                "debit amount must be positive".to_string(),
            ));
        }
        if amount > self.credits {
            return Err(DomainError::InsufficientFunds {
                required: amount,
                available: self.credits,
            });
        }
        self.credits -= amount;
        Ok(self.credits)
    }

    pub fn credits(&self) -> i64 {
        self.credits
    }
}

/// Identity of the caller, passed explicitly into every service operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub account_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(account_id: Uuid, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn require_role(&self, role: Role) -> Result<(), DomainError> {
        if self.role == role {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "{} role required",
                role.as_str()
            )))
        }
    }
}

/// Point-in-time copy of an account kept inside incident records
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub id: Uuid,
    pub pseudo: String,
    pub email: String,
    pub rating: Option<f64>,
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            pseudo: account.pseudo.clone(),
            email: account.email.clone(),
            rating: account.rating,
        }
    }
}

/// Reason a balance moved
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "credit_transaction_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreditKind {
    SignupBonus,
    BookingDebit,
    BookingRefund,
    DriverPayout,
    IncidentPayout,
}

/// Ledger row, written in the same transaction as the balance change
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: CreditKind,
    pub amount: i64,
    pub balance_after: i64,
    pub booking_id: Option<Uuid>,
    pub incident_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// What a ledger entry relates to
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerReference {
    pub booking_id: Option<Uuid>,
    pub incident_id: Option<Uuid>,
}

impl LedgerReference {
    pub fn booking(booking_id: Uuid) -> Self {
        Self {
            booking_id: Some(booking_id),
            incident_id: None,
        }
    }

    pub fn incident(incident_id: Uuid, booking_id: Uuid) -> Self {
        Self {
            booking_id: Some(booking_id),
            incident_id: Some(incident_id),
        }
    }
}

/// Driver travel preferences
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Preferences {
    pub account_id: Uuid,
    pub smoking_allowed: bool,
    pub animals_allowed: bool,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Public view of an account
#[derive(Debug, Serialize, Clone)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub pseudo: String,
    pub role: Role,
    pub credits: i64,
    pub is_driver: bool,
    pub is_passenger: bool,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            pseudo: account.pseudo,
            role: account.role,
            credits: account.credits,
            is_driver: account.is_driver,
            is_passenger: account.is_passenger,
            rating: account.rating,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "at_least_one_capability"))]
pub struct UpdateCapabilitiesRequest {
    pub is_driver: bool,
    pub is_passenger: bool,
}

fn at_least_one_capability(
    request: &UpdateCapabilitiesRequest,
) -> Result<(), validator::ValidationError> {
    if request.is_driver || request.is_passenger {
        Ok(())
    } else {
        Err(validator::ValidationError::new("no_capability"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    pub smoking_allowed: bool,
    pub animals_allowed: bool,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 50))]
    pub pseudo: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[cfg(test)]
pub(crate) fn sample_account(credits: i64) -> Account {
    Account {
        id: Uuid::new_v4(),
        email: "rider@example.com".to_string(),
        pseudo: "rider".to_string(),
        password_hash: String::new(),
        role: Role::User,
        credits,
        is_driver: true,
        is_passenger: true,
        rating: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_credits_checks_balance() {
        let mut account = sample_account(30);
        assert_eq!(account.remove_credits(20).unwrap(), 10);

        let err = account.remove_credits(11).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientFunds {
                required: 11,
                available: 10
            }
        );
        assert_eq!(account.credits(), 10);
    }

    #[test]
    fn test_credit_amounts_must_be_positive() {
        let mut account = sample_account(5);
        assert!(matches!(
            account.add_credits(0),
            Err(DomainError::Invalid(_))
        ));
        assert!(matches!(
            account.remove_credits(-3),
            Err(DomainError::Invalid(_))
        ));
        assert_eq!(account.credits(), 5);
    }

    #[test]
    fn test_balance_never_negative() {
        let mut account = sample_account(0);
        assert!(account.remove_credits(1).is_err());
        assert_eq!(account.add_credits(18).unwrap(), 18);
        assert_eq!(account.remove_credits(18).unwrap(), 0);
        assert!(account.credits() >= 0);
    }

    #[test]
    fn test_capability_profiles() {
        let mut account = sample_account(0);
        account.is_driver = false;
        assert!(account.passenger_profile().is_ok());
        assert!(matches!(
            account.driver_profile(),
            Err(DomainError::Forbidden(_))
        ));

        account.role = Role::Employee;
        account.is_driver = true;
        assert!(account.driver_profile().is_err());
        assert!(account.passenger_profile().is_err());
    }

    #[test]
    fn test_actor_role_gate() {
        let actor = Actor::new(Uuid::new_v4(), Role::Employee);
        assert!(actor.require_role(Role::Employee).is_ok());
        assert!(matches!(
            actor.require_role(Role::Admin),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_role_round_trip_names() {
        for role in [Role::User, Role::Employee, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("driver".parse::<Role>().is_err());
    }

    #[test]
    fn test_capabilities_request_needs_one_flag() {
        let request = UpdateCapabilitiesRequest {
            is_driver: false,
            is_passenger: false,
        };
        assert!(request.validate().is_err());

        let request = UpdateCapabilitiesRequest {
            is_driver: true,
            is_passenger: false,
        };
        assert!(request.validate().is_ok());
    }
}
