//! Vehicle models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Vehicle energy source
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "energy_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnergyType {
    Electric,
    Hybrid,
    Gasoline,
    Diesel,
}

/// Vehicle model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub plate_number: String,
    pub first_registration: Option<NaiveDate>,
    pub energy: EnergyType,
    pub seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Rides published with an electric vehicle are labelled eco-friendly
    pub fn is_eco_vehicle(&self) -> bool {
        self.energy == EnergyType::Electric
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 50))]
    pub brand: String,
    #[validate(length(min = 1, max = 50))]
    pub model: String,
    #[validate(length(min = 1, max = 30))]
    pub color: String,
    #[validate(length(min = 2, max = 20))]
    pub plate_number: String,
    pub first_registration: Option<NaiveDate>,
    pub energy: EnergyType,
    #[validate(range(min = 1, max = 8))]
    pub seats: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 30))]
    pub color: Option<String>,
    pub energy: Option<EnergyType>,
    #[validate(range(min = 1, max = 8))]
    pub seats: Option<i32>,
}

/// Plates are compared case-insensitively and without separators
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_vehicle(owner_id: Uuid, energy: EnergyType) -> Vehicle {
    Vehicle {
        id: Uuid::new_v4(),
        owner_id,
        brand: "Renault".to_string(),
        model: "Zoe".to_string(),
        color: "blue".to_string(),
        plate_number: "AB123CD".to_string(),
        first_registration: None,
        energy,
        seats: 4,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
