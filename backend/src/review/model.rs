//! Driver reviews and their moderation

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "review_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub author_id: Uuid,
    pub target_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub status: ReviewStatus,
    pub moderator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Approve or reject a pending review
    pub fn moderate(&mut self, moderator_id: Uuid, approve: bool) -> Result<(), DomainError> {
        if self.status != ReviewStatus::Pending {
            return Err(DomainError::InvalidState(format!(
                "review {} has already been moderated",
                self.id
            )));
        }
        self.status = if approve {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Rejected
        };
        self.moderator_id = Some(moderator_id);
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub ride_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerateReviewRequest {
    pub approve: bool,
}
