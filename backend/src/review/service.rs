use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::account::{Actor, Role};
use crate::error::{ApiError, ApiResult};
use crate::review::model::{CreateReviewRequest, Review, ReviewStatus};

/// Recompute an account's rating from its approved reviews
async fn refresh_average_rating(conn: &mut PgConnection, account_id: Uuid) -> ApiResult<Option<f64>> {
    let rating: Option<f64> = sqlx::query_scalar(
        r#"
        UPDATE accounts
        SET rating = (
            SELECT AVG(rating)::float8 FROM reviews
            WHERE target_id = $1 AND status = 'approved'
        ),
        updated_at = $2
        WHERE id = $1
        RETURNING rating
        "#,
    )
    .bind(account_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(rating)
}

#[derive(Clone)]
pub struct ReviewService {
    db_pool: PgPool,
}

impl ReviewService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Review the driver of a ride the author travelled on
    pub async fn create_review(&self, actor: Actor, request: CreateReviewRequest) -> ApiResult<Review> {
        let mut tx = self.db_pool.begin().await?;

        let driver_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT r.driver_id FROM rides r
            JOIN bookings b ON b.ride_id = r.id
            WHERE r.id = $1 AND b.passenger_id = $2 AND b.status = 'completed'
            LIMIT 1
            "#,
        )
        .bind(request.ride_id)
        .bind(actor.account_id)
        .fetch_optional(&mut *tx)
        .await?;
        let target_id = driver_id.ok_or_else(|| {
            ApiError::Forbidden("Only passengers of a completed booking can review".to_string())
        })?;

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reviews WHERE ride_id = $1 AND author_id = $2 AND target_id = $3
            )
            "#,
        )
        .bind(request.ride_id)
        .bind(actor.account_id)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(ApiError::Conflict(
                "This ride has already been reviewed".to_string(),
            ));
        }

        let now = Utc::now();
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, ride_id, author_id, target_id, rating, comment, status,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.ride_id)
        .bind(actor.account_id)
        .bind(target_id)
        .bind(request.rating)
        .bind(&request.comment)
        .bind(ReviewStatus::Pending)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(review_id = %review.id, ride_id = %review.ride_id, "Review submitted");

        Ok(review)
    }

    pub async fn moderate_review(
        &self,
        actor: Actor,
        review_id: Uuid,
        approve: bool,
    ) -> ApiResult<Review> {
        actor.require_role(Role::Employee)?;

        let mut tx = self.db_pool.begin().await?;

        let mut review =
            sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
                .bind(review_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Review {} not found", review_id)))?;

        review.moderate(actor.account_id, approve)?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews SET status = $1, moderator_id = $2, updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(review.status)
        .bind(review.moderator_id)
        .bind(Utc::now())
        .bind(review.id)
        .fetch_one(&mut *tx)
        .await?;

        let rating = if approve {
            refresh_average_rating(&mut *tx, review.target_id).await?
        } else {
            None
        };

        tx.commit().await?;

        tracing::info!(
            review_id = %review.id,
            moderator_id = %actor.account_id,
            approved = approve,
            target_rating = ?rating,
            "Review moderated"
        );

        Ok(review)
    }

    pub async fn list_pending_reviews(&self, actor: Actor) -> ApiResult<Vec<Review>> {
        actor.require_role(Role::Employee)?;

        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE status = 'pending' ORDER BY created_at",
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(reviews)
    }

    /// Approved reviews about a driver
    pub async fn list_driver_reviews(&self, driver_id: Uuid) -> ApiResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE target_id = $1 AND status = 'approved'
            ORDER BY created_at DESC
            "#,
        )
        .bind(driver_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(reviews)
    }
}
