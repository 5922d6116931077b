use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{AuthenticatedUser, EmployeeUser};
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::review::{CreateReviewRequest, ModerateReviewRequest, Review, ReviewService};

pub async fn create_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    request.validate()?;
    let review = service.create_review(user.actor(), request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(review))))
}

pub async fn list_pending_reviews(
    State(service): State<Arc<ReviewService>>,
    EmployeeUser(employee): EmployeeUser,
) -> Result<Json<ApiResponse<Vec<Review>>>, ApiError> {
    let reviews = service.list_pending_reviews(employee.actor()).await?;

    Ok(Json(ApiResponse::success(reviews)))
}

pub async fn moderate_review(
    State(service): State<Arc<ReviewService>>,
    EmployeeUser(employee): EmployeeUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerateReviewRequest>,
) -> Result<Json<ApiResponse<Review>>, ApiError> {
    let review = service
        .moderate_review(employee.actor(), id, request.approve)
        .await?;

    Ok(Json(ApiResponse::success(review)))
}

/// GET /api/v1/drivers/:id/reviews
pub async fn list_driver_reviews(
    State(service): State<Arc<ReviewService>>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Review>>>, ApiError> {
    let reviews = service.list_driver_reviews(driver_id).await?;

    Ok(Json(ApiResponse::success(reviews)))
}
