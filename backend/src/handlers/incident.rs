//! Employee incident handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::EmployeeUser;
use crate::error::ApiError;
use crate::incident::{Incident, IncidentFilter, IncidentService, ResolveIncidentRequest};
use crate::models::ApiResponse;

pub async fn list_incidents(
    State(service): State<Arc<IncidentService>>,
    EmployeeUser(employee): EmployeeUser,
    Query(filter): Query<IncidentFilter>,
) -> Result<Json<ApiResponse<Vec<Incident>>>, ApiError> {
    let incidents = service.list_incidents(employee.actor(), filter).await?;

    Ok(Json(ApiResponse::success(incidents)))
}

pub async fn get_incident(
    State(service): State<Arc<IncidentService>>,
    EmployeeUser(employee): EmployeeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Incident>>, ApiError> {
    let incident = service.get_incident(employee.actor(), id).await?;

    Ok(Json(ApiResponse::success(incident)))
}

/// POST /api/v1/incidents/:id/assign - take the incident
pub async fn assign_incident(
    State(service): State<Arc<IncidentService>>,
    EmployeeUser(employee): EmployeeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Incident>>, ApiError> {
    let incident = service.assign_incident(employee.actor(), id).await?;

    Ok(Json(ApiResponse::success(incident)))
}

pub async fn resolve_incident(
    State(service): State<Arc<IncidentService>>,
    EmployeeUser(employee): EmployeeUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveIncidentRequest>,
) -> Result<Json<ApiResponse<Incident>>, ApiError> {
    request.validate()?;
    let incident = service
        .resolve_incident(employee.actor(), id, &request.note)
        .await?;

    Ok(Json(ApiResponse::success(incident)))
}
