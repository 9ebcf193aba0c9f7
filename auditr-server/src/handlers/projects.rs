use auditr_model::{
    CreateProjectRequest, MessageResponse, Project, UpdateProjectRequest,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use super::parse_project_id;
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

pub async fn list_projects_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list().await?))
}

pub async fn create_project_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = request.into_project()?;
    state.projects.create(&project).await?;
    info!(project_id = %project.id, url = %project.url, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Project>> {
    let id = parse_project_id(&id)?;
    state
        .projects
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}

pub async fn update_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> AppResult<Json<Project>> {
    let id = parse_project_id(&id)?;
    let mut project = state
        .projects
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))?;

    request.apply(&mut project)?;
    state.projects.update(&project).await?;
    Ok(Json(project))
}

pub async fn delete_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_project_id(&id)?;
    if !state.projects.delete(id).await? {
        return Err(AppError::not_found("Project not found"));
    }
    info!(project_id = %id, "project deleted");
    Ok(Json(MessageResponse::new("Project deleted")))
}
