use auditr_model::{
    Audit, AuditListItem, AuditStatus, AuditStatusView, MessageResponse,
    StartAuditResponse,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{parse_audit_id, parse_project_id};
use crate::infra::{app_state::AppState, errors::AppResult};

/// Accept an audit and return immediately; the run continues in the
/// background.
pub async fn start_audit_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<(StatusCode, Json<StartAuditResponse>)> {
    let project_id = parse_project_id(&project_id)?;
    let ticket = state.orchestrator.start_audit(project_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartAuditResponse {
            audit_id: ticket.audit_id,
            status: AuditStatus::Pending,
        }),
    ))
}

pub async fn list_audits_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<Vec<AuditListItem>>> {
    let project_id = parse_project_id(&project_id)?;
    Ok(Json(state.orchestrator.list_audits(project_id).await?))
}

pub async fn get_audit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Audit>> {
    let id = parse_audit_id(&id)?;
    Ok(Json(state.orchestrator.get_audit(id).await?))
}

pub async fn audit_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<AuditStatusView>> {
    let id = parse_audit_id(&id)?;
    Ok(Json(state.orchestrator.audit_status(id).await?))
}

pub async fn confirm_auth_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_audit_id(&id)?;
    state.orchestrator.confirm_auth(id).await?;
    Ok(Json(MessageResponse::new("Authentication confirmed, audit resuming")))
}

pub async fn delete_audit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_audit_id(&id)?;
    state.orchestrator.delete_audit(id).await?;
    Ok(Json(MessageResponse::new("Audit deleted")))
}
