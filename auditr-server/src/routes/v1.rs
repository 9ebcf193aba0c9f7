use auditr_model::routes::v1;
use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{audits, health, projects},
};

/// All v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(v1::HEALTH, get(health::health_handler))
        .merge(create_project_routes())
        .merge(create_audit_routes())
}

fn create_project_routes() -> Router<AppState> {
    Router::new()
        .route(
            v1::projects::COLLECTION,
            get(projects::list_projects_handler).post(projects::create_project_handler),
        )
        .route(
            v1::projects::ITEM,
            get(projects::get_project_handler)
                .put(projects::update_project_handler)
                .delete(projects::delete_project_handler),
        )
        .route(
            v1::projects::AUDITS,
            get(audits::list_audits_handler).post(audits::start_audit_handler),
        )
}

fn create_audit_routes() -> Router<AppState> {
    Router::new()
        .route(
            v1::audits::ITEM,
            get(audits::get_audit_handler).delete(audits::delete_audit_handler),
        )
        .route(v1::audits::STATUS, get(audits::audit_status_handler))
        .route(v1::audits::CONFIRM_AUTH, post(audits::confirm_auth_handler))
}
