use auditr_model::HealthResponse;
use axum::Json;
use chrono::Utc;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}
