use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub redis: String,
    pub signing: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis_status = if state.store.ping().await {
        "connected".to_string()
    } else {
        "disconnected".to_string()
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        redis: redis_status,
        signing: state.signer.is_some(),
    })
}
