use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::ApiResponse,
};

use super::{require_wallet, AppState};

#[derive(Debug, Deserialize)]
pub struct FreePlayQuery {
    pub wallet: String,
}

#[derive(Debug, Deserialize)]
pub struct FreePlayRequest {
    pub action: String,
    pub wallet: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreePlayResponse {
    pub wallet: String,
    pub free_plays: i64,
}

/// GET /api/free-play
pub async fn get_free_plays(
    State(state): State<AppState>,
    Query(query): Query<FreePlayQuery>,
) -> Result<Json<ApiResponse<FreePlayResponse>>> {
    let wallet = require_wallet(&query.wallet)?;
    let free_plays = state.store.free_plays(&wallet).await?;

    Ok(Json(ApiResponse::success(FreePlayResponse {
        wallet,
        free_plays,
    })))
}

/// POST /api/free-play
/// Grant (admin-only) or consume a free play
pub async fn free_play_action(
    State(state): State<AppState>,
    Json(req): Json<FreePlayRequest>,
) -> Result<Json<ApiResponse<FreePlayResponse>>> {
    let wallet = require_wallet(&req.wallet)?;

    match req.action.as_str() {
        "grant" => {
            let admin_secret = state
                .config
                .admin_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or(AppError::Unauthorized)?;
            if req.secret.as_deref() != Some(admin_secret) {
                return Err(AppError::Unauthorized);
            }

            let reason = req
                .reason
                .as_deref()
                .unwrap_or("Admin override — failed transaction");
            let free_plays = state
                .store
                .grant_free_play(&wallet, reason, "admin")
                .await?;

            tracing::info!("Granted free play to {} ({})", wallet, reason);
            Ok(Json(ApiResponse::success(FreePlayResponse {
                wallet,
                free_plays,
            })))
        }
        "consume" => {
            let consumed = state.store.consume_free_play(&wallet).await?;
            if !consumed {
                return Err(AppError::NotFound("No free plays available".to_string()));
            }

            let free_plays = state.store.free_plays(&wallet).await?;
            Ok(Json(ApiResponse::success(FreePlayResponse {
                wallet,
                free_plays,
            })))
        }
        _ => Err(AppError::BadRequest("Invalid action".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case_free_plays() {
        let response = FreePlayResponse {
            wallet: "0xabc".to_string(),
            free_plays: 2,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json.get("freePlays").and_then(|v| v.as_i64()), Some(2));
    }

    #[test]
    fn request_tolerates_missing_optionals() {
        let req: FreePlayRequest =
            serde_json::from_str(r#"{"action":"consume","wallet":"0xabc"}"#).unwrap();
        assert!(req.reason.is_none());
        assert!(req.secret.is_none());
    }
}
