use axum::{
    extract::{Path, State},
    http::header,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    constants::LEADERBOARD_SIZE,
    error::{AppError, Result},
    kv::needs_profile_refresh,
    models::{tier_from_score, ApiResponse, GameEntry, LeaderboardRow, PlayerStats},
};

use super::{require_wallet, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub wallet: String,
    pub score: i64,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub survivors: Option<u32>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub miles: Option<u32>,
    #[serde(default)]
    pub survived: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardRow>,
}

#[derive(Debug, Serialize)]
pub struct StatsSummary {
    pub games_played: u32,
    pub best_score: i64,
    pub best_tier: String,
}

#[derive(Debug, Serialize)]
pub struct PlayerProfileResponse {
    pub stats: PlayerStats,
    pub games: Vec<GameEntry>,
    pub rank: Option<u32>,
}

type Cached<T> = ([(header::HeaderName, &'static str); 1], Json<T>);

// ==================== HANDLERS ====================

/// GET /api/leaderboard
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Cached<ApiResponse<LeaderboardResponse>>> {
    let leaderboard = state.store.leaderboard(LEADERBOARD_SIZE).await?;

    Ok((
        [(
            header::CACHE_CONTROL,
            "s-maxage=10, stale-while-revalidate=30",
        )],
        Json(ApiResponse::success(LeaderboardResponse { leaderboard })),
    ))
}

/// POST /api/leaderboard
pub async fn submit_score(
    State(state): State<AppState>,
    Json(req): Json<SubmitScoreRequest>,
) -> Result<Json<ApiResponse<StatsSummary>>> {
    let wallet = require_wallet(&req.wallet)?;
    if req.score < 0 {
        return Err(AppError::BadRequest("Invalid score".to_string()));
    }

    let survived = req.survived.unwrap_or(false);
    let game = GameEntry {
        score: req.score,
        tier: tier_from_score(req.score, survived).to_string(),
        survived,
        days: req.days.unwrap_or(0),
        miles: req.miles.unwrap_or(0),
        survivors: req.survivors.unwrap_or(0),
        class_id: req.class_id.unwrap_or_else(|| "dev".to_string()),
        timestamp: chrono::Utc::now().timestamp_millis(),
    };

    let stats = state.store.submit_game_result(&wallet, &game).await?;

    // Stale profiles refresh on the background resolver, never on this path.
    if needs_profile_refresh(Some(&stats)) {
        state.profiles.enqueue(&wallet);
    }

    Ok(Json(ApiResponse::success(StatsSummary {
        games_played: stats.games_played,
        best_score: stats.best_score,
        best_tier: stats.best_tier,
    })))
}

/// GET /api/leaderboard/:address
pub async fn get_player(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Cached<ApiResponse<PlayerProfileResponse>>> {
    let wallet = require_wallet(&address)?;

    let (mut stats, games, rank) = state
        .store
        .player_profile(&wallet)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

    // This endpoint is user-triggered, so a stale profile refreshes inline.
    if needs_profile_refresh(Some(&stats)) {
        let neynar = crate::integrations::neynar::NeynarClient::new(
            state.config.neynar_api_key.clone(),
        );
        match neynar.lookup_by_address(&wallet).await {
            Ok(Some(profile)) => {
                state
                    .store
                    .update_farcaster_profile(&wallet, &profile)
                    .await?;
                stats.fc_fid = Some(profile.fid);
                stats.fc_username = Some(profile.username);
                stats.fc_display_name = Some(profile.display_name);
                stats.fc_pfp = Some(profile.pfp);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("Inline profile refresh failed for {}: {}", wallet, err);
            }
        }
    }

    Ok((
        [(
            header::CACHE_CONTROL,
            "s-maxage=5, stale-while-revalidate=15",
        )],
        Json(ApiResponse::success(PlayerProfileResponse {
            stats,
            games,
            rank,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_defaults_optional_fields() {
        let req: SubmitScoreRequest =
            serde_json::from_str(r#"{"wallet":"0xabc","score":1200}"#).unwrap();
        assert_eq!(req.score, 1200);
        assert!(req.class_id.is_none());
        assert!(req.survived.is_none());
    }

    #[test]
    fn submit_request_reads_camel_case_class_id() {
        let req: SubmitScoreRequest = serde_json::from_str(
            r#"{"wallet":"0xabc","score":1200,"classId":"hodler","survived":true}"#,
        )
        .unwrap();
        assert_eq!(req.class_id.as_deref(), Some("hodler"));
        assert_eq!(req.survived, Some(true));
    }
}
