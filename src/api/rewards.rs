use axum::{
    extract::{Query, State},
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{RANDOM_MULTIPLIER_MAX, SIGNATURE_TTL_SECONDS},
    error::{AppError, Result},
    models::{ApiResponse, SignedReward},
    tokens::{is_sponsored_event, sponsored_token, SponsoredToken},
};

use super::{require_wallet, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub action: String,
    pub wallet: String,
    pub session_id: String,
    #[serde(default)]
    pub event_title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    pub wallet: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub rewards: Vec<SignedReward>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub wallet: String,
    pub event_title: String,
    pub game_session_id: String,
}

// ==================== HELPERS ====================

// Final amount and display for a signing, with the 1x-5x multiplier applied
// to randomized tokens only.
fn reward_terms(token: &SponsoredToken, multiplier: u32) -> (u128, String) {
    if token.random_reward {
        (
            token.reward_amount * multiplier as u128,
            format!("$0.0{} {}", multiplier, token.symbol),
        )
    } else {
        (token.reward_amount, token.display_amount.to_string())
    }
}

// ==================== HANDLERS ====================

/// POST /api/rewards/session
/// Create a game session or record a sponsored event
pub async fn session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>> {
    let wallet = require_wallet(&req.wallet)?;
    if req.session_id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing sessionId".to_string()));
    }

    match req.action.as_str() {
        "create" => {
            state.store.create_session(&wallet, &req.session_id).await?;
        }
        "event" => {
            let event_title = req
                .event_title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| AppError::BadRequest("Missing eventTitle".to_string()))?;
            // Recorded either way; only sponsored titles ever reach signing.
            if !is_sponsored_event(event_title) {
                tracing::debug!("Recording non-sponsored event title: {}", event_title);
            }
            state
                .store
                .record_event(&wallet, &req.session_id, event_title)
                .await?;
        }
        _ => return Err(AppError::BadRequest("Invalid action".to_string())),
    }

    Ok(Json(ApiResponse::success(SessionResponse {
        session_id: req.session_id,
    })))
}

/// GET /api/rewards/pending
/// Signed but unclaimed rewards for a session
pub async fn pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<ApiResponse<PendingResponse>>> {
    let wallet = require_wallet(&query.wallet)?;
    if query.session_id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing sessionId".to_string()));
    }

    let rewards = state
        .store
        .pending_rewards(&wallet, &query.session_id)
        .await?;
    Ok(Json(ApiResponse::success(PendingResponse { rewards })))
}

/// POST /api/rewards/sign
/// Validate the session and issue a claim voucher
pub async fn sign(
    State(state): State<AppState>,
    Json(req): Json<SignRequest>,
) -> Result<Json<ApiResponse<SignedReward>>> {
    let signer = state
        .signer
        .as_ref()
        .ok_or(AppError::NotConfigured("rewards signer"))?;

    let wallet = require_wallet(&req.wallet)?;
    if req.event_title.trim().is_empty() || req.game_session_id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing fields".to_string()));
    }

    let token = sponsored_token(&req.event_title)
        .ok_or_else(|| AppError::BadRequest("Not a sponsored event".to_string()))?;
    if token.reward_amount == 0 {
        return Err(AppError::NotConfigured("reward amount"));
    }

    // The event must actually have occurred in a live session.
    let session_valid = state
        .store
        .validate_session(&wallet, &req.game_session_id, &req.event_title)
        .await?;
    if !session_valid {
        return Err(AppError::SessionInvalid);
    }

    // One voucher per (wallet, session, event). The check and the write below
    // are separate round trips; the contract's nonce uniqueness backstops the
    // remaining race window.
    let already_signed = state
        .store
        .has_reward_signed(&wallet, &req.game_session_id, &req.event_title)
        .await?;
    if already_signed {
        return Err(AppError::AlreadySigned);
    }

    let multiplier = rand::rng().random_range(1..=RANDOM_MULTIPLIER_MAX);
    let (amount, display_amount) = reward_terms(token, multiplier);

    let nonce: [u8; 32] = rand::random();
    let signed_at = chrono::Utc::now();
    let expiry = signed_at.timestamp() as u64 + SIGNATURE_TTL_SECONDS;

    let signature = signer
        .sign_claim(&wallet, token.address, amount, &nonce, expiry)
        .await?;

    let reward = SignedReward {
        nonce: format!("0x{}", hex::encode(nonce)),
        token: token.address.to_string(),
        amount: amount.to_string(),
        signature,
        event_title: req.event_title.clone(),
        display_amount,
        symbol: token.symbol.to_string(),
        signed_at: signed_at.timestamp_millis(),
        expiry,
    };

    // Persist before answering so a crash cannot hand out an untracked voucher.
    state
        .store
        .mark_reward_signed(&wallet, &req.game_session_id, &reward)
        .await?;

    tracing::info!(
        "Signed {} reward for {} (session {}, event {})",
        reward.symbol,
        wallet,
        req.game_session_id,
        reward.event_title
    );

    Ok(Json(ApiResponse::success(reward)))
}
