use serde::{Deserialize, Serialize};

use crate::constants::{TIER_EPIC_SCORE, TIER_LEGENDARY_SCORE, TIER_RARE_SCORE};

// ==================== SIGNED REWARD ====================

/// Off-chain-issued, time-limited, single-use claim authorization.
/// Wire format matches the game client (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedReward {
    pub nonce: String,
    pub token: String,
    pub amount: String,
    pub signature: String,
    pub event_title: String,
    pub display_amount: String,
    pub symbol: String,
    pub signed_at: i64, // unix ms
    pub expiry: u64,    // unix seconds
}

// ==================== PLAYER ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wallet: String,
    pub games_played: u32,
    pub best_score: i64,
    pub best_tier: String,
    pub best_survived: bool,
    pub last_played: i64, // unix ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_fid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_pfp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_resolved_at: Option<i64>, // unix ms
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEntry {
    pub score: i64,
    pub tier: String,
    pub survived: bool,
    pub days: u32,
    pub miles: u32,
    pub survivors: u32,
    #[serde(rename = "class")]
    pub class_id: String,
    pub timestamp: i64, // unix ms
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub wallet: String,
    pub best_score: i64,
    pub best_tier: String,
    pub games_played: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_fid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_pfp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarcasterProfile {
    pub fid: String,
    pub username: String,
    pub display_name: String,
    pub pfp: String,
}

// ==================== TIERS ====================

/// Ranking order for best-tier comparisons; unknown tiers rank lowest.
pub fn tier_rank(tier: &str) -> u8 {
    match tier {
        "dead" => 0,
        "common" => 1,
        "rare" => 2,
        "epic" => 3,
        "legendary" => 4,
        _ => 0,
    }
}

pub fn tier_from_score(score: i64, survived: bool) -> &'static str {
    if !survived {
        return "dead";
    }
    if score >= TIER_LEGENDARY_SCORE {
        "legendary"
    } else if score >= TIER_EPIC_SCORE {
        "epic"
    } else if score >= TIER_RARE_SCORE {
        "rare"
    } else {
        "common"
    }
}

// ==================== API RESPONSE ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
