// src/api/mod.rs

pub mod free_play;
pub mod health;
pub mod leaderboard;
pub mod rewards;

use std::sync::Arc;

use crate::config::Config;
use crate::crypto::signer::RewardSigner;
use crate::error::Result;
use crate::kv::Store;
use crate::services::ProfileResolver;
use crate::utils::normalize_wallet;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub signer: Option<Arc<RewardSigner>>,
    pub profiles: ProfileResolver,
}

/// All wallet-keyed routes go through this guard.
pub fn require_wallet(raw: &str) -> Result<String> {
    normalize_wallet(raw)
}
