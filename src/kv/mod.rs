use std::collections::HashMap;

use redis::{aio::ConnectionManager, AsyncCommands};

use crate::constants::{MAX_GAME_HISTORY, NEYNAR_CACHE_TTL_MS, SESSION_TTL_SECONDS};
use crate::error::{AppError, Result};
use crate::models::{
    tier_rank, FarcasterProfile, GameEntry, LeaderboardRow, PlayerStats, SignedReward,
};

const SESSION_PREFIX: &str = "rewards:session:";
const EVENTS_SUFFIX: &str = ":events";
const SIGNED_PREFIX: &str = "rewards:signed:";
const PENDING_PREFIX: &str = "rewards:pending:";
const PLAYER_PREFIX: &str = "player:";
const GAMES_SUFFIX: &str = ":games";
const LEADERBOARD_KEY: &str = "leaderboard:top";
const FREE_PLAY_PREFIX: &str = "freeplay:";

#[derive(Clone)]
pub struct Store {
    conn: ConnectionManager,
}

// ==================== KEY HELPERS ====================

fn session_key(wallet: &str, session_id: &str) -> String {
    format!("{SESSION_PREFIX}{}:{session_id}", wallet.to_lowercase())
}

fn events_key(wallet: &str, session_id: &str) -> String {
    format!(
        "{SESSION_PREFIX}{}:{session_id}{EVENTS_SUFFIX}",
        wallet.to_lowercase()
    )
}

fn signed_key(wallet: &str, session_id: &str, event_title: &str) -> String {
    format!(
        "{SIGNED_PREFIX}{}:{session_id}:{event_title}",
        wallet.to_lowercase()
    )
}

fn pending_key(wallet: &str, session_id: &str) -> String {
    format!("{PENDING_PREFIX}{}:{session_id}", wallet.to_lowercase())
}

fn player_key(wallet: &str) -> String {
    format!("{PLAYER_PREFIX}{}", wallet.to_lowercase())
}

fn games_key(wallet: &str) -> String {
    format!("{PLAYER_PREFIX}{}{GAMES_SUFFIX}", wallet.to_lowercase())
}

fn free_play_key(wallet: &str) -> String {
    format!("{FREE_PLAY_PREFIX}{}", wallet.to_lowercase())
}

impl Store {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    // ConnectionManager multiplexes internally; a clone per call is the cheap idiom.
    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    pub async fn ping(&self) -> bool {
        let mut conn = self.conn();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

// ==================== GAME SESSIONS ====================

impl Store {
    /// Idempotent per sessionId; re-creating overwrites startedAt.
    pub async fn create_session(&self, wallet: &str, session_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let key = session_key(wallet, session_id);
        let started_at = chrono::Utc::now().timestamp_millis();

        // pipeline agar TTL ikut ter-set bersama hash-nya
        let _: () = redis::pipe()
            .hset_multiple(
                &key,
                &[
                    ("wallet", wallet.to_lowercase()),
                    ("sessionId", session_id.to_string()),
                    ("startedAt", started_at.to_string()),
                ],
            )
            .ignore()
            .expire(&key, SESSION_TTL_SECONDS)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Appends to the session's event list. No deduplication: the same
    /// sponsored event may fire more than once per run.
    pub async fn record_event(
        &self,
        wallet: &str,
        session_id: &str,
        event_title: &str,
    ) -> Result<()> {
        let mut conn = self.conn();
        let key = events_key(wallet, session_id);

        let _: () = redis::pipe()
            .lpush(&key, event_title)
            .ignore()
            .expire(&key, SESSION_TTL_SECONDS)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// True only when the session still exists (TTL not elapsed) and the
    /// event title was recorded during it.
    pub async fn validate_session(
        &self,
        wallet: &str,
        session_id: &str,
        event_title: &str,
    ) -> Result<bool> {
        let mut conn = self.conn();

        let session: HashMap<String, String> =
            conn.hgetall(session_key(wallet, session_id)).await?;
        if !session.contains_key("wallet") {
            return Ok(false);
        }

        let events: Vec<String> = conn.lrange(events_key(wallet, session_id), 0, -1).await?;
        Ok(events.iter().any(|e| e == event_title))
    }
}

// ==================== SIGNED REWARDS ====================

impl Store {
    pub async fn has_reward_signed(
        &self,
        wallet: &str,
        session_id: &str,
        event_title: &str,
    ) -> Result<bool> {
        let mut conn = self.conn();
        let exists: bool = conn
            .exists(signed_key(wallet, session_id, event_title))
            .await?;
        Ok(exists)
    }

    /// Persists the signed marker and queues the voucher for batch claim.
    /// The preceding has_reward_signed check is a separate round trip; the
    /// contract's nonce uniqueness is the real double-spend guard.
    pub async fn mark_reward_signed(
        &self,
        wallet: &str,
        session_id: &str,
        reward: &SignedReward,
    ) -> Result<()> {
        let mut conn = self.conn();
        let skey = signed_key(wallet, session_id, &reward.event_title);
        let pkey = pending_key(wallet, session_id);
        let payload =
            serde_json::to_string(reward).map_err(|e| AppError::Internal(e.to_string()))?;

        let _: () = redis::pipe()
            .set(&skey, &payload)
            .ignore()
            .expire(&skey, SESSION_TTL_SECONDS)
            .ignore()
            .lpush(&pkey, &payload)
            .ignore()
            .expire(&pkey, SESSION_TTL_SECONDS)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn pending_rewards(
        &self,
        wallet: &str,
        session_id: &str,
    ) -> Result<Vec<SignedReward>> {
        let mut conn = self.conn();
        let raw: Vec<String> = conn.lrange(pending_key(wallet, session_id), 0, -1).await?;

        let rewards = raw
            .iter()
            .filter_map(|entry| match serde_json::from_str(entry) {
                Ok(reward) => Some(reward),
                Err(err) => {
                    tracing::warn!("Skipping unparseable pending reward: {}", err);
                    None
                }
            })
            .collect();
        Ok(rewards)
    }
}

// ==================== PLAYER STATS & LEADERBOARD ====================

/// Fold a finished game into the player's aggregate stats.
fn merge_stats(existing: Option<&PlayerStats>, wallet: &str, game: &GameEntry) -> PlayerStats {
    let games_played = existing.map(|s| s.games_played).unwrap_or(0) + 1;
    let existing_best_score = existing.map(|s| s.best_score).unwrap_or(0);
    let existing_best_tier = existing
        .map(|s| s.best_tier.clone())
        .unwrap_or_else(|| "dead".to_string());

    let new_rank = tier_rank(&game.tier);
    let existing_rank = tier_rank(&existing_best_tier);
    let best_tier = if new_rank > existing_rank
        || (new_rank == existing_rank && game.score > existing_best_score)
    {
        game.tier.clone()
    } else {
        existing_best_tier
    };

    let best_score = existing_best_score.max(game.score);
    let best_survived = if best_score == game.score {
        game.survived
    } else {
        existing.map(|s| s.best_survived).unwrap_or(game.survived)
    };

    PlayerStats {
        wallet: wallet.to_string(),
        games_played,
        best_score,
        best_tier,
        best_survived,
        last_played: game.timestamp,
        fc_fid: existing.and_then(|s| s.fc_fid.clone()),
        fc_username: existing.and_then(|s| s.fc_username.clone()),
        fc_display_name: existing.and_then(|s| s.fc_display_name.clone()),
        fc_pfp: existing.and_then(|s| s.fc_pfp.clone()),
        fc_resolved_at: existing.and_then(|s| s.fc_resolved_at),
    }
}

fn hash_field<T: std::str::FromStr + Default>(map: &HashMap<String, String>, field: &str) -> T {
    map.get(field)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn stats_from_hash(map: &HashMap<String, String>) -> Option<PlayerStats> {
    let wallet = map.get("wallet")?.clone();
    Some(PlayerStats {
        wallet,
        games_played: hash_field(map, "games_played"),
        best_score: hash_field(map, "best_score"),
        best_tier: map
            .get("best_tier")
            .cloned()
            .unwrap_or_else(|| "dead".to_string()),
        best_survived: map
            .get("best_survived")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false),
        last_played: hash_field(map, "last_played"),
        fc_fid: map.get("fc_fid").cloned(),
        fc_username: map.get("fc_username").cloned(),
        fc_display_name: map.get("fc_display_name").cloned(),
        fc_pfp: map.get("fc_pfp").cloned(),
        fc_resolved_at: map.get("fc_resolved_at").and_then(|v| v.parse().ok()),
    })
}

/// Stale or absent Farcaster data should be re-resolved.
pub fn needs_profile_refresh(stats: Option<&PlayerStats>) -> bool {
    match stats.and_then(|s| s.fc_resolved_at) {
        None => true,
        Some(resolved_at) => {
            chrono::Utc::now().timestamp_millis() - resolved_at > NEYNAR_CACHE_TTL_MS
        }
    }
}

impl Store {
    pub async fn player_stats(&self, wallet: &str) -> Result<Option<PlayerStats>> {
        let mut conn = self.conn();
        let map: HashMap<String, String> = conn.hgetall(player_key(wallet)).await?;
        Ok(stats_from_hash(&map))
    }

    pub async fn submit_game_result(
        &self,
        wallet: &str,
        game: &GameEntry,
    ) -> Result<PlayerStats> {
        let mut conn = self.conn();
        let addr = wallet.to_lowercase();
        let pk = player_key(&addr);
        let gk = games_key(&addr);

        let existing_map: HashMap<String, String> = conn.hgetall(&pk).await?;
        let existing = stats_from_hash(&existing_map);
        let stats = merge_stats(existing.as_ref(), wallet, game);

        let updates = [
            ("games_played", stats.games_played.to_string()),
            ("best_score", stats.best_score.to_string()),
            ("best_tier", stats.best_tier.clone()),
            ("best_survived", stats.best_survived.to_string()),
            ("last_played", stats.last_played.to_string()),
            ("wallet", stats.wallet.clone()),
        ];
        let entry = serde_json::to_string(game).map_err(|e| AppError::Internal(e.to_string()))?;

        let _: () = redis::pipe()
            .hset_multiple(&pk, &updates)
            .ignore()
            .zadd(LEADERBOARD_KEY, &addr, stats.best_score)
            .ignore()
            .lpush(&gk, entry)
            .ignore()
            .ltrim(&gk, 0, MAX_GAME_HISTORY - 1)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(stats)
    }

    pub async fn leaderboard(&self, limit: isize) -> Result<Vec<LeaderboardRow>> {
        let mut conn = self.conn();
        let entries: Vec<(String, f64)> = conn
            .zrevrange_withscores(LEADERBOARD_KEY, 0, limit - 1)
            .await?;

        let mut rows = Vec::with_capacity(entries.len());
        for (i, (wallet, score)) in entries.iter().enumerate() {
            let map: HashMap<String, String> = conn.hgetall(player_key(wallet)).await?;
            let stats = stats_from_hash(&map);
            rows.push(LeaderboardRow {
                rank: i as u32 + 1,
                wallet: wallet.clone(),
                best_score: *score as i64,
                best_tier: stats
                    .as_ref()
                    .map(|s| s.best_tier.clone())
                    .unwrap_or_else(|| "common".to_string()),
                games_played: stats.as_ref().map(|s| s.games_played).unwrap_or(0),
                fc_fid: stats.as_ref().and_then(|s| s.fc_fid.clone()),
                fc_username: stats.as_ref().and_then(|s| s.fc_username.clone()),
                fc_display_name: stats.as_ref().and_then(|s| s.fc_display_name.clone()),
                fc_pfp: stats.as_ref().and_then(|s| s.fc_pfp.clone()),
            });
        }
        Ok(rows)
    }

    pub async fn player_profile(
        &self,
        wallet: &str,
    ) -> Result<Option<(PlayerStats, Vec<GameEntry>, Option<u32>)>> {
        let mut conn = self.conn();
        let addr = wallet.to_lowercase();

        let stats = match self.player_stats(&addr).await? {
            Some(stats) => stats,
            None => return Ok(None),
        };

        let games_raw: Vec<String> = conn
            .lrange(games_key(&addr), 0, MAX_GAME_HISTORY - 1)
            .await?;
        let games = games_raw
            .iter()
            .filter_map(|entry| match serde_json::from_str(entry) {
                Ok(game) => Some(game),
                Err(err) => {
                    tracing::warn!("Skipping unparseable game entry: {}", err);
                    None
                }
            })
            .collect();

        let rank: Option<i64> = conn.zrevrank(LEADERBOARD_KEY, &addr).await?;
        Ok(Some((stats, games, rank.map(|r| r as u32 + 1))))
    }

    pub async fn update_farcaster_profile(
        &self,
        wallet: &str,
        profile: &FarcasterProfile,
    ) -> Result<()> {
        let mut conn = self.conn();
        let resolved_at = chrono::Utc::now().timestamp_millis();
        let _: () = conn
            .hset_multiple(
                player_key(wallet),
                &[
                    ("fc_fid", profile.fid.clone()),
                    ("fc_username", profile.username.clone()),
                    ("fc_display_name", profile.display_name.clone()),
                    ("fc_pfp", profile.pfp.clone()),
                    ("fc_resolved_at", resolved_at.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}

// ==================== FREE PLAY ====================

impl Store {
    pub async fn free_plays(&self, wallet: &str) -> Result<i64> {
        let mut conn = self.conn();
        let count: Option<i64> = conn.get(free_play_key(wallet)).await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn grant_free_play(
        &self,
        wallet: &str,
        reason: &str,
        granted_by: &str,
    ) -> Result<i64> {
        let mut conn = self.conn();
        let count = self.free_plays(wallet).await? + 1;
        let _: () = conn.set(free_play_key(wallet), count).await?;

        self.log_free_play(
            wallet,
            serde_json::json!({
                "action": "grant",
                "reason": reason,
                "grantedBy": granted_by,
                "timestamp": chrono::Utc::now().timestamp_millis(),
            }),
        )
        .await;
        Ok(count)
    }

    pub async fn consume_free_play(&self, wallet: &str) -> Result<bool> {
        let mut conn = self.conn();
        let count = self.free_plays(wallet).await?;
        if count <= 0 {
            return Ok(false);
        }

        let next = count - 1;
        if next <= 0 {
            let _: () = conn.del(free_play_key(wallet)).await?;
        } else {
            let _: () = conn.set(free_play_key(wallet), next).await?;
        }

        self.log_free_play(
            wallet,
            serde_json::json!({
                "action": "consume",
                "timestamp": chrono::Utc::now().timestamp_millis(),
            }),
        )
        .await;
        Ok(true)
    }

    // Audit trail only; a failed write never blocks the grant/consume itself.
    async fn log_free_play(&self, wallet: &str, entry: serde_json::Value) {
        let mut conn = self.conn();
        let key = format!("{FREE_PLAY_PREFIX}log:{}", wallet.to_lowercase());
        if let Err(err) = conn.lpush::<_, _, ()>(&key, entry.to_string()).await {
            tracing::warn!("Free play audit log write failed for {}: {}", wallet, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(score: i64, tier: &str, survived: bool) -> GameEntry {
        GameEntry {
            score,
            tier: tier.to_string(),
            survived,
            days: 10,
            miles: 800,
            survivors: 3,
            class_id: "dev".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn keys_lowercase_the_wallet() {
        assert_eq!(
            session_key("0xABC", "s1"),
            "rewards:session:0xabc:s1"
        );
        assert_eq!(
            events_key("0xABC", "s1"),
            "rewards:session:0xabc:s1:events"
        );
        assert_eq!(
            signed_key("0xABC", "s1", "PIZZA PARTY FOR VETS"),
            "rewards:signed:0xabc:s1:PIZZA PARTY FOR VETS"
        );
        assert_eq!(pending_key("0xABC", "s1"), "rewards:pending:0xabc:s1");
    }

    #[test]
    fn merge_stats_first_game() {
        let stats = merge_stats(None, "0xabc", &game(2500, "rare", true));
        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.best_score, 2500);
        assert_eq!(stats.best_tier, "rare");
        assert!(stats.best_survived);
    }

    #[test]
    fn merge_stats_keeps_best_score_and_tier() {
        let first = merge_stats(None, "0xabc", &game(6500, "legendary", true));
        let second = merge_stats(Some(&first), "0xabc", &game(100, "dead", false));

        assert_eq!(second.games_played, 2);
        assert_eq!(second.best_score, 6500);
        assert_eq!(second.best_tier, "legendary");
        assert!(second.best_survived);
        // last_played always tracks the latest run
        assert_eq!(second.last_played, 1_700_000_000_000);
    }

    #[test]
    fn merge_stats_same_tier_higher_score_wins() {
        let first = merge_stats(None, "0xabc", &game(2100, "rare", true));
        let second = merge_stats(Some(&first), "0xabc", &game(3000, "rare", true));
        assert_eq!(second.best_score, 3000);
        assert_eq!(second.best_tier, "rare");
    }

    #[test]
    fn merge_stats_preserves_farcaster_fields() {
        let mut first = merge_stats(None, "0xabc", &game(500, "common", true));
        first.fc_username = Some("trailblazer".to_string());
        first.fc_resolved_at = Some(1_700_000_000_000);

        let second = merge_stats(Some(&first), "0xabc", &game(700, "common", true));
        assert_eq!(second.fc_username.as_deref(), Some("trailblazer"));
        assert_eq!(second.fc_resolved_at, Some(1_700_000_000_000));
    }

    #[test]
    fn stats_from_hash_requires_wallet() {
        let mut map = HashMap::new();
        map.insert("best_score".to_string(), "100".to_string());
        assert!(stats_from_hash(&map).is_none());

        map.insert("wallet".to_string(), "0xabc".to_string());
        let stats = stats_from_hash(&map).unwrap();
        assert_eq!(stats.best_score, 100);
        assert_eq!(stats.best_tier, "dead");
        assert_eq!(stats.games_played, 0);
    }

    #[test]
    fn profile_refresh_needed_when_absent_or_stale() {
        assert!(needs_profile_refresh(None));

        let mut stats = merge_stats(None, "0xabc", &game(100, "common", true));
        assert!(needs_profile_refresh(Some(&stats)));

        stats.fc_resolved_at = Some(chrono::Utc::now().timestamp_millis());
        assert!(!needs_profile_refresh(Some(&stats)));

        stats.fc_resolved_at =
            Some(chrono::Utc::now().timestamp_millis() - NEYNAR_CACHE_TTL_MS - 1000);
        assert!(needs_profile_refresh(Some(&stats)));
    }
}
