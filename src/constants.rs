/// Application constants

// Session / signature lifetimes
pub const SESSION_TTL_SECONDS: i64 = 7200; // 2 hours
pub const SIGNATURE_TTL_SECONDS: u64 = 3600; // 1 hour

// Chain configuration
pub const DEFAULT_CHAIN_ID: u64 = 8453; // Base mainnet

// Leaderboard / player history
pub const LEADERBOARD_SIZE: isize = 50;
pub const MAX_GAME_HISTORY: isize = 50;

// Score tier thresholds
pub const TIER_RARE_SCORE: i64 = 2000;
pub const TIER_EPIC_SCORE: i64 = 4000;
pub const TIER_LEGENDARY_SCORE: i64 = 6000;

// Randomized reward multiplier (1x-5x)
pub const RANDOM_MULTIPLIER_MAX: u32 = 5;

// Farcaster profile cache
pub const NEYNAR_CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000; // 24 hours

// Background profile resolver
pub const PROFILE_QUEUE_DEPTH: usize = 256;
