use serde::Deserialize;
use std::env;

use crate::constants::DEFAULT_CHAIN_ID;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Redis
    pub redis_url: String,

    // Reward signing
    pub rewards_signer_private_key: Option<String>,
    pub rewards_contract_address: Option<String>,
    pub chain_id: u64,

    // External APIs
    pub neynar_api_key: Option<String>,

    // Admin
    pub admin_secret: Option<String>,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            rewards_signer_private_key: env::var("REWARDS_SIGNER_PRIVATE_KEY").ok(),
            rewards_contract_address: env::var("REWARDS_CONTRACT_ADDRESS").ok(),
            chain_id: env::var("CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHAIN_ID),

            neynar_api_key: env::var("NEYNAR_API_KEY").ok(),

            admin_secret: env::var("ADMIN_SECRET").ok(),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.redis_url.trim().is_empty() {
            anyhow::bail!("REDIS_URL is empty");
        }

        // The sign endpoint answers 503 until both are present, so these only warn.
        if self.rewards_signer_private_key.is_none() {
            tracing::warn!("REWARDS_SIGNER_PRIVATE_KEY missing; reward signing disabled");
        }
        if self.rewards_contract_address.is_none() {
            tracing::warn!("REWARDS_CONTRACT_ADDRESS missing; reward signing disabled");
        }
        if let Some(contract) = &self.rewards_contract_address {
            if contract.starts_with("0x0000") {
                tracing::warn!("Using placeholder rewards contract address");
            }
        }

        if self.neynar_api_key.is_none() {
            tracing::warn!("NEYNAR_API_KEY missing; Farcaster profiles will not resolve");
        }
        if self.admin_secret.is_none() {
            tracing::warn!("ADMIN_SECRET missing; free-play grants disabled");
        }

        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn signing_configured(&self) -> bool {
        self.rewards_signer_private_key
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
            && self
                .rewards_contract_address
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
    }
}
