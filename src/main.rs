use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod crypto;
mod error;
mod integrations;
mod kv;
mod models;
mod services;
mod tokens;
mod utils;

use config::Config;
use crypto::signer::RewardSigner;
use integrations::neynar::NeynarClient;
use kv::Store;
use services::ProfileResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trail_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting Trail Rewards Backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Chain id: {}", config.chain_id);

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let redis_manager = redis::aio::ConnectionManager::new(redis).await?;
    let store = Store::new(redis_manager);

    // Reward signer is optional; the sign endpoint answers 503 without it.
    let signer = match (
        &config.rewards_signer_private_key,
        &config.rewards_contract_address,
    ) {
        (Some(key), Some(contract)) if config.signing_configured() => {
            let signer = RewardSigner::new(key, contract, config.chain_id)?;
            tracing::info!("Reward signer address: {:#x}", signer.address());
            Some(Arc::new(signer))
        }
        _ => {
            tracing::warn!("Rewards signing disabled (missing signer key or contract address)");
            None
        }
    };

    // Background Farcaster profile resolver
    let neynar = NeynarClient::new(config.neynar_api_key.clone());
    let profiles = ProfileResolver::spawn(store.clone(), neynar);

    // Masukkan store dan signer ke AppState
    let app_state = api::AppState {
        store,
        config: config.clone(),
        signer,
        profiles,
    };

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Reward sessions & signing
        .route("/api/rewards/session", post(api::rewards::session))
        .route("/api/rewards/pending", get(api::rewards::pending))
        .route("/api/rewards/sign", post(api::rewards::sign))
        // Leaderboard
        .route(
            "/api/leaderboard",
            get(api::leaderboard::get_leaderboard).post(api::leaderboard::submit_score),
        )
        .route(
            "/api/leaderboard/{address}",
            get(api::leaderboard::get_player),
        )
        // Free play
        .route(
            "/api/free-play",
            get(api::free_play::get_free_plays).post(api::free_play::free_play_action),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
