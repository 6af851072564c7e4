use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::constants::PROFILE_QUEUE_DEPTH;
use crate::error::{AppError, Result};
use crate::integrations::neynar::NeynarClient;
use crate::kv::{needs_profile_refresh, Store};

/// Profile Resolver - refreshes cached Farcaster identities in the background.
///
/// Score submissions enqueue a wallet here instead of awaiting the Neynar
/// round trip; completions and failures are counted so the work is observable.
#[derive(Clone)]
pub struct ProfileResolver {
    tx: mpsc::Sender<String>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl ProfileResolver {
    pub fn spawn(store: Store, neynar: NeynarClient) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(PROFILE_QUEUE_DEPTH);
        let completed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let worker_completed = completed.clone();
        let worker_failed = failed.clone();
        tokio::spawn(async move {
            while let Some(wallet) = rx.recv().await {
                match refresh_one(&store, &neynar, &wallet).await {
                    Ok(true) => {
                        worker_completed.fetch_add(1, Ordering::Relaxed);
                        tracing::info!("Farcaster profile refreshed for {}", wallet);
                    }
                    Ok(false) => {}
                    Err(err) => {
                        worker_failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("Farcaster profile refresh failed for {}: {}", wallet, err);
                    }
                }
            }
        });

        Self {
            tx,
            completed,
            failed,
        }
    }

    /// Never blocks the caller; a full queue drops the request with a warning.
    pub fn enqueue(&self, wallet: &str) {
        if let Err(err) = self.tx.try_send(wallet.to_string()) {
            tracing::warn!("Profile refresh queue rejected {}: {}", wallet, err);
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

async fn refresh_one(store: &Store, neynar: &NeynarClient, wallet: &str) -> Result<bool> {
    if !neynar.is_configured() {
        return Ok(false);
    }

    let stats = store.player_stats(wallet).await?;
    if !needs_profile_refresh(stats.as_ref()) {
        return Ok(false);
    }

    let profile = neynar
        .lookup_by_address(wallet)
        .await
        .map_err(|e| AppError::ExternalAPI(e.to_string()))?;
    let Some(profile) = profile else {
        return Ok(false);
    };

    store.update_farcaster_profile(wallet, &profile).await?;
    Ok(true)
}
