use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TxHash, U256};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

// Rewards contract surface the agent drives. The backend's signature binds
// (wallet, token, amount, nonce, expiry, chainId, contract); the contract
// re-derives the digest, checks expiry and burns the nonce.
ethers::contract::abigen!(
    TrailRewards,
    r#"[
        function claimReward(string eventTitle, address token, uint256 amount, bytes32 nonce, uint256 expiry, bytes signature)
        function hasPlayerClaimed(address player, string eventTitle) view returns (bool)
        function eventTokens(string eventTitle) view returns (address)
        function tokenBalance(address token) view returns (uint256)
    ]"#
);

const CONFIRM_POLL_SECS: u64 = 2;
const CONFIRM_POLL_ATTEMPTS: u32 = 60;
const ERROR_CLIP_CHARS: usize = 100;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn clip(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}

// ── WIRE TYPES (must match the backend) ──

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
    pub signed_at: i64,
    pub expiry: u64,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    #[allow(dead_code)]
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    #[allow(dead_code)]
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct PendingBody {
    rewards: Vec<SignedReward>,
}

// ── BACKEND CLIENT ──

pub struct RewardsApi {
    base_url: String,
    client: reqwest::Client,
}

impl RewardsApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Non-critical: the game keeps going without reward bookkeeping.
    pub async fn create_session(&self, wallet: &str, session_id: &str) {
        if let Err(err) = self.post_session("create", wallet, session_id, None).await {
            tracing::warn!("Session create failed (continuing): {err:#}");
        }
    }

    /// Non-critical, same as create_session.
    pub async fn record_event(&self, wallet: &str, session_id: &str, event_title: &str) {
        if let Err(err) = self
            .post_session("event", wallet, session_id, Some(event_title))
            .await
        {
            tracing::warn!("Event record failed (continuing): {err:#}");
        }
    }

    async fn post_session(
        &self,
        action: &str,
        wallet: &str,
        session_id: &str,
        event_title: Option<&str>,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "action": action,
            "wallet": wallet,
            "sessionId": session_id,
        });
        if let Some(title) = event_title {
            body["eventTitle"] = title.into();
        }

        let resp = self
            .client
            .post(format!("{}/api/rewards/session", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn sign(
        &self,
        wallet: &str,
        session_id: &str,
        event_title: &str,
    ) -> Result<SignedReward> {
        let body = serde_json::json!({
            "wallet": wallet,
            "eventTitle": event_title,
            "gameSessionId": session_id,
        });

        let resp = self
            .client
            .post(format!("{}/api/rewards/sign", self.base_url))
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let envelope: ApiEnvelope<SignedReward> = resp.json().await?;
        envelope.data.context("sign response missing data")
    }

    pub async fn pending(&self, wallet: &str, session_id: &str) -> Result<Vec<SignedReward>> {
        let resp = self
            .client
            .get(format!("{}/api/rewards/pending", self.base_url))
            .query(&[("wallet", wallet), ("sessionId", session_id)])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let envelope: ApiEnvelope<PendingBody> = resp.json().await?;
        Ok(envelope.data.map(|d| d.rewards).unwrap_or_default())
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let message = resp
            .json::<ApiEnvelope<serde_json::Value>>()
            .await
            .ok()
            .and_then(|envelope| envelope.error)
            .map(|e| e.message)
            .unwrap_or_else(|| "request failed".to_string());
        bail!("{status}: {message}")
    }
}

// ── SUBMISSION SEAM ──

#[derive(Debug)]
pub enum SubmitError {
    Rejected,
    AlreadyClaimed,
    PoolEmpty,
    Other(String),
}

impl SubmitError {
    pub fn classify(raw: &str) -> SubmitError {
        let lowered = raw.to_lowercase();
        if lowered.contains("user rejected") || lowered.contains("denied") {
            SubmitError::Rejected
        } else if lowered.contains("alreadyclaimed") || lowered.contains("already claimed") {
            SubmitError::AlreadyClaimed
        } else if lowered.contains("insufficientbalance")
            || lowered.contains("transfer amount exceeds balance")
        {
            SubmitError::PoolEmpty
        } else {
            SubmitError::Other(raw.to_string())
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Rejected => "Transaction rejected".to_string(),
            SubmitError::AlreadyClaimed => "Already claimed".to_string(),
            SubmitError::PoolEmpty => "Reward pool empty — try again later".to_string(),
            SubmitError::Other(msg) => {
                let clipped = clip(msg, ERROR_CLIP_CHARS);
                if clipped.is_empty() {
                    "Claim failed".to_string()
                } else {
                    clipped
                }
            }
        }
    }
}

#[async_trait]
pub trait ClaimSubmitter {
    async fn submit(&self, reward: &SignedReward) -> std::result::Result<String, SubmitError>;
    async fn confirm(&self, tx_hash: &str) -> std::result::Result<(), SubmitError>;
}

// ── CLAIM STATE MACHINE ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Idle,
    Signing,
    Claiming,
    Confirming,
    Success,
    Error,
}

pub struct ClaimFlow<S> {
    api: RewardsApi,
    submitter: S,
    wallet: String,
    session_id: String,
    state: ClaimState,
    transitions: Vec<ClaimState>,
    last_error: Option<String>,
    pending: Vec<SignedReward>,
}

impl<S: ClaimSubmitter> ClaimFlow<S> {
    pub fn new(api: RewardsApi, submitter: S, wallet: &str, session_id: &str) -> Self {
        Self {
            api,
            submitter,
            wallet: wallet.to_string(),
            session_id: session_id.to_string(),
            state: ClaimState::Idle,
            transitions: Vec::new(),
            last_error: None,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> ClaimState {
        self.state
    }

    pub fn transitions(&self) -> &[ClaimState] {
        &self.transitions
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending(&self) -> &[SignedReward] {
        &self.pending
    }

    /// Defer entry point: keep a signed voucher for a later batch claim.
    pub fn queue(&mut self, reward: SignedReward) {
        self.pending.push(reward);
    }

    pub fn reset(&mut self) {
        self.set_state(ClaimState::Idle);
        self.last_error = None;
    }

    fn set_state(&mut self, state: ClaimState) {
        self.state = state;
        self.transitions.push(state);
    }

    fn fail(&mut self, message: String) {
        self.last_error = Some(clip(&message, ERROR_CLIP_CHARS));
        self.set_state(ClaimState::Error);
    }

    /// Full claim path: fetch the voucher, submit, await confirmation.
    pub async fn claim_now(&mut self, event_title: &str) {
        self.last_error = None;
        self.set_state(ClaimState::Signing);

        let reward = match self
            .api
            .sign(&self.wallet, &self.session_id, event_title)
            .await
        {
            Ok(reward) => reward,
            Err(err) => {
                self.fail(format!("{err:#}"));
                return;
            }
        };

        self.submit_one(reward).await;
    }

    /// Pull the server-side pending list into the local queue.
    pub async fn load_pending(&mut self) -> Result<usize> {
        let rewards = self.api.pending(&self.wallet, &self.session_id).await?;
        let count = rewards.len();
        for reward in rewards {
            self.queue(reward);
        }
        Ok(count)
    }

    /// Claim every queued voucher, strictly one at a time so wallet nonces
    /// never race. Expired vouchers are dropped up front; a failed voucher
    /// stays queued (unless the chain says it was already claimed) and stops
    /// the batch.
    pub async fn claim_all_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.last_error = None;

        let now = unix_now();
        let before = self.pending.len();
        self.pending.retain(|r| r.expiry > now);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} expired voucher(s)", dropped);
        }
        if self.pending.is_empty() {
            self.fail("Rewards expired".to_string());
            return;
        }

        while !self.pending.is_empty() {
            let reward = self.pending.remove(0);
            let title = reward.event_title.clone();
            match self.submit_one(reward).await {
                Ok(()) => {}
                Err(SubmitError::AlreadyClaimed) => {
                    // Burned on-chain already; retrying it forever helps no one.
                    tracing::warn!("Skipping already-claimed voucher for {}", title);
                    continue;
                }
                Err(_) => return,
            }
        }

        self.last_error = None;
        if self.state != ClaimState::Success {
            self.set_state(ClaimState::Success);
        }
    }

    async fn submit_one(&mut self, reward: SignedReward) -> std::result::Result<(), SubmitError> {
        self.set_state(ClaimState::Claiming);

        let tx_hash = match self.submitter.submit(&reward).await {
            Ok(hash) => hash,
            Err(err) => {
                // Signed but unclaimed: keep the voucher for a later retry.
                if !matches!(err, SubmitError::AlreadyClaimed) {
                    self.pending.push(reward);
                }
                self.fail(err.user_message());
                return Err(err);
            }
        };

        self.set_state(ClaimState::Confirming);
        match self.submitter.confirm(&tx_hash).await {
            Ok(()) => {
                self.set_state(ClaimState::Success);
                tracing::info!(
                    "Claimed {} ({}) in {}",
                    reward.display_amount,
                    reward.event_title,
                    tx_hash
                );
                Ok(())
            }
            Err(err) => {
                if !matches!(err, SubmitError::AlreadyClaimed) {
                    self.pending.push(reward);
                }
                self.fail(err.user_message());
                Err(err)
            }
        }
    }
}

// ── ON-CHAIN SUBMITTER ──

type ChainClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EthersSubmitter {
    contract: TrailRewards<ChainClient>,
    player: Address,
}

impl EthersSubmitter {
    pub fn new(
        rpc_url: &str,
        private_key: &str,
        contract_address: &str,
        chain_id: u64,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url).context("invalid rpc url")?;
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .context("invalid player private key")?
            .with_chain_id(chain_id);
        let player = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = TrailRewards::new(
            contract_address
                .parse::<Address>()
                .context("invalid rewards contract address")?,
            client,
        );
        Ok(Self { contract, player })
    }

    pub fn player(&self) -> Address {
        self.player
    }

    // Read-only discovery before spending gas: claimed flag, token binding,
    // pool balance.
    async fn preflight(&self, reward: &SignedReward) -> std::result::Result<(), SubmitError> {
        let claimed = self
            .contract
            .has_player_claimed(self.player, reward.event_title.clone())
            .call()
            .await
            .map_err(|e| SubmitError::classify(&e.to_string()))?;
        if claimed {
            return Err(SubmitError::AlreadyClaimed);
        }

        let token: Address = reward
            .token
            .parse()
            .map_err(|_| SubmitError::Other("invalid token address in voucher".to_string()))?;

        let configured = self
            .contract
            .event_tokens(reward.event_title.clone())
            .call()
            .await
            .map_err(|e| SubmitError::classify(&e.to_string()))?;
        if configured != Address::zero() && configured != token {
            return Err(SubmitError::Other(
                "voucher token does not match the on-chain event config".to_string(),
            ));
        }

        let amount = U256::from_dec_str(&reward.amount)
            .map_err(|_| SubmitError::Other("invalid amount in voucher".to_string()))?;
        let balance = self
            .contract
            .token_balance(token)
            .call()
            .await
            .map_err(|e| SubmitError::classify(&e.to_string()))?;
        if balance < amount {
            return Err(SubmitError::PoolEmpty);
        }

        Ok(())
    }
}

fn decode_fixed32(raw: &str) -> std::result::Result<[u8; 32], SubmitError> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|_| SubmitError::Other("invalid nonce in voucher".to_string()))?;
    bytes
        .try_into()
        .map_err(|_| SubmitError::Other("invalid nonce in voucher".to_string()))
}

#[async_trait]
impl ClaimSubmitter for EthersSubmitter {
    async fn submit(&self, reward: &SignedReward) -> std::result::Result<String, SubmitError> {
        self.preflight(reward).await?;

        let token: Address = reward
            .token
            .parse()
            .map_err(|_| SubmitError::Other("invalid token address in voucher".to_string()))?;
        let amount = U256::from_dec_str(&reward.amount)
            .map_err(|_| SubmitError::Other("invalid amount in voucher".to_string()))?;
        let nonce = decode_fixed32(&reward.nonce)?;
        let signature = Bytes::from(
            hex::decode(reward.signature.trim_start_matches("0x"))
                .map_err(|_| SubmitError::Other("invalid signature in voucher".to_string()))?,
        );

        let call = self.contract.claim_reward(
            reward.event_title.clone(),
            token,
            amount,
            nonce,
            U256::from(reward.expiry),
            signature,
        );
        let pending = call
            .send()
            .await
            .map_err(|e| SubmitError::classify(&e.to_string()))?;
        let tx_hash: TxHash = *pending;
        Ok(format!("{tx_hash:#x}"))
    }

    async fn confirm(&self, tx_hash: &str) -> std::result::Result<(), SubmitError> {
        let hash: TxHash = tx_hash
            .parse()
            .map_err(|_| SubmitError::Other("invalid tx hash".to_string()))?;

        let client = self.contract.client();
        for _ in 0..CONFIRM_POLL_ATTEMPTS {
            let receipt = client
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| SubmitError::classify(&e.to_string()))?;
            if let Some(receipt) = receipt {
                if receipt.status == Some(1u64.into()) {
                    return Ok(());
                }
                return Err(SubmitError::classify("execution reverted"));
            }
            tokio::time::sleep(Duration::from_secs(CONFIRM_POLL_SECS)).await;
        }
        Err(SubmitError::Other("confirmation timed out".to_string()))
    }
}

// ── CLI ──

#[derive(Parser)]
#[command(name = "claim-agent", about = "Trail rewards claim tool")]
struct Cli {
    /// Rewards backend base URL
    #[arg(long, default_value = "http://localhost:3000")]
    base_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ChainArgs {
    #[arg(long, default_value = "https://mainnet.base.org")]
    rpc_url: String,
    /// Player key; stands in for the browser wallet
    #[arg(long, env = "PLAYER_PRIVATE_KEY")]
    private_key: String,
    #[arg(long, env = "REWARDS_CONTRACT_ADDRESS")]
    contract: String,
    #[arg(long, default_value_t = 8453)]
    chain_id: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new game session
    Session {
        #[arg(long)]
        wallet: String,
    },
    /// Record a sponsored event in a session
    Record {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        event: String,
    },
    /// List signed-but-unclaimed vouchers for a session
    Pending {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        session_id: String,
    },
    /// Sign a voucher now, claim later (it stays in the pending queue)
    Defer {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        event: String,
    },
    /// Claim a reward end-to-end: sign, submit, confirm
    Claim {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        event: String,
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Claim every pending voucher, one at a time
    ClaimPending {
        #[arg(long)]
        session_id: String,
        #[command(flatten)]
        chain: ChainArgs,
    },
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn report(state: ClaimState, last_error: Option<&str>, pending: usize) {
    match state {
        ClaimState::Success => println!("done: success"),
        ClaimState::Error => {
            println!(
                "done: error ({}), {} voucher(s) left pending",
                last_error.unwrap_or("unknown"),
                pending
            );
        }
        other => println!("done: {other:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claim_agent=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let api = RewardsApi::new(&cli.base_url);

    match cli.command {
        Command::Session { wallet } => {
            let session_id = new_session_id();
            api.create_session(&wallet, &session_id).await;
            println!("{session_id}");
        }
        Command::Record {
            wallet,
            session_id,
            event,
        } => {
            api.record_event(&wallet, &session_id, &event).await;
            println!("recorded");
        }
        Command::Pending { wallet, session_id } => {
            let rewards = api.pending(&wallet, &session_id).await?;
            for reward in &rewards {
                println!(
                    "{}  {}  expires {}",
                    reward.event_title, reward.display_amount, reward.expiry
                );
            }
            println!("{} pending voucher(s)", rewards.len());
        }
        Command::Defer {
            wallet,
            session_id,
            event,
        } => {
            let reward = api.sign(&wallet, &session_id, &event).await?;
            println!(
                "deferred {} ({}), claim before {}",
                reward.display_amount, reward.event_title, reward.expiry
            );
        }
        Command::Claim {
            session_id,
            event,
            chain,
        } => {
            let submitter = EthersSubmitter::new(
                &chain.rpc_url,
                &chain.private_key,
                &chain.contract,
                chain.chain_id,
            )?;
            let wallet = format!("{:#x}", submitter.player());
            let mut flow = ClaimFlow::new(api, submitter, &wallet, &session_id);
            flow.claim_now(&event).await;
            report(flow.state(), flow.last_error(), flow.pending().len());
        }
        Command::ClaimPending { session_id, chain } => {
            let submitter = EthersSubmitter::new(
                &chain.rpc_url,
                &chain.private_key,
                &chain.contract,
                chain.chain_id,
            )?;
            let wallet = format!("{:#x}", submitter.player());
            let mut flow = ClaimFlow::new(api, submitter, &wallet, &session_id);
            let loaded = flow.load_pending().await?;
            println!("loaded {loaded} pending voucher(s)");
            flow.claim_all_pending().await;
            report(flow.state(), flow.last_error(), flow.pending().len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct MockSubmitter {
        submits: Mutex<VecDeque<std::result::Result<String, SubmitError>>>,
        confirms: Mutex<VecDeque<std::result::Result<(), SubmitError>>>,
    }

    impl MockSubmitter {
        fn new(
            submits: Vec<std::result::Result<String, SubmitError>>,
            confirms: Vec<std::result::Result<(), SubmitError>>,
        ) -> Self {
            Self {
                submits: Mutex::new(submits.into()),
                confirms: Mutex::new(confirms.into()),
            }
        }
    }

    #[async_trait]
    impl ClaimSubmitter for MockSubmitter {
        async fn submit(&self, _reward: &SignedReward) -> std::result::Result<String, SubmitError> {
            self.submits
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SubmitError::Other("unscripted submit".to_string())))
        }

        async fn confirm(&self, _tx_hash: &str) -> std::result::Result<(), SubmitError> {
            self.confirms
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    fn voucher(event: &str, expiry: u64) -> SignedReward {
        SignedReward {
            nonce: format!("0x{}", "11".repeat(32)),
            token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
            amount: "10000".to_string(),
            signature: format!("0x{}", "22".repeat(65)),
            event_title: event.to_string(),
            display_amount: "$0.01 USDC".to_string(),
            symbol: "USDC".to_string(),
            signed_at: 1_700_000_000_000,
            expiry,
        }
    }

    fn flow(submitter: MockSubmitter) -> ClaimFlow<MockSubmitter> {
        ClaimFlow::new(
            RewardsApi::new("http://localhost:0"),
            submitter,
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "session-1",
        )
    }

    #[tokio::test]
    async fn successful_batch_walks_claiming_confirming_success() {
        let mut flow = flow(MockSubmitter::new(
            vec![Ok("0xhash".to_string())],
            vec![Ok(())],
        ));
        flow.queue(voucher("FARCASTER MINI APP", unix_now() + 600));
        flow.claim_all_pending().await;

        assert_eq!(flow.state(), ClaimState::Success);
        assert!(flow.pending().is_empty());
        assert!(flow.last_error().is_none());
        assert_eq!(
            flow.transitions(),
            &[
                ClaimState::Claiming,
                ClaimState::Confirming,
                ClaimState::Success,
            ]
        );
    }

    #[tokio::test]
    async fn failed_submission_keeps_voucher_pending() {
        let mut flow = flow(MockSubmitter::new(
            vec![Err(SubmitError::Other("rpc unreachable".to_string()))],
            vec![],
        ));
        flow.queue(voucher("FARCASTER MINI APP", unix_now() + 600));
        flow.claim_all_pending().await;

        assert_eq!(flow.state(), ClaimState::Error);
        assert_eq!(flow.pending().len(), 1);
        assert_eq!(flow.last_error(), Some("rpc unreachable"));
    }

    #[tokio::test]
    async fn failed_confirmation_keeps_voucher_pending() {
        let mut flow = flow(MockSubmitter::new(
            vec![Ok("0xhash".to_string())],
            vec![Err(SubmitError::Other("execution reverted".to_string()))],
        ));
        flow.queue(voucher("FARCASTER MINI APP", unix_now() + 600));
        flow.claim_all_pending().await;

        assert_eq!(flow.state(), ClaimState::Error);
        assert_eq!(flow.pending().len(), 1);
    }

    #[tokio::test]
    async fn already_claimed_voucher_is_dropped_and_batch_continues() {
        let mut flow = flow(MockSubmitter::new(
            vec![Err(SubmitError::AlreadyClaimed), Ok("0xhash".to_string())],
            vec![Ok(())],
        ));
        flow.queue(voucher("FARCASTER MINI APP", unix_now() + 600));
        flow.queue(voucher("PIZZA PARTY FOR VETS", unix_now() + 600));
        flow.claim_all_pending().await;

        assert_eq!(flow.state(), ClaimState::Success);
        assert!(flow.pending().is_empty());
    }

    #[tokio::test]
    async fn expired_vouchers_are_dropped_up_front() {
        let mut flow = flow(MockSubmitter::new(vec![], vec![]));
        flow.queue(voucher("FARCASTER MINI APP", unix_now().saturating_sub(10)));
        flow.claim_all_pending().await;

        assert_eq!(flow.state(), ClaimState::Error);
        assert_eq!(flow.last_error(), Some("Rewards expired"));
        assert!(flow.pending().is_empty());
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let mut flow = flow(MockSubmitter::new(vec![], vec![]));
        flow.claim_all_pending().await;
        assert_eq!(flow.state(), ClaimState::Idle);
        assert!(flow.transitions().is_empty());
    }

    #[tokio::test]
    async fn rejection_produces_the_tailored_message() {
        let mut flow = flow(MockSubmitter::new(vec![Err(SubmitError::Rejected)], vec![]));
        flow.queue(voucher("FARCASTER MINI APP", unix_now() + 600));
        flow.claim_all_pending().await;
        assert_eq!(flow.last_error(), Some("Transaction rejected"));
    }

    #[tokio::test]
    async fn reset_returns_to_idle_after_error() {
        let mut flow = flow(MockSubmitter::new(
            vec![Err(SubmitError::Other("boom".to_string()))],
            vec![],
        ));
        flow.queue(voucher("FARCASTER MINI APP", unix_now() + 600));
        flow.claim_all_pending().await;
        assert_eq!(flow.state(), ClaimState::Error);

        flow.reset();
        assert_eq!(flow.state(), ClaimState::Idle);
        assert!(flow.last_error().is_none());
        // the voucher survives a reset for the next retry
        assert_eq!(flow.pending().len(), 1);
    }

    #[test]
    fn classify_maps_known_failure_strings() {
        assert!(matches!(
            SubmitError::classify("User rejected the request"),
            SubmitError::Rejected
        ));
        assert!(matches!(
            SubmitError::classify("reverted: AlreadyClaimed()"),
            SubmitError::AlreadyClaimed
        ));
        assert!(matches!(
            SubmitError::classify("reverted: InsufficientBalance()"),
            SubmitError::PoolEmpty
        ));
        assert!(matches!(
            SubmitError::classify("connection refused"),
            SubmitError::Other(_)
        ));
    }

    #[test]
    fn user_messages_match_the_ui_copy() {
        assert_eq!(
            SubmitError::PoolEmpty.user_message(),
            "Reward pool empty — try again later"
        );
        assert_eq!(SubmitError::AlreadyClaimed.user_message(), "Already claimed");
        let long = "x".repeat(300);
        assert_eq!(
            SubmitError::Other(long).user_message().chars().count(),
            ERROR_CLIP_CHARS
        );
        assert_eq!(
            SubmitError::Other(String::new()).user_message(),
            "Claim failed"
        );
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let msg = "é".repeat(150);
        assert_eq!(clip(&msg, 100).chars().count(), 100);
    }

    #[test]
    fn decode_fixed32_round_trips() {
        let nonce = decode_fixed32(&format!("0x{}", "ab".repeat(32))).unwrap();
        assert_eq!(nonce, [0xabu8; 32]);
        assert!(decode_fixed32("0x1234").is_err());
        assert!(decode_fixed32("zz").is_err());
    }

    #[test]
    fn session_ids_are_unique_hex() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
