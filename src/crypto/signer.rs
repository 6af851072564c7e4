use ethers::abi::{encode_packed, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};

use crate::crypto::hash::keccak256;
use crate::error::{AppError, Result};

/// Issues claim authorizations for the rewards contract.
///
/// The payload binds (wallet, token, amount, nonce, expiry, chainId, contract)
/// with abi.encodePacked semantics, is keccak256-digested and signed as an
/// EIP-191 personal message. The key and contract address are explicit
/// constructor inputs so the signer is testable without ambient env state.
#[derive(Debug)]
pub struct RewardSigner {
    wallet: LocalWallet,
    contract: Address,
    chain_id: u64,
}

impl RewardSigner {
    pub fn new(private_key: &str, contract_address: &str, chain_id: u64) -> Result<Self> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| AppError::Signer(format!("invalid signer key: {e}")))?;
        let contract = contract_address
            .trim()
            .parse::<Address>()
            .map_err(|e| AppError::Signer(format!("invalid rewards contract address: {e}")))?;

        Ok(Self {
            wallet: wallet.with_chain_id(chain_id),
            contract,
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Digest the contract verifies: keccak256 of the packed claim payload.
    pub fn claim_digest(
        &self,
        wallet: Address,
        token: Address,
        amount: U256,
        nonce: &[u8; 32],
        expiry: u64,
    ) -> Result<[u8; 32]> {
        let packed = encode_packed(&[
            Token::Address(wallet),
            Token::Address(token),
            Token::Uint(amount),
            Token::FixedBytes(nonce.to_vec()),
            Token::Uint(U256::from(expiry)),
            Token::Uint(U256::from(self.chain_id)),
            Token::Address(self.contract),
        ])
        .map_err(|e| AppError::Signer(e.to_string()))?;

        Ok(keccak256(&packed))
    }

    /// Returns the 65-byte signature as 0x-prefixed hex.
    pub async fn sign_claim(
        &self,
        wallet: &str,
        token: &str,
        amount: u128,
        nonce: &[u8; 32],
        expiry: u64,
    ) -> Result<String> {
        let wallet: Address = wallet
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid wallet address".to_string()))?;
        let token: Address = token
            .parse()
            .map_err(|_| AppError::Signer("invalid token address".to_string()))?;

        let digest = self.claim_digest(wallet, token, U256::from(amount), nonce, expiry)?;
        let signature = self
            .wallet
            .sign_message(digest)
            .await
            .map_err(|e| AppError::Signer(e.to_string()))?;

        Ok(format!("0x{signature}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{RecoveryMessage, Signature};

    // Well-known throwaway dev key; its address is 0xf39F...2266.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_CONTRACT: &str = "0x1111111111111111111111111111111111111111";
    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    const PLAYER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn test_signer() -> RewardSigner {
        RewardSigner::new(TEST_KEY, TEST_CONTRACT, 8453).unwrap()
    }

    #[test]
    fn rejects_invalid_key_and_contract() {
        match RewardSigner::new("not-a-key", TEST_CONTRACT, 8453) {
            Err(AppError::Signer(msg)) => assert!(msg.contains("invalid signer key")),
            other => panic!("expected Signer error, got {other:?}"),
        }
        match RewardSigner::new(TEST_KEY, "0x123", 8453) {
            Err(AppError::Signer(msg)) => assert!(msg.contains("contract address")),
            other => panic!("expected Signer error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_0x_prefixed_key() {
        let prefixed = format!("0x{TEST_KEY}");
        let a = RewardSigner::new(&prefixed, TEST_CONTRACT, 8453).unwrap();
        let b = test_signer();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn digest_changes_with_nonce_and_expiry() {
        let signer = test_signer();
        let wallet: Address = PLAYER.parse().unwrap();
        let token: Address = USDC_BASE.parse().unwrap();
        let amount = U256::from(10_000u64);

        let d1 = signer
            .claim_digest(wallet, token, amount, &[1u8; 32], 1_700_003_600)
            .unwrap();
        let d2 = signer
            .claim_digest(wallet, token, amount, &[2u8; 32], 1_700_003_600)
            .unwrap();
        let d3 = signer
            .claim_digest(wallet, token, amount, &[1u8; 32], 1_700_003_601)
            .unwrap();

        assert_ne!(d1, d2);
        assert_ne!(d1, d3);
    }

    #[tokio::test]
    async fn signature_recovers_to_signer_address() {
        let signer = test_signer();
        let nonce = [7u8; 32];
        let sig_hex = signer
            .sign_claim(PLAYER, USDC_BASE, 10_000, &nonce, 1_700_003_600)
            .await
            .unwrap();
        assert!(sig_hex.starts_with("0x"));
        assert_eq!(sig_hex.len(), 2 + 65 * 2);

        let signature: Signature = sig_hex.trim_start_matches("0x").parse().unwrap();
        let digest = signer
            .claim_digest(
                PLAYER.parse().unwrap(),
                USDC_BASE.parse().unwrap(),
                U256::from(10_000u64),
                &nonce,
                1_700_003_600,
            )
            .unwrap();
        let recovered = signature
            .recover(RecoveryMessage::Data(digest.to_vec()))
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[tokio::test]
    async fn rejects_malformed_wallet() {
        let signer = test_signer();
        let result = signer
            .sign_claim("0xnotanaddress", USDC_BASE, 10_000, &[0u8; 32], 0)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
