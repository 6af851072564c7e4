// Utility modules

use crate::error::{AppError, Result};

/// Basic guard for wallet params; returns the lowercased address.
pub fn normalize_wallet(raw: &str) -> Result<String> {
    let value = raw.trim();
    if !value.starts_with("0x")
        || value.len() != 42
        || !value[2..].chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(AppError::BadRequest("Invalid wallet address".to_string()));
    }
    Ok(value.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wallet_lowercases() {
        let wallet = normalize_wallet("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(wallet, "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn normalize_wallet_rejects_garbage() {
        assert!(normalize_wallet("").is_err());
        assert!(normalize_wallet("deadbeef").is_err());
        assert!(normalize_wallet("0x123").is_err());
        assert!(normalize_wallet("0xZZ9Fd6e51aad88F6F4ce6aB8827279cffFb92266").is_err());
    }
}
