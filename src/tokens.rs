/// Sponsored token rewards config.
/// Maps trail event titles to their ERC-20 token reward info.

#[derive(Debug, Clone, Copy)]
pub struct SponsoredToken {
    pub symbol: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub decimals: u8,
    /// Integer token base units; zero means the reward is not configured yet.
    pub reward_amount: u128,
    pub event_title: &'static str,
    pub display_amount: &'static str,
    /// Uniform 1x-5x multiplier applied at signing time.
    pub random_reward: bool,
}

pub const SPONSORED_TOKENS: &[SponsoredToken] = &[
    SponsoredToken {
        symbol: "BETR",
        name: "Betrmint",
        address: "0x0000000000000000000000000000000000000000",
        decimals: 18,
        reward_amount: 0, // TODO: set to $0.01 worth once token price known
        event_title: "BETR POKER CHAMPION",
        display_amount: "$0.01 BETR",
        random_reward: false,
    },
    SponsoredToken {
        symbol: "BRND",
        name: "BRND",
        address: "0x0000000000000000000000000000000000000000",
        decimals: 18,
        reward_amount: 0, // TODO: set to $0.01 worth once token price known
        event_title: "BRND MINI APP WINNER",
        display_amount: "$0.01 BRND",
        random_reward: false,
    },
    SponsoredToken {
        symbol: "DAU",
        name: "DAU",
        address: "0x0000000000000000000000000000000000000000",
        decimals: 18,
        reward_amount: 0, // TODO: set to $0.01 worth once token price known
        event_title: "DAU CO-SPONSOR",
        display_amount: "$0.01 DAU",
        random_reward: false,
    },
    SponsoredToken {
        symbol: "USDC",
        name: "USD Coin",
        address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", // USDC on Base
        decimals: 6,
        reward_amount: 10_000, // 0.01 USDC
        event_title: "FARCASTER MINI APP",
        display_amount: "$0.01 USDC",
        random_reward: true,
    },
    SponsoredToken {
        symbol: "PIZZA",
        name: "PizzaParty",
        address: "0xB4fDe59a779991bfB6a52253B51947828b982be3",
        decimals: 18,
        reward_amount: 100_000_000_000_000_000_000, // 100 PIZZA ~= $0.10, always fixed
        event_title: "PIZZA PARTY FOR VETS",
        display_amount: "$0.10 PIZZA",
        random_reward: false,
    },
    SponsoredToken {
        symbol: "QR",
        name: "QR Token",
        address: "0x0000000000000000000000000000000000000000",
        decimals: 18,
        reward_amount: 0, // TODO: set to $0.01 worth once token price known
        event_title: "QR ONCHAIN ATTENTION",
        display_amount: "$0.01 QR",
        random_reward: true,
    },
];

pub fn sponsored_token(event_title: &str) -> Option<&'static SponsoredToken> {
    SPONSORED_TOKENS.iter().find(|t| t.event_title == event_title)
}

pub fn is_sponsored_event(event_title: &str) -> bool {
    sponsored_token(event_title).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_event_title() {
        let token = sponsored_token("FARCASTER MINI APP").unwrap();
        assert_eq!(token.symbol, "USDC");
        assert_eq!(token.reward_amount, 10_000);
    }

    #[test]
    fn unknown_event_is_not_sponsored() {
        assert!(sponsored_token("DYSENTERY").is_none());
        assert!(!is_sponsored_event("DYSENTERY"));
    }

    #[test]
    fn pizza_reward_is_fixed_and_configured() {
        let token = sponsored_token("PIZZA PARTY FOR VETS").unwrap();
        assert!(!token.random_reward);
        assert!(token.reward_amount > 0);
    }

    #[test]
    fn event_titles_are_unique() {
        for (i, a) in SPONSORED_TOKENS.iter().enumerate() {
            for b in &SPONSORED_TOKENS[i + 1..] {
                assert_ne!(a.event_title, b.event_title);
            }
        }
    }
}
