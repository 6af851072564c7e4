use reqwest::Client;
use url::Url;

use crate::models::FarcasterProfile;

const NEYNAR_BASE_URL: &str = "https://api.neynar.com/v2/farcaster";

/// Resolves wallet addresses to Farcaster profiles via the Neynar API.
/// Unconfigured (no API key) lookups resolve to None rather than erroring.
#[derive(Clone, Debug)]
pub struct NeynarClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl NeynarClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, NEYNAR_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            base_url,
            api_key,
            client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    pub async fn lookup_by_address(
        &self,
        address: &str,
    ) -> Result<Option<FarcasterProfile>, reqwest::Error> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };

        let addr = address.to_lowercase();
        let mut url = match Url::parse(&format!(
            "{}/user/bulk-by-address",
            self.base_url.trim_end_matches('/')
        )) {
            Ok(url) => url,
            Err(_) => return Ok(None),
        };
        url.query_pairs_mut().append_pair("addresses", &addr);

        let resp = self
            .client
            .get(url)
            .header("x-api-key", api_key)
            .header("accept", "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Ok(None);
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(profile_from_response(&body, &addr))
    }
}

// The response maps each queried address to a list of matching users.
fn profile_from_response(body: &serde_json::Value, addr: &str) -> Option<FarcasterProfile> {
    let user = body.get(addr)?.as_array()?.first()?;
    let fid = user.get("fid")?;
    let fid = match fid.as_u64() {
        Some(n) => n.to_string(),
        None => fid.as_str()?.to_string(),
    };
    let username = user
        .get("username")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let display_name = user
        .get("display_name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| username.clone());
    let pfp = user
        .get("pfp_url")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Some(FarcasterProfile {
        fid,
        username,
        display_name,
        pfp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_client_reports_so() {
        assert!(!NeynarClient::new(None).is_configured());
        assert!(!NeynarClient::new(Some("  ".to_string())).is_configured());
        assert!(NeynarClient::new(Some("key".to_string())).is_configured());
    }

    #[test]
    fn parses_bulk_by_address_response() {
        let body = serde_json::json!({
            "0xabc": [{
                "fid": 1234,
                "username": "trailblazer",
                "display_name": "Trail Blazer",
                "pfp_url": "https://img.example/pfp.png"
            }]
        });
        let profile = profile_from_response(&body, "0xabc").unwrap();
        assert_eq!(profile.fid, "1234");
        assert_eq!(profile.username, "trailblazer");
        assert_eq!(profile.display_name, "Trail Blazer");
        assert_eq!(profile.pfp, "https://img.example/pfp.png");
    }

    #[test]
    fn falls_back_to_username_for_display_name() {
        let body = serde_json::json!({
            "0xabc": [{ "fid": 7, "username": "anon", "display_name": "" }]
        });
        let profile = profile_from_response(&body, "0xabc").unwrap();
        assert_eq!(profile.display_name, "anon");
        assert_eq!(profile.pfp, "");
    }

    #[test]
    fn missing_address_or_empty_list_yields_none() {
        let body = serde_json::json!({ "0xother": [] });
        assert!(profile_from_response(&body, "0xabc").is_none());
        assert!(profile_from_response(&body, "0xother").is_none());
    }
}
