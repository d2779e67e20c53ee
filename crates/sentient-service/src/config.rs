//! Service configuration.

use std::path::Path;

use serde::Deserialize;

use sentient_core::UserId;
use sentient_store::schema::bucket;

/// Public Discord invite released to verified subscribers.
pub const DEFAULT_DISCORD_INVITE_URL: &str = "https://discord.gg/sentientmarkets";

/// Receiving wallet for manual USDT transfers.
pub const DEFAULT_USDT_WALLET_ADDRESS: &str = "TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE";

/// Network the wallet address lives on.
pub const DEFAULT_USDT_NETWORK: &str = "TRC20";

/// Signing secret used by the in-memory identity provider when none is set.
pub const DEV_JWT_SECRET: &str = "sentient-local-development-secret";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Supabase project URL. Without it the service runs on in-memory backends.
    pub supabase_url: Option<String>,

    /// Supabase anon (public) API key.
    pub supabase_anon_key: Option<String>,

    /// Secret that signs session JWTs (HS256).
    ///
    /// When unset in Supabase mode, tokens are validated by asking the auth
    /// server instead.
    pub jwt_secret: Option<String>,

    /// Storage bucket for proof-of-payment uploads.
    pub proof_bucket: String,

    /// Public URL of the web front end (password reset redirects land here).
    pub site_url: String,

    /// Invite link shown to users with an active subscription.
    pub discord_invite_url: String,

    /// USDT receiving address shown in payment instructions.
    pub usdt_wallet_address: String,

    /// Network of the USDT receiving address.
    pub usdt_network: String,

    /// Users granted the admin role at startup (in-memory mode only).
    pub admin_user_ids: Vec<UserId>,

    /// Addresses granted the admin role when they sign up (in-memory mode only).
    pub admin_emails: Vec<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Supabase secrets file structure.
#[derive(Debug, Deserialize)]
struct SupabaseSecrets {
    url: String,
    anon_key: String,
    #[serde(default)]
    jwt_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (supabase_url, supabase_anon_key, jwt_secret) = load_supabase_secrets();

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            supabase_url,
            supabase_anon_key,
            jwt_secret,
            proof_bucket: env_or("PROOF_BUCKET", defaults.proof_bucket),
            site_url: env_or("SITE_URL", defaults.site_url),
            discord_invite_url: env_or("DISCORD_INVITE_URL", defaults.discord_invite_url),
            usdt_wallet_address: env_or("USDT_WALLET_ADDRESS", defaults.usdt_wallet_address),
            usdt_network: env_or("USDT_NETWORK", defaults.usdt_network),
            admin_user_ids: std::env::var("ADMIN_USER_IDS")
                .map(|ids| parse_user_ids(&ids))
                .unwrap_or_default(),
            admin_emails: std::env::var("ADMIN_EMAILS")
                .map(|emails| parse_emails(&emails))
                .unwrap_or_default(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Supabase URL and anon key, when both are configured.
    #[must_use]
    pub fn supabase(&self) -> Option<(&str, &str)> {
        self.supabase_url
            .as_deref()
            .zip(self.supabase_anon_key.as_deref())
    }

    /// Where password reset emails send the user.
    #[must_use]
    pub fn password_reset_redirect(&self) -> String {
        format!("{}/reset-password", self.site_url.trim_end_matches('/'))
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Parse a comma-separated list of user ids, skipping malformed entries.
fn parse_user_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(value = %s, error = %e, "Ignoring malformed ADMIN_USER_IDS entry");
                None
            }
        })
        .collect()
}

/// Parse a comma-separated list of email addresses, lower-cased.
fn parse_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| s.contains('@'))
        .collect()
}

/// Load Supabase secrets from file or environment.
fn load_supabase_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/supabase.json",
        "../.secrets/supabase.json",
        "../../.secrets/supabase.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<SupabaseSecrets>(path) {
            tracing::info!(path = %path, "Loaded Supabase secrets from file");
            return (Some(secrets.url), Some(secrets.anon_key), secrets.jwt_secret);
        }
    }

    tracing::debug!("Supabase secrets file not found, using environment variables");
    (
        std::env::var("SUPABASE_URL").ok(),
        std::env::var("SUPABASE_ANON_KEY").ok(),
        std::env::var("SUPABASE_JWT_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let contents = std::fs::read_to_string(Path::new(path))?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            supabase_url: None,
            supabase_anon_key: None,
            jwt_secret: None,
            proof_bucket: bucket::PAYMENT_PROOFS.into(),
            site_url: "http://localhost:3000".into(),
            discord_invite_url: DEFAULT_DISCORD_INVITE_URL.into(),
            usdt_wallet_address: DEFAULT_USDT_WALLET_ADDRESS.into(),
            usdt_network: DEFAULT_USDT_NETWORK.into(),
            admin_user_ids: Vec::new(),
            admin_emails: Vec::new(),
            cors_origins: vec!["*".into()],
            // proofs are capped at 5 MiB; leave room for the multipart envelope
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_redirect_joins_site_url() {
        let config = ServiceConfig {
            site_url: "https://sentientmarkets.io/".into(),
            ..ServiceConfig::default()
        };
        assert_eq!(
            config.password_reset_redirect(),
            "https://sentientmarkets.io/reset-password"
        );
    }

    #[test]
    fn admin_ids_skip_garbage() {
        let id = UserId::generate();
        let parsed = parse_user_ids(&format!(" {id} ,not-a-uuid,,"));
        assert_eq!(parsed, vec![id]);
    }

    #[test]
    fn admin_emails_are_normalized() {
        assert_eq!(
            parse_emails(" Ada@Example.com, ,nonsense,ops@example.com"),
            vec!["ada@example.com".to_string(), "ops@example.com".to_string()]
        );
    }

    #[test]
    fn supabase_requires_url_and_key() {
        let mut config = ServiceConfig {
            supabase_url: Some("https://abc.supabase.co".into()),
            ..ServiceConfig::default()
        };
        assert!(config.supabase().is_none());
        config.supabase_anon_key = Some("anon".into());
        assert_eq!(config.supabase(), Some(("https://abc.supabase.co", "anon")));
    }
}
