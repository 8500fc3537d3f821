use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.linkedin.com";
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://www.linkedin.com/oauth/v2";
/// Upper bound of `LEAD_LOOKBACK_DAYS` (ten years).
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Value sent in the `LinkedIn-Version` header (e.g. `202406`).
    pub api_version: String,
    pub webhook_url: Option<String>,
    /// Account synced when `/sync_leads` is called without `account_id`.
    pub cmt_account_id: Option<String>,
    pub secret_key: Option<String>,
    pub api_base_url: String,
    pub oauth_base_url: String,
    pub request_timeout_secs: u64,
    pub lead_lookback_days: i64,
    /// CSV export target; `None` disables the export.
    pub export_path: Option<String>,
    pub session_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let required = |key: &str| {
            lookup(key)
                .ok_or_else(|| anyhow::anyhow!("{} environment variable required", key))
                .and_then(|value| {
                    if value.trim().is_empty() {
                        anyhow::bail!("{} cannot be empty", key);
                    }
                    Ok(value)
                })
        };

        let config = Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            redirect_uri: required("REDIRECT_URI").and_then(|uri| {
                if !uri.starts_with("http://") && !uri.starts_with("https://") {
                    anyhow::bail!("REDIRECT_URI must start with http:// or https://");
                }
                Ok(uri)
            })?,
            api_version: required("API_VERSION")?,
            webhook_url: optional("WEBHOOK_URL")
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("WEBHOOK_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?,
            cmt_account_id: optional("CMT_ACCOUNT_ID"),
            secret_key: optional("SECRET_KEY"),
            api_base_url: optional("LINKEDIN_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            oauth_base_url: optional("LINKEDIN_OAUTH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OAUTH_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: optional("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a positive number"))?,
            lead_lookback_days: optional("LEAD_LOOKBACK_DAYS")
                .unwrap_or_else(|| "180".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LEAD_LOOKBACK_DAYS must be a number"))?,
            // Unset means the default file; set-but-blank disables the export.
            export_path: match lookup("EXPORT_PATH") {
                None => Some("leads.csv".to_string()),
                Some(path) if path.trim().is_empty() => None,
                Some(path) => Some(path),
            },
            session_ttl_secs: optional("SESSION_TTL_SECS")
                .unwrap_or_else(|| "28800".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SESSION_TTL_SECS must be a positive number"))?,
        };

        if config.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if config.lead_lookback_days <= 0 {
            anyhow::bail!("LEAD_LOOKBACK_DAYS must be greater than zero");
        }
        if config.lead_lookback_days > MAX_LOOKBACK_DAYS {
            anyhow::bail!("LEAD_LOOKBACK_DAYS must be at most {}", MAX_LOOKBACK_DAYS);
        }

        // Secrets stay out of the logs
        tracing::debug!("LinkedIn API base URL: {}", config.api_base_url);
        tracing::debug!("LinkedIn OAuth base URL: {}", config.oauth_base_url);
        tracing::debug!("API version: {}", config.api_version);
        tracing::debug!("Redirect URI: {}", config.redirect_uri);
        match config.webhook_url {
            Some(ref url) => tracing::info!("Webhook URL configured: {}", url),
            None => tracing::warn!("WEBHOOK_URL not set, synced leads will not be forwarded"),
        }
        if config.secret_key.is_none() {
            tracing::warn!("SECRET_KEY not set, sessions will not survive a restart");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
