use serde::Deserialize;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:///./bilcekap.db";
const DEFAULT_LHDN_API_URL: &str = "https://api.ldhn.gov.my";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:8080,http://localhost:5173";

/// Per-IP rate limit applied to the API routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Not read by the validation path; kept so deployments can share one `.env`.
    pub database_url: String,
    pub port: u16,
    pub lhdn_api_url: String,
    pub lhdn_api_key: Option<String>,
    /// Seconds bounding each outbound LHDN call.
    pub lhdn_api_timeout: u64,
    pub secret_key: Option<String>,
    pub cors_origins: Vec<String>,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimit>,
}

impl Config {
    /// Loads the configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8000".to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            lhdn_api_url: parse_base_url(
                var("LHDN_API_URL").unwrap_or_else(|| DEFAULT_LHDN_API_URL.to_string()),
            )?,
            lhdn_api_key: var("LHDN_API_KEY")
                .map(|key| normalize_secret(&key))
                .filter(|key| !key.is_empty()),
            lhdn_api_timeout: var("LHDN_API_TIMEOUT")
                .unwrap_or_else(|| "30".to_string())
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("LHDN_API_TIMEOUT must be a whole number of seconds"))
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("LHDN_API_TIMEOUT must be greater than zero");
                    }
                    Ok(secs)
                })?,
            secret_key: var("SECRET_KEY"),
            cors_origins: var("BACKEND_CORS_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            rate_limit: {
                let per_second = var("RATE_LIMIT_PER_SECOND")
                    .unwrap_or_else(|| "10".to_string())
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a whole number"))?;
                let burst_size = var("RATE_LIMIT_BURST")
                    .unwrap_or_else(|| "20".to_string())
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a whole number"))
                    .and_then(|burst| {
                        if burst == 0 {
                            anyhow::bail!("RATE_LIMIT_BURST must be greater than zero");
                        }
                        Ok(burst)
                    })?;
                (per_second > 0).then_some(RateLimit {
                    per_second,
                    burst_size,
                })
            },
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("LHDN API URL: {}", config.lhdn_api_url);
        tracing::debug!("LHDN API timeout: {}s", config.lhdn_api_timeout);
        if config.lhdn_api_key.is_none() {
            tracing::warn!("LHDN_API_KEY not set; upstream calls will be unauthenticated");
        }
        if config.secret_key.is_none() {
            tracing::debug!("SECRET_KEY not set");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.lhdn_api_timeout)
    }
}

/// Strips whitespace and wrapping quotes that commonly sneak into `.env` files.
fn normalize_secret(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').to_string()
}

fn parse_base_url(raw: String) -> anyhow::Result<String> {
    let url = raw.trim();
    let parsed = url::Url::parse(url)
        .map_err(|e| anyhow::anyhow!("LHDN_API_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("LHDN_API_URL must start with http:// or https://");
    }
    Ok(url.trim_end_matches('/').to_string())
}
