use std::net::SocketAddr;
use std::time::Duration;

use patstat_quota::TierLimits;
use patstat_sources::RetryPolicy;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// When set, error responses carry internal detail (upstream status
    /// codes, store messages). Leave unset in production.
    #[serde(default)]
    pub debug: bool,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.quota.window_days == 0 {
            return Err("quota.window_days must be > 0".into());
        }
        if self.quota.free == 0 || self.quota.basic == 0 || self.quota.pro == 0 {
            return Err("quota limits must be > 0".into());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if let Some(ref epo) = self.sources.epo {
            Url::parse(&epo.base_url).map_err(|e| format!("sources.epo.base_url: {e}"))?;
            if epo.consumer_key.is_empty() || epo.consumer_secret.is_empty() {
                return Err("sources.epo requires consumer_key and consumer_secret".into());
            }
        }
        if let Some(ref uspto) = self.sources.uspto {
            Url::parse(&uspto.base_url).map_err(|e| format!("sources.uspto.base_url: {e}"))?;
        }
        if self.sources.lens.enabled {
            Url::parse(&self.sources.lens.base_url)
                .map_err(|e| format!("sources.lens.base_url: {e}"))?;
            if self.sources.lens.api_token.is_empty() {
                return Err("sources.lens.enabled=true requires sources.lens.api_token".into());
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness TTL for cached records, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Request quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Monthly budget for the free tier.
    #[serde(default = "default_quota_free")]
    pub free: u64,
    /// Monthly budget for the basic tier.
    #[serde(default = "default_quota_basic")]
    pub basic: u64,
    /// Monthly budget for the pro tier.
    #[serde(default = "default_quota_pro")]
    pub pro: u64,
    /// Window length in days.
    #[serde(default = "default_quota_window_days")]
    pub window_days: u64,
    /// Headers consulted, in order, for the caller credential. The first
    /// one present wins; with none present the client IP is used instead.
    #[serde(default = "default_credential_headers")]
    pub credential_headers: Vec<String>,
    /// Header carrying the caller's subscription tier label.
    #[serde(default = "default_tier_header")]
    pub tier_header: String,
}

fn default_quota_free() -> u64 {
    20
}
fn default_quota_basic() -> u64 {
    1_000
}
fn default_quota_pro() -> u64 {
    10_000
}
fn default_quota_window_days() -> u64 {
    30
}
fn default_credential_headers() -> Vec<String> {
    vec![
        "X-RapidAPI-Proxy-Secret".into(),
        "X-RapidAPI-Key".into(),
    ]
}
fn default_tier_header() -> String {
    "X-RapidAPI-Subscription".into()
}

impl QuotaConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_days * 24 * 60 * 60)
    }

    pub fn tier_limits(&self) -> TierLimits {
        TierLimits {
            free: self.free,
            basic: self.basic,
            pro: self.pro,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free: default_quota_free(),
            basic: default_quota_basic(),
            pro: default_quota_pro(),
            window_days: default_quota_window_days(),
            credential_headers: default_credential_headers(),
            tier_header: default_tier_header(),
        }
    }
}

/// External source configuration. An absent section leaves that source out
/// of the adapter registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub epo: Option<EpoSettings>,
    #[serde(default)]
    pub uspto: Option<UsptoSettings>,
    #[serde(default)]
    pub lens: LensSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpoSettings {
    #[serde(default = "default_epo_base_url")]
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_epo_base_url() -> String {
    "https://ops.epo.org/3.2".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsptoSettings {
    #[serde(default = "default_uspto_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_uspto_base_url() -> String {
    "https://developer.uspto.gov/ds-api".into()
}

/// Lens stays configured but disabled by default; flipping `enabled` is a
/// configuration change, not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LensSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_lens_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_lens_base_url() -> String {
    "https://api.lens.org/patent/search".into()
}

fn default_source_timeout_ms() -> u64 {
    30_000
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_lens_base_url(),
            api_token: String::new(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// Source fetch retry configuration, shared across adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_retry_max_delay_ms() -> u64 {
    10_000
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("patstat.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g. PATSTAT__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("PATSTAT")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
