/// Application configuration module
use anyhow::Context;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WMS_URL: &str = "https://droughtwatch.icpac.net/mapserver/mukau/php/gis/mswms.php";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub root_url: String,
    pub query_service_url: String,
    pub query_timeout: Duration,
    pub wms_url: String,
    pub catalog_path: Option<PathBuf>,
    pub auth_header: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            root_url: "/drought-watch".to_string(),
            query_service_url: "http://127.0.0.1:8090".to_string(),
            query_timeout: Duration::from_secs(60),
            wms_url: DEFAULT_WMS_URL.to_string(),
            catalog_path: None,
            auth_header: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match non_empty(&lookup, "DROUGHT_WATCH_BIND") {
            Some(s) => s
                .parse()
                .with_context(|| format!("DROUGHT_WATCH_BIND is not a socket address: {s}"))?,
            None => defaults.bind_addr,
        };

        let root_url = non_empty(&lookup, "DROUGHT_WATCH_ROOT_URL")
            .map(|s| normalize_root(&s))
            .unwrap_or(defaults.root_url);

        let query_service_url = non_empty(&lookup, "EE_HELPER_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.query_service_url);

        let query_timeout = Duration::from_secs(env_u64(&lookup, "EE_HELPER_TIMEOUT_SECONDS", 60));

        let wms_url = non_empty(&lookup, "CDI_WMS_URL").unwrap_or(defaults.wms_url);

        let catalog_path = non_empty(&lookup, "DROUGHT_WATCH_CATALOG_PATH").map(PathBuf::from);

        let auth_header = non_empty(&lookup, "DROUGHT_WATCH_AUTH_HEADER")
            .map(|s| s.to_ascii_lowercase());

        Ok(Self {
            bind_addr,
            root_url,
            query_service_url,
            query_timeout,
            wms_url,
            catalog_path,
            auth_header,
        })
    }
}

/// Root path always starts with `/` and never ends with one; the bare root is `""`
fn normalize_root(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Positive integer from the lookup; zero and garbage fall back to `default`
fn env_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
