//! Gateway configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HEARTH_*)
//! 2. TOML config file (if HEARTH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Gateway configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HEARTH_*)
/// 2. TOML config file (if HEARTH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the gateway listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Base URL of the site origin the gateway fronts.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache generation tag. Bumping it makes activation garbage
    /// collection drop every partition of the previous generation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Maximum entries in the static partition.
    #[serde(default = "default_static_max")]
    pub static_max_entries: usize,

    /// Maximum entries in the dynamic partition.
    #[serde(default = "default_dynamic_max")]
    pub dynamic_max_entries: usize,

    /// Maximum entries in the image partition.
    #[serde(default = "default_image_max")]
    pub image_max_entries: usize,

    /// Interval between trim sweeps, in milliseconds.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per upstream response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Assets cached into the static partition at install time.
    ///
    /// Relative entries are resolved against `origin`; absolute entries
    /// (CDN scripts, web fonts) are fetched as-is.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// URL fragments routed network-first into the dynamic partition.
    #[serde(default = "default_network_first_prefixes")]
    pub network_first_prefixes: Vec<String>,

    /// URL fragments treated as static assets (stale-while-revalidate).
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Resend API key for the contact-form relay.
    ///
    /// Required only when POST /api/send-email is called.
    #[serde(default)]
    pub resend_api_key: Option<String>,

    /// Sender address for inquiry emails.
    #[serde(default = "default_inquiry_from")]
    pub inquiry_from: String,

    /// Destination inbox for inquiry emails.
    #[serde(default = "default_inquiry_to")]
    pub inquiry_to: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_origin() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./hearth-cache.sqlite")
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_static_max() -> usize {
    50
}

fn default_dynamic_max() -> usize {
    100
}

fn default_image_max() -> usize {
    200
}

fn default_sweep_interval_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_user_agent() -> String {
    "hearth/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/assets/css/styles.css",
        "/assets/js/main.js",
        "/assets/js/animations.js",
        "/manifest.json",
        "https://cdn.tailwindcss.com",
        "https://unpkg.com/alpinejs@3.x.x/dist/cdn.min.js",
        "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700;800;900&family=Playfair+Display:wght@400;600;700&family=Lobster&display=swap",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_network_first_prefixes() -> Vec<String> {
    ["/api/", "/booking/", "/contact/"].iter().map(|s| s.to_string()).collect()
}

fn default_static_prefixes() -> Vec<String> {
    ["/assets/images/", "https://fonts.gstatic.com/", "https://fonts.googleapis.com/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_inquiry_from() -> String {
    "The Stove Specialist <onboarding@resend.dev>".into()
}

fn default_inquiry_to() -> String {
    "info@thestovespecialist.com.au".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            origin: default_origin(),
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            static_max_entries: default_static_max(),
            dynamic_max_entries: default_dynamic_max(),
            image_max_entries: default_image_max(),
            sweep_interval_ms: default_sweep_interval_ms(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            precache: default_precache(),
            network_first_prefixes: default_network_first_prefixes(),
            static_prefixes: default_static_prefixes(),
            resend_api_key: None,
            inquiry_from: default_inquiry_from(),
            inquiry_to: default_inquiry_to(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Trim sweep interval as Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HEARTH_`
    /// 2. TOML file from `HEARTH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HEARTH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HEARTH_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the Resend API key is available (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_resend_api_key(&self) -> Result<&str, ConfigError> {
        self.resend_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "resend_api_key".into(),
            hint: "Set HEARTH_RESEND_API_KEY environment variable".into(),
        })
    }
}
