//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Shortest interval the periodic reconciliation trigger may use (24 hours).
pub const MIN_PERIODIC_SYNC_SECS: u64 = 24 * 60 * 60;

/// Service configuration parameters.
///
/// Scalar values can be configured via environment variables with sensible
/// defaults. The resource and routing lists are fixed per deployment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Origin that origin-form request targets are resolved against
    pub app_origin: String,
    /// Deployed cache version, embedded in every partition name
    pub cache_version: String,
    /// Directory partitions are written through to (None = memory only)
    pub storage_dir: Option<PathBuf>,
    /// Network-first timeout in milliseconds
    pub network_timeout_ms: u64,
    /// Periodic reconciliation interval in seconds (never below 24h)
    pub periodic_sync_secs: u64,
    /// Base URL of the prayer-times provider
    pub prayer_api_base: String,
    /// Calculation method passed to the prayer-times provider
    pub prayer_method: u32,
    /// Hostname fragments identifying data-provider requests
    pub api_host_patterns: Vec<String>,
    /// Path fragments identifying data-provider requests
    pub api_path_patterns: Vec<String>,
    /// File extensions served cache-first
    pub static_extensions: Vec<String>,
    /// Navigable routes served stale-while-revalidate (the root is implicit)
    pub app_pages: Vec<String>,
    /// Resources seeded into the static partition at install
    pub core_resources: Vec<String>,
    /// Third-party resources seeded into the static partition at install
    pub external_resources: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `APP_ORIGIN` - Application origin (default: http://localhost:8080)
    /// - `CACHE_VERSION` - Partition version tag (default: 1.2.0)
    /// - `STORAGE_DIR` - Write-through directory (default: unset, memory only)
    /// - `NETWORK_TIMEOUT_MS` - Network-first timeout (default: 5000)
    /// - `PERIODIC_SYNC_SECS` - Periodic sync interval (default and minimum: 86400)
    /// - `PRAYER_API_BASE` - Prayer-times provider (default: https://api.aladhan.com)
    /// - `PRAYER_METHOD` - Prayer calculation method (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            app_origin: env::var("APP_ORIGIN").unwrap_or(defaults.app_origin),
            cache_version: env::var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            storage_dir: env::var("STORAGE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            network_timeout_ms: env_or("NETWORK_TIMEOUT_MS", defaults.network_timeout_ms),
            periodic_sync_secs: env_or("PERIODIC_SYNC_SECS", defaults.periodic_sync_secs)
                .max(MIN_PERIODIC_SYNC_SECS),
            prayer_api_base: env::var("PRAYER_API_BASE").unwrap_or(defaults.prayer_api_base),
            prayer_method: env_or("PRAYER_METHOD", defaults.prayer_method),
            ..defaults
        }
    }

    /// Name of the partition holding static assets.
    pub fn static_partition(&self) -> String {
        format!("static-cache-v{}", self.cache_version)
    }

    /// Name of the partition holding app pages.
    pub fn dynamic_partition(&self) -> String {
        format!("dynamic-cache-v{}", self.cache_version)
    }

    /// Name of the partition holding API data and reserved state keys.
    pub fn data_partition(&self) -> String {
        format!("data-cache-v{}", self.cache_version)
    }

    /// Name of the partition holding the offline seed record.
    pub fn offline_partition(&self) -> String {
        format!("offline-cache-v{}", self.cache_version)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            app_origin: "http://localhost:8080".to_string(),
            cache_version: "1.2.0".to_string(),
            storage_dir: None,
            network_timeout_ms: 5000,
            periodic_sync_secs: MIN_PERIODIC_SYNC_SECS,
            prayer_api_base: "https://api.aladhan.com".to_string(),
            prayer_method: 5,
            api_host_patterns: strings(&["api", "aladhan.com", "mp3quran.net", "hadith.gading.dev"]),
            api_path_patterns: strings(&["/api/"]),
            static_extensions: strings(&[
                "css", "js", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf",
                "mp3", "webp",
            ]),
            app_pages: strings(&[
                "/adhkar", "/hadith", "/tasbih", "/duas", "/radio", "/settings", "/quran",
            ]),
            core_resources: strings(&[
                "/",
                "/static/js/bundle.js",
                "/static/css/main.css",
                "/manifest.json",
                "/icons/app-icon.png",
                "/mecca_athan.mp3",
            ]),
            external_resources: strings(&[
                "https://fonts.googleapis.com/css2?family=Amiri:wght@400;700&display=swap",
            ]),
        }
    }
}
