// Server configuration loaded from environment variables
//
// Every setting has a default; a value that fails to parse is logged and
// replaced by its default rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use sessionlog_realtime::{ConnectionOptions, DuplicatePolicy};

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 10;
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Realtime (WebSocket) settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// Per-connection outbound queue length.
    pub outbound_buffer: usize,
    pub idle_timeout: Option<Duration>,
    pub max_message_bytes: usize,
    /// Announce joins and leaves to all connected clients.
    pub presence: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Replace,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            idle_timeout: None,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            presence: false,
        }
    }
}

impl RealtimeConfig {
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            idle_timeout: self.idle_timeout,
            max_message_bytes: self.max_message_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection string. Unset means in-memory dev mode.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Prefix for the `/v1` routes, e.g. "/api".
    pub api_prefix: String,
    pub cors_origins: Vec<HeaderValue>,
    pub realtime: RealtimeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            database_max_connections: DEFAULT_MAX_DB_CONNECTIONS,
            api_prefix: String::new(),
            cors_origins: Vec::new(),
            realtime: RealtimeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let realtime = RealtimeConfig {
            duplicate_policy: parse_or(
                "REALTIME_DUPLICATE_POLICY",
                get("REALTIME_DUPLICATE_POLICY"),
                defaults.realtime.duplicate_policy,
            ),
            outbound_buffer: parse_or(
                "REALTIME_OUTBOUND_BUFFER",
                get("REALTIME_OUTBOUND_BUFFER"),
                defaults.realtime.outbound_buffer,
            )
            .max(1),
            idle_timeout: get("REALTIME_IDLE_TIMEOUT_SECS")
                .and_then(|v| parse_opt::<u64>("REALTIME_IDLE_TIMEOUT_SECS", &v))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_message_bytes: parse_or(
                "REALTIME_MAX_MESSAGE_BYTES",
                get("REALTIME_MAX_MESSAGE_BYTES"),
                defaults.realtime.max_message_bytes,
            ),
            presence: parse_bool(get("REALTIME_PRESENCE").as_deref()),
        };

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port),
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            ),
            api_prefix: get("API_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or_default(),
            // Example: CORS_ALLOWED_ORIGINS="https://app.example.com,https://admin.example.com"
            cors_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
                .unwrap_or_default(),
            realtime,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_opt<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = raw, "Invalid configuration value, using default");
            None
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    raw.and_then(|v| parse_opt(key, &v)).unwrap_or(default)
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// "/api/" and "api" both become "/api".
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.api_prefix, "");
        assert!(cfg.cors_origins.is_empty());
        assert_eq!(cfg.realtime, RealtimeConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/sessionlog"),
            ("API_PREFIX", "api/"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com"),
            ("REALTIME_DUPLICATE_POLICY", "reject"),
            ("REALTIME_OUTBOUND_BUFFER", "32"),
            ("REALTIME_IDLE_TIMEOUT_SECS", "90"),
            ("REALTIME_PRESENCE", "true"),
        ]);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(
            cfg.database_url.as_deref(),
            Some("postgres://localhost/sessionlog")
        );
        assert_eq!(cfg.api_prefix, "/api");
        assert_eq!(cfg.cors_origins.len(), 2);
        assert_eq!(cfg.realtime.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(cfg.realtime.outbound_buffer, 32);
        assert_eq!(cfg.realtime.idle_timeout, Some(Duration::from_secs(90)));
        assert!(cfg.realtime.presence);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[
            ("PORT", "not-a-port"),
            ("DATABASE_MAX_CONNECTIONS", "-3"),
            ("REALTIME_DUPLICATE_POLICY", "maybe"),
            ("REALTIME_IDLE_TIMEOUT_SECS", "0"),
            ("DATABASE_URL", "   "),
        ]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.database_max_connections, DEFAULT_MAX_DB_CONNECTIONS);
        assert_eq!(cfg.realtime.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(cfg.realtime.idle_timeout, None);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix("/"), "");
    }
}
