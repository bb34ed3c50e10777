//! Configuration management for the hookwire receiver.

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use axum::http::HeaderName;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use hookwire_core::Webhooks;
use serde::{Deserialize, Serialize};

use crate::receiver::{
    ReceiverConfig, RequiredHeaders, DEFAULT_MAX_BODY_BYTES, DEFAULT_PATH,
    DEFAULT_RESPONSE_DEADLINE,
};

const CONFIG_FILE: &str = "config.toml";

/// Receiver configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Only `WEBHOOK_SECRET` has no usable default; loading fails until it is set.
///
/// # Example
///
/// ```no_run
/// use hookwire_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Receiving on {}:{}{}", config.host, config.port, config.webhook_path);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,

    // Receiver
    /// Shared secret used to verify delivery signatures.
    ///
    /// Environment variable: `WEBHOOK_SECRET`
    #[serde(default, alias = "WEBHOOK_SECRET")]
    pub webhook_secret: String,
    /// Path deliveries are POSTed to.
    ///
    /// Environment variable: `WEBHOOK_PATH`
    #[serde(default = "default_webhook_path", alias = "WEBHOOK_PATH")]
    pub webhook_path: String,
    /// Milliseconds to wait for handlers before answering `202`.
    ///
    /// Environment variable: `RESPONSE_DEADLINE_MS`
    #[serde(default = "default_response_deadline_ms", alias = "RESPONSE_DEADLINE_MS")]
    pub response_deadline_ms: u64,
    /// Largest accepted request body in bytes.
    ///
    /// Environment variable: `MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes", alias = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // Headers
    /// Delivery identifier header name.
    ///
    /// Environment variable: `DELIVERY_ID_HEADER`
    #[serde(default = "default_delivery_id_header", alias = "DELIVERY_ID_HEADER")]
    pub delivery_id_header: String,
    /// Event name header name.
    ///
    /// Environment variable: `EVENT_NAME_HEADER`
    #[serde(default = "default_event_name_header", alias = "EVENT_NAME_HEADER")]
    pub event_name_header: String,
    /// Signature header name.
    ///
    /// Environment variable: `SIGNATURE_HEADER`
    #[serde(default = "default_signature_header", alias = "SIGNATURE_HEADER")]
    pub signature_header: String,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Fails if a source cannot be parsed or the result does not validate.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to the receiver's endpoint configuration.
    ///
    /// # Errors
    ///
    /// Fails if a configured header name is not a valid HTTP header name.
    pub fn to_receiver_config(&self) -> Result<ReceiverConfig> {
        let headers = RequiredHeaders {
            delivery_id: parse_header_name(&self.delivery_id_header)?,
            event_name: parse_header_name(&self.event_name_header)?,
            signature: parse_header_name(&self.signature_header)?,
        };

        Ok(ReceiverConfig::default()
            .with_path(self.webhook_path.clone())
            .with_response_deadline(Duration::from_millis(self.response_deadline_ms))
            .with_max_body_bytes(self.max_body_bytes)
            .with_headers(headers))
    }

    /// Build a dispatcher bound to the configured secret.
    pub fn webhooks(&self) -> Webhooks {
        Webhooks::new(self.webhook_secret.as_str())
    }

    /// Parse server socket address from host and port configuration.
    ///
    /// # Errors
    ///
    /// Fails if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.webhook_secret.is_empty() {
            anyhow::bail!("webhook_secret must be set");
        }

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if !self.webhook_path.starts_with('/') {
            anyhow::bail!("webhook_path must start with '/'");
        }

        if self.response_deadline_ms == 0 {
            anyhow::bail!("response_deadline_ms must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        for (field, value) in [
            ("delivery_id_header", &self.delivery_id_header),
            ("event_name_header", &self.event_name_header),
            ("signature_header", &self.signature_header),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{field} must not be empty");
            }
        }

        Ok(())
    }
}

fn parse_header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_str(name).with_context(|| format!("Invalid header name: {name}"))
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.webhook_secret.is_empty() { "" } else { "***" };

        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("webhook_secret", &secret)
            .field("webhook_path", &self.webhook_path)
            .field("response_deadline_ms", &self.response_deadline_ms)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("delivery_id_header", &self.delivery_id_header)
            .field("event_name_header", &self.event_name_header)
            .field("signature_header", &self.signature_header)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_secret: String::new(),
            webhook_path: default_webhook_path(),
            response_deadline_ms: default_response_deadline_ms(),
            max_body_bytes: default_max_body_bytes(),
            delivery_id_header: default_delivery_id_header(),
            event_name_header: default_event_name_header(),
            signature_header: default_signature_header(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_response_deadline_ms() -> u64 {
    u64::try_from(DEFAULT_RESPONSE_DEADLINE.as_millis()).unwrap_or(u64::MAX)
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_delivery_id_header() -> String {
    RequiredHeaders::default().delivery_id.as_str().to_string()
}

fn default_event_name_header() -> String {
    RequiredHeaders::default().event_name.as_str().to_string()
}

fn default_signature_header() -> String {
    RequiredHeaders::default().signature.as_str().to_string()
}

fn default_log_level() -> String {
    "info,hookwire=debug,tower_http=debug".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, env, sync::Mutex};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        vars: Vec<String>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self { _lock: lock, vars: Vec::new(), originals: HashMap::new() }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            if !self.vars.contains(&key.to_string()) {
                self.originals.insert(key.to_string(), env::var(key).ok());
                self.vars.push(key.to_string());
            }
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                match self.originals.get(var) {
                    Some(Some(value)) => env::set_var(var, value),
                    Some(None) => env::remove_var(var),
                    None => {},
                }
            }
        }
    }

    fn valid_config() -> Config {
        Config { webhook_secret: "mySecret".to_string(), ..Config::default() }
    }

    #[test]
    fn defaults_match_github_conventions() {
        let config = valid_config();

        assert!(config.validate().is_ok());
        assert_eq!(config.webhook_path, "/api/github/webhooks");
        assert_eq!(config.response_deadline_ms, 9000);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.delivery_id_header, "x-github-delivery");
        assert_eq!(config.event_name_header, "x-github-event");
        assert_eq!(config.signature_header, "x-hub-signature-256");
    }

    #[test]
    fn default_config_without_secret_is_rejected() {
        let error = Config::default().validate().unwrap_err();

        assert!(error.to_string().contains("webhook_secret"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("WEBHOOK_SECRET", "from-env");
        guard.set_var("PORT", "9090");
        guard.set_var("WEBHOOK_PATH", "/hooks");
        guard.set_var("RESPONSE_DEADLINE_MS", "2500");
        guard.set_var("SIGNATURE_HEADER", "X-Signature");

        let config = Config::load().expect("Config should load with env overrides");

        assert_eq!(config.webhook_secret, "from-env");
        assert_eq!(config.port, 9090);
        assert_eq!(config.webhook_path, "/hooks");
        assert_eq!(config.response_deadline_ms, 2500);
        assert_eq!(config.signature_header, "X-Signature");
    }

    #[test]
    fn invalid_config_validation_fails() {
        let mut config = valid_config();
        config.port = 0;
        assert!(config.validate().is_err());

        config = valid_config();
        config.webhook_path = "hooks".to_string();
        assert!(config.validate().is_err());

        config = valid_config();
        config.response_deadline_ms = 0;
        assert!(config.validate().is_err());

        config = valid_config();
        config.max_body_bytes = 0;
        assert!(config.validate().is_err());

        config = valid_config();
        config.event_name_header = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn receiver_config_conversion() {
        let mut config = valid_config();
        config.webhook_path = "/hooks".to_string();
        config.response_deadline_ms = 1500;
        config.max_body_bytes = 1024;
        config.signature_header = "X-Signature".to_string();

        let receiver = config.to_receiver_config().expect("Should convert");

        assert_eq!(receiver.path, "/hooks");
        assert_eq!(receiver.response_deadline, Duration::from_millis(1500));
        assert_eq!(receiver.max_body_bytes, 1024);
        assert_eq!(receiver.headers.signature.as_str(), "x-signature");
        assert_eq!(receiver.headers.delivery_id.as_str(), "x-github-delivery");
    }

    #[test]
    fn invalid_header_name_fails_conversion() {
        let mut config = valid_config();
        config.delivery_id_header = "bad header".to_string();

        assert!(config.to_receiver_config().is_err());
    }

    #[test]
    fn debug_output_masks_secret() {
        let output = format!("{:?}", valid_config());

        assert!(!output.contains("mySecret"));
        assert!(output.contains("***"));
    }

    #[test]
    fn socket_address_parsing() {
        let mut config = valid_config();
        config.host = "127.0.0.1".to_string();
        config.port = 9000;

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
