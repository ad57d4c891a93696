//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `INKSTAND_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `INKSTAND_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `INKSTAND_IDENTITY__JWT_SECRET=...` sets the `identity.jwt_secret` field.
//!
//! ## Configuration Structure
//!
//! Key sections:
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Identity**: `identity.url`, `identity.api_key`, `identity.jwt_secret` - the external
//!   auth service that issues and refreshes sessions
//! - **Profile store**: `profile_store.url`, `profile_store.service_key` - the data service's
//!   REST row interface holding profile records
//! - **Sessions**: `auth.session.*` - cookie names and attributes
//! - **CORS**: `auth.security.cors` - browser client configuration
//!
//! Validation runs once at load time; a missing JWT secret or service key is a startup
//! failure, never a per-request one.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "INKSTAND_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Public URL where the platform is reachable (used in identity redirect links)
    pub site_url: String,
    /// Identity service connection settings
    pub identity: IdentityConfig,
    /// Profile store connection settings
    pub profile_store: ProfileStoreConfig,
    /// Session cookie and browser security settings
    pub auth: AuthConfig,
}

/// Identity service configuration.
///
/// The identity service owns credentials and session issuance. The gateway
/// verifies its HS256 access tokens locally using `jwt_secret`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Base URL of the identity service API
    pub url: Url,
    /// Publishable API key sent with every identity request
    pub api_key: String,
    /// Shared secret the identity service signs access tokens with (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Per-request timeout for identity calls
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:9999").unwrap(),
            api_key: String::new(),
            jwt_secret: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Profile store configuration.
///
/// Points at the data service's REST row interface. The service key grants
/// row access independent of the caller's own session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileStoreConfig {
    /// Base URL of the data service's REST interface
    pub url: Url,
    /// Service key used for row reads and writes
    pub service_key: String,
    /// Per-request timeout for profile store calls
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:3000").unwrap(),
            service_key: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session cookie configuration
    pub session: SessionConfig,
    /// Security settings (CORS, etc.)
    pub security: SecurityConfig,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name for the JWT access token
    pub access_cookie_name: String,
    /// Cookie name for the opaque refresh token
    pub refresh_cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
    /// How long the refresh cookie is kept by the browser
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_cookie_name: "ink_access_token".to_string(),
            refresh_cookie_name: "ink_refresh_token".to_string(),
            cookie_secure: true,
            cookie_same_site: "lax".to_string(),
            refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
        }
    }
}

/// Security configuration for browser clients.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// CORS configuration
    pub cors: CorsConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("http://localhost:5173").unwrap()), // Development frontend (Vite)
            ],
            allow_credentials: true,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            site_url: "http://localhost:8090".to_string(),
            identity: IdentityConfig::default(),
            profile_store: ProfileStoreConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("INKSTAND_").split("__"))
    }

    /// Check invariants that would otherwise only blow up mid-request.
    /// Called once at load time; failures here abort startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.identity.jwt_secret {
            None => anyhow::bail!("identity.jwt_secret is required to verify session tokens"),
            Some(secret) if secret.is_empty() => {
                anyhow::bail!("identity.jwt_secret must not be empty")
            }
            Some(_) => {}
        }
        if self.identity.api_key.is_empty() {
            anyhow::bail!("identity.api_key is required");
        }
        if self.profile_store.service_key.is_empty() {
            anyhow::bail!("profile_store.service_key is required");
        }
        Ok(())
    }

    /// The address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The identity JWT secret. Only call after `validate()` has passed.
    pub(crate) fn jwt_secret(&self) -> &str {
        self.identity.jwt_secret.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fails_validation_without_secrets() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_passes_with_secrets_set() {
        let mut config = Config::default();
        config.identity.jwt_secret = Some("secret".to_string());
        config.identity.api_key = "anon".to_string();
        config.profile_store.service_key = "service".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn env_overrides_nested_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 9000\nidentity:\n  api_key: from-yaml\n")?;
            jail.set_env("INKSTAND_IDENTITY__JWT_SECRET", "from-env");
            jail.set_env("INKSTAND_PROFILE_STORE__SERVICE_KEY", "from-env");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.port, 9000);
            assert_eq!(config.identity.api_key, "from-yaml");
            assert_eq!(config.identity.jwt_secret.as_deref(), Some("from-env"));
            Ok(())
        });
    }

    #[test]
    fn bind_address_combines_host_and_port() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8090");
    }
}
