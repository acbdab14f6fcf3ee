//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SITE_BASE_URL` - Public URL of the site (used for cookies, sitemap, canonical links)
//! - `SITE_SESSION_SECRET` - HMAC key for admin session tokens (min 32 chars, high entropy)
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC hash of the admin password (`staffline hash-password`)
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SESSION_TTL_HOURS` - Admin session lifetime, 1 to 8760 (default: 8)
//! - `TRUSTED_PROXY_HEADER` - Header set by the proxy in front of the site that
//!   carries the client IP (e.g. `x-vercel-forwarded-for`). Unset: the
//!   connection address is used and all proxy headers are ignored.
//! - `LOGIN_MAX_ATTEMPTS` - Failed logins per IP before lockout (default: 5)
//! - `LOGIN_WINDOW_SECS` - Lockout window (default: 900)
//! - `CONTENT_CACHE_TTL_SECS` - Content read cache lifetime (default: 60)
//! - `MAX_UPLOAD_BYTES` - Maximum image upload size (default: 10 MiB)
//! - `BLOB_READ_WRITE_TOKEN` - Vercel Blob token; selects the Vercel Blob backend
//! - `BLOB_API_URL` - Vercel Blob API base (default: <https://blob.vercel-storage.com>)
//! - `LOCAL_CONTENT_DIR` - Directory for the local backend (default: ./data)
//! - `GITHUB_TOKEN` / `GITHUB_REPO` - Content repository for images (`owner/repo`)
//! - `GITHUB_BRANCH` - Branch to commit to (default: main)
//! - `GITHUB_API_URL` - GitHub API base (default: <https://api.github.com>)
//! - `GITHUB_PUBLIC_BASE_URL` - Public base URL for committed files (e.g. a CDN)
//! - `STATIC_DIR` - Static asset directory (default: crates/site/static)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderName;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Vercel Blob API endpoint.
pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";

/// Default GitHub REST API endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site, without trailing slash
    pub base_url: String,
    /// HMAC key for admin session tokens
    pub session_secret: SecretString,
    /// Argon2 PHC hash of the admin password
    pub admin_password_hash: SecretString,
    /// Lifetime of an admin session token
    pub session_ttl: Duration,
    /// Failed-login throttling
    pub login: LoginConfig,
    /// Proxy header trusted for the client IP
    pub trusted_proxy_header: Option<HeaderName>,
    /// Lifetime of cached content documents
    pub content_cache_ttl: Duration,
    /// Maximum accepted image upload size in bytes
    pub max_upload_bytes: usize,
    /// Blob storage backend
    pub storage: StorageConfig,
    /// Git content repository for uploaded images
    pub github: Option<GitHubConfig>,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Failed-login throttling configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoginConfig {
    /// Failed attempts allowed per client IP within the window
    pub max_attempts: u32,
    /// Window after the first failure during which attempts are counted
    pub window: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Blob storage backend selection.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub enum StorageConfig {
    /// Vercel Blob REST API.
    Vercel {
        /// API base URL
        api_url: String,
        /// Read/write token
        token: SecretString,
    },
    /// Local directory (development and tests).
    Local {
        /// Root directory of the store
        root: PathBuf,
    },
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vercel { api_url, .. } => f
                .debug_struct("Vercel")
                .field("api_url", api_url)
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Local { root } => f.debug_struct("Local").field("root", root).finish(),
        }
    }
}

/// GitHub content repository configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct GitHubConfig {
    /// Personal access token with `contents:write`
    pub token: SecretString,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch to commit to
    pub branch: String,
    /// REST API base URL
    pub api_url: String,
    /// Base URL under which committed files are publicly served
    pub public_base_url: Option<String>,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("SITE_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("SITE_PORT", "3000")?;
        let base_url = get_required_env("SITE_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_BASE_URL".to_string(), e.to_string()))?;

        let session_secret = get_validated_secret("SITE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SITE_SESSION_SECRET")?;

        let admin_password_hash = get_password_hash("ADMIN_PASSWORD_HASH")?;

        let session_ttl = session_ttl_from_hours(parse_env_or_default("SESSION_TTL_HOURS", "8")?)?;
        let trusted_proxy_header =
            parse_trusted_proxy_header(get_optional_env("TRUSTED_PROXY_HEADER").as_deref())?;
        let login = LoginConfig {
            max_attempts: parse_env_or_default("LOGIN_MAX_ATTEMPTS", "5")?,
            window: Duration::from_secs(parse_env_or_default("LOGIN_WINDOW_SECS", "900")?),
        };
        let content_cache_ttl =
            Duration::from_secs(parse_env_or_default("CONTENT_CACHE_TTL_SECS", "60")?);
        let max_upload_bytes = parse_env_or_default("MAX_UPLOAD_BYTES", "10485760")?;

        let storage = StorageConfig::from_env();
        let github = GitHubConfig::from_env()?;
        let static_dir = PathBuf::from(get_env_or_default("STATIC_DIR", "crates/site/static"));
        let log_json = get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            admin_password_hash,
            session_ttl,
            login,
            trusted_proxy_header,
            content_cache_ttl,
            max_upload_bytes,
            storage,
            github,
            static_dir,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS (controls the `Secure` cookie flag).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StorageConfig {
    /// Select the backend: Vercel Blob when a token is present, else a local directory.
    #[must_use]
    pub fn from_env() -> Self {
        match get_optional_env("BLOB_READ_WRITE_TOKEN") {
            Some(token) if !token.trim().is_empty() => Self::Vercel {
                api_url: get_env_or_default("BLOB_API_URL", DEFAULT_BLOB_API_URL)
                    .trim_end_matches('/')
                    .to_string(),
                token: SecretString::from(token),
            },
            _ => Self::Local {
                root: PathBuf::from(get_env_or_default("LOCAL_CONTENT_DIR", "./data")),
            },
        }
    }
}

impl GitHubConfig {
    /// Load the GitHub configuration if both `GITHUB_TOKEN` and `GITHUB_REPO` are set.
    ///
    /// # Errors
    ///
    /// Returns an error if `GITHUB_REPO` is not of the form `owner/repo`.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(token), Some(repo)) = (get_optional_env("GITHUB_TOKEN"), get_optional_env("GITHUB_REPO"))
        else {
            return Ok(None);
        };

        let (owner, repo) = parse_repo(&repo)
            .ok_or_else(|| ConfigError::InvalidEnvVar("GITHUB_REPO".to_string(), "expected owner/repo".to_string()))?;

        Ok(Some(Self {
            token: SecretString::from(token),
            owner,
            repo,
            branch: get_env_or_default("GITHUB_BRANCH", "main"),
            api_url: get_env_or_default("GITHUB_API_URL", DEFAULT_GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
            public_base_url: get_optional_env("GITHUB_PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Split `owner/repo` into its parts.
fn parse_repo(value: &str) -> Option<(String, String)> {
    let (owner, repo) = value.trim().split_once('/')?;
    let repo = repo.trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable with a default value.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Session lifetime from `SESSION_TTL_HOURS`.
fn session_ttl_from_hours(hours: u64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::InvalidEnvVar(
            "SESSION_TTL_HOURS".to_string(),
            format!("must be between 1 and {MAX_SESSION_TTL_HOURS} (got {hours})"),
        ));
    }
    Ok(Duration::from_secs(hours * 60 * 60))
}

/// Parse `TRUSTED_PROXY_HEADER`; blank means none.
fn parse_trusted_proxy_header(value: Option<&str>) -> Result<Option<HeaderName>, ConfigError> {
    let Some(name) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    HeaderName::try_from(name.to_ascii_lowercase())
        .map(Some)
        .map_err(|e| ConfigError::InvalidEnvVar("TRUSTED_PROXY_HEADER".to_string(), e.to_string()))
}

/// Load the admin password hash and check it is a valid PHC string.
fn get_password_hash(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    argon2::PasswordHash::new(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(SecretString::from(value.trim().to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ttl_bounds() {
        assert_eq!(
            session_ttl_from_hours(8).unwrap(),
            Duration::from_secs(8 * 60 * 60)
        );
        assert_eq!(
            session_ttl_from_hours(MAX_SESSION_TTL_HOURS).unwrap(),
            Duration::from_secs(MAX_SESSION_TTL_HOURS * 60 * 60)
        );
        assert!(matches!(
            session_ttl_from_hours(0),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        // Would overflow `hours * 3600`
        assert!(matches!(
            session_ttl_from_hours(u64::MAX),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_parse_trusted_proxy_header() {
        assert!(parse_trusted_proxy_header(None).unwrap().is_none());
        assert!(parse_trusted_proxy_header(Some("  ")).unwrap().is_none());
        assert_eq!(
            parse_trusted_proxy_header(Some("X-Vercel-Forwarded-For")).unwrap(),
            Some(HeaderName::from_static("x-vercel-forwarded-for"))
        );
        assert!(parse_trusted_proxy_header(Some("not a header")).is_err());
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-session-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_repo() {
        assert_eq!(
            parse_repo("staffline/site-content"),
            Some(("staffline".to_string(), "site-content".to_string()))
        );
        assert_eq!(
            parse_repo("staffline/site-content.git"),
            Some(("staffline".to_string(), "site-content".to_string()))
        );
        assert_eq!(parse_repo("no-slash"), None);
        assert_eq!(parse_repo("/repo"), None);
        assert_eq!(parse_repo("a/b/c"), None);
    }

    #[test]
    fn test_storage_config_debug_redacts_token() {
        let config = StorageConfig::Vercel {
            api_url: DEFAULT_BLOB_API_URL.to_string(),
            token: SecretString::from("vercel_blob_rw_super_secret"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("blob.vercel-storage.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret"));
    }

    #[test]
    fn test_github_config_debug_redacts_token() {
        let config = GitHubConfig {
            token: SecretString::from("ghp_super_secret_token"),
            owner: "staffline".to_string(),
            repo: "site-content".to_string(),
            branch: "main".to_string(),
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            public_base_url: None,
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("site-content"));
        assert!(!debug_output.contains("ghp_super_secret_token"));
    }
}
