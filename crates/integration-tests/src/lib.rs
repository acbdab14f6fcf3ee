//! Integration tests for Staffline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p staffline-integration-tests
//! ```
//!
//! Tests drive the complete router in-process with
//! `tower::ServiceExt::oneshot`, against a local blob store in a temporary
//! directory. Remote APIs (Vercel Blob, GitHub) are replaced by `httpmock`
//! servers.
//!
//! # Test Categories
//!
//! - `content_api` - content documents and HTML pages over the JSON API
//! - `auth` - login, logout, session state and login throttling
//! - `pages` - public pages, admin panel access, SEO files, headers
//! - `upload` - image uploads to the local store
//! - `remote` - Vercel Blob and GitHub clients against mock servers

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::Value;
use staffline_site::config::{LoginConfig, StorageConfig};
use staffline_site::services::auth::hash_password;
use staffline_site::{AppState, SiteConfig, build_router};
use tempfile::TempDir;
use tower::ServiceExt;

/// Admin password accepted by every test context.
pub const TEST_PASSWORD: &str = "engraved-in-stone";

/// Session key used by every test context.
pub const TEST_SESSION_SECRET: &str = "k9Xq2vLr7TmWc4ZpYb8NfHs3JdGe6UaQ";

/// Base URL of the site under test.
pub const TEST_BASE_URL: &str = "http://staffline.test";

/// Hashing is deliberately slow, so it happens once per test binary.
static PASSWORD_HASH: LazyLock<String> = LazyLock::new(|| hash_password(TEST_PASSWORD).unwrap());

/// Configuration for a site backed by a local store at `root`.
#[must_use]
pub fn test_config(root: &Path) -> SiteConfig {
    SiteConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: TEST_BASE_URL.to_string(),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        admin_password_hash: SecretString::from(PASSWORD_HASH.as_str()),
        session_ttl: Duration::from_secs(8 * 60 * 60),
        login: LoginConfig::default(),
        trusted_proxy_header: None,
        content_cache_ttl: Duration::from_secs(60),
        max_upload_bytes: 1024 * 1024,
        storage: StorageConfig::Local {
            root: root.to_path_buf(),
        },
        github: None,
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../site/static")),
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A running site with its own temporary content store.
pub struct TestContext {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestContext {
    /// Site with the default test configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Site with a configuration adjusted by `customize`.
    #[must_use]
    pub fn with_config(customize: impl FnOnce(&mut SiteConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        customize(&mut config);

        let state = AppState::new(config);
        let router = build_router(state.clone());
        Self { dir, state, router }
    }

    /// Root of the local content store.
    #[must_use]
    pub fn store_root(&self) -> &Path {
        self.dir.path()
    }

    /// A valid admin session token.
    #[must_use]
    pub fn admin_token(&self) -> String {
        self.state.signer().issue(Utc::now()).unwrap().token
    }

    /// Send a request through the full router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `GET uri`.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// `GET uri` with an admin session cookie.
    pub async fn get_as_admin(&self, uri: &str) -> TestResponse {
        let cookie = format!("staffline_admin={}", self.admin_token());
        self.send(
            Request::get(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// `POST uri` with a JSON body and an optional bearer token.
    pub async fn post_json(&self, uri: &str, body: &Value, token: Option<&str>) -> TestResponse {
        let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// `POST uri` with a JSON body as the admin.
    pub async fn post_json_as_admin(&self, uri: &str, body: &Value) -> TestResponse {
        let token = self.admin_token();
        self.post_json(uri, body, Some(&token)).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Body as text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A response header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A small PNG image.
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([120, 40, 30]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// A `multipart/form-data` body and its content type.
///
/// `file` is `(file name, content type, bytes)`.
#[must_use]
pub fn multipart_body(
    file: Option<(&str, &str, &[u8])>,
    folder: Option<&str>,
) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "staffline-test-boundary";
    let mut body = Vec::new();

    if let Some(folder) = folder {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
