//! Admin authentication.
//!
//! There is a single admin account. Its password is stored as an Argon2 PHC
//! hash in the configuration; a successful login yields a stateless session
//! token signed with HMAC-SHA256:
//!
//! ```text
//! base64url(claims_json) "." hex(hmac_sha256(secret, base64url(claims_json)))
//! ```
//!
//! Claims are `{ "sub": "admin", "iat": <unix>, "exp": <unix> }`.

mod error;
mod throttle;

pub use error::{AuthError, TokenError};
pub use throttle::LoginThrottle;

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Subject of every admin session.
pub const ADMIN_SUBJECT: &str = "admin";

/// Minimum password length accepted by [`hash_password`].
pub const MIN_PASSWORD_LENGTH: usize = 8;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject, always [`ADMIN_SUBJECT`].
    pub sub: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

impl SessionClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionSigner {
    /// Create a signer with the given key and token lifetime.
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid from `now` for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Key`] if the MAC rejects the key or the expiry
    /// is out of range.
    pub fn issue(&self, now: DateTime<Utc>) -> Result<SessionToken, TokenError> {
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| TokenError::Key("session lifetime out of range".to_string()))?;

        let claims = SessionClaims {
            sub: ADMIN_SUBJECT.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|e| TokenError::Key(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(&payload)?;

        Ok(SessionToken {
            token: format!("{payload}.{signature}"),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        })
    }

    /// Verify a token at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`], [`TokenError::BadSignature`] or
    /// [`TokenError::Expired`].
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let (payload, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        if payload.is_empty() || signature.is_empty() {
            return Err(TokenError::Malformed);
        }

        let expected = self.sign(payload)?;
        if !constant_time_compare(&expected, &signature.to_ascii_lowercase()) {
            return Err(TokenError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if claims.sub != ADMIN_SUBJECT {
            return Err(TokenError::Malformed);
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, payload: &str) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| TokenError::Key(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] if the password is shorter than
/// [`MIN_PASSWORD_LENGTH`], or [`AuthError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a PHC hash.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] if the password does not match
/// or the hash cannot be parsed.
pub fn verify_password(password: &str, hash: &SecretString) -> Result<(), AuthError> {
    let parsed_hash =
        PasswordHash::new(hash.expose_secret()).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn signer() -> SessionSigner {
        SessionSigner::new(
            SecretString::from("k3Y!9vQz#Lm2@xT7&pR4^wN8*cB1$hJ6"),
            Duration::from_secs(8 * 60 * 60),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let issued = signer.issue(now()).unwrap();
        assert_eq!(issued.expires_at, now() + chrono::Duration::hours(8));

        let claims = signer.verify(&issued.token, now()).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.iat, now().timestamp());
        assert_eq!(claims.expires_at(), Some(issued.expires_at));
    }

    #[test]
    fn test_unrepresentable_lifetime_is_an_error() {
        let signer = SessionSigner::new(
            SecretString::from("k3Y!9vQz#Lm2@xT7&pR4^wN8*cB1$hJ6"),
            Duration::from_secs(u64::MAX),
        );
        assert!(matches!(signer.issue(now()), Err(TokenError::Key(_))));
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let issued = signer.issue(now()).unwrap();
        let later = now() + chrono::Duration::hours(8);
        assert_eq!(signer.verify(&issued.token, later), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_payload() {
        let signer = signer();
        let issued = signer.issue(now()).unwrap();
        let (_, signature) = issued.token.split_once('.').unwrap();

        let forged_claims = SessionClaims {
            sub: "admin".to_string(),
            iat: now().timestamp(),
            exp: now().timestamp() + 10 * 365 * 24 * 60 * 60,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert_eq!(signer.verify(&forged, now()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_other_key_rejected() {
        let issued = signer().issue(now()).unwrap();
        let other = SessionSigner::new(
            SecretString::from("Zx8#Qw2!Er5@Ty7$Ui9%Op1^As3&Df4*"),
            Duration::from_secs(60),
        );
        assert_eq!(other.verify(&issued.token, now()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer();
        for token in ["", "no-dot", ".sig", "payload.", "a.b.c"] {
            assert!(
                matches!(
                    signer.verify(token, now()),
                    Err(TokenError::Malformed | TokenError::BadSignature)
                ),
                "{token:?}"
            );
        }
        assert_eq!(signer.verify("no-dot", now()), Err(TokenError::Malformed));
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = SecretString::from(hash_password("engraving-2024").unwrap());
        assert!(verify_password("engraving-2024", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_password_rejects_short() {
        assert!(matches!(
            hash_password("short"),
            Err(AuthError::WeakPassword(8))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }
}
