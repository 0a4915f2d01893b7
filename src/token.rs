//! Credential Token Service
//!
//! Issues and validates signed, time-bounded session tokens carrying a
//! subject identity and optional custom claims. Tokens are HS256 JWTs:
//! self-contained, opaque, URL-safe strings composed of header, claims,
//! and signature.
//!
//! # Design Philosophy
//!
//! Signature verification and expiration are two independent predicates.
//! A token can be cryptographically valid yet time-expired, and collapsing
//! the two checks into one obscures which invariant failed. [`TokenService::validate`]
//! checks signature and structure only; [`TokenService::is_expired`] checks
//! time only. Authorization decisions must apply both, which
//! [`TokenService::authorize`] does in one call.
//!
//! The advisory predicates (`is_expired`, `is_refresh_token`,
//! `remaining_lifetime`, `extract_claim`, `extract_expiration`,
//! `can_refresh`) sit on a trust boundary: a malformed token must never
//! crash the caller, so they degrade to a safe fail-closed default
//! instead of surfacing an error.
//!
//! # Usage
//!
//! ```
//! use portcullis::{CredentialConfig, TokenService};
//!
//! let config = CredentialConfig::new("a-signing-secret-of-at-least-32-bytes");
//! let tokens = TokenService::new(&config).unwrap();
//!
//! let token = tokens.issue("alice").unwrap();
//! let claims = tokens.authorize(&token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{CredentialConfig, MIN_SECRET_BYTES};
use crate::error::AuthError;
use crate::events::SecurityEvent;

/// Claim value marking a refresh token.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claim names the service always sets itself, overriding any
/// caller-supplied values of the same name.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "iat", "exp", "tokenType"];

// ============================================================================
// Claims
// ============================================================================

/// Decoded token payload.
///
/// Timestamps are Unix **milliseconds**: expiration windows are
/// configured in milliseconds and must round-trip without truncation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity (username or user identifier)
    pub sub: String,

    /// Issued-at, Unix milliseconds
    pub iat: i64,

    /// Expiration, Unix milliseconds
    pub exp: i64,

    /// `"refresh"` on refresh tokens, absent on access tokens
    #[serde(rename = "tokenType", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Caller-supplied custom claims
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Whether this is a refresh token.
    pub fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some(TOKEN_TYPE_REFRESH)
    }

    /// Expiration as a UTC timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.exp)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Issued-at as a UTC timestamp.
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.iat)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Get a custom claim value.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.custom.get(name)
    }
}

// ============================================================================
// Token Service
// ============================================================================

/// Stateless issuer and validator of signed session tokens.
///
/// Holds the signing key and expiration policy, both fixed at
/// construction. Cheap to clone; safe to share across request handlers.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from configuration.
    ///
    /// Rejects signing secrets below 32 bytes (256 bits of input
    /// material) with [`AuthError::WeakSecret`].
    pub fn new(config: &CredentialConfig) -> Result<Self, AuthError> {
        let secret = config.signing_secret.as_bytes();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::WeakSecret);
        }

        // Expiry is this crate's own millisecond-precision check, so the
        // decoder must not also enforce it at seconds granularity.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl(),
            validation,
        })
    }

    /// The configured access-token expiration window.
    pub fn access_token_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// The derived refresh-token expiration window.
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    // ========================================================================
    // Issuance
    // ========================================================================

    /// Mint an access token for the given subject with no custom claims.
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        self.issue_with_claims(subject, HashMap::new())
    }

    /// Mint an access token carrying the given custom claims.
    ///
    /// Reserved names (`sub`, `iat`, `exp`, `tokenType`) are always set
    /// by the service; caller-supplied values of those names are dropped.
    pub fn issue_with_claims(
        &self,
        subject: &str,
        claims: HashMap<String, serde_json::Value>,
    ) -> Result<String, AuthError> {
        self.mint(subject, claims, self.access_ttl, None)
    }

    /// Mint a refresh token: expiration window 7x the access window and
    /// a `tokenType = "refresh"` claim.
    pub fn issue_refresh(&self, subject: &str) -> Result<String, AuthError> {
        self.mint(
            subject,
            HashMap::new(),
            self.refresh_ttl,
            Some(TOKEN_TYPE_REFRESH.to_string()),
        )
    }

    fn mint(
        &self,
        subject: &str,
        mut custom: HashMap<String, serde_json::Value>,
        ttl: Duration,
        token_type: Option<String>,
    ) -> Result<String, AuthError> {
        for name in RESERVED_CLAIMS {
            custom.remove(name);
        }

        let now = Utc::now().timestamp_millis();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl.as_millis() as i64,
            token_type,
            custom,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenEncoding)?;

        crate::security_event!(
            SecurityEvent::TokenIssued,
            subject = %subject,
            refresh = claims.is_refresh(),
            ttl_ms = ttl.as_millis() as u64,
            "Token issued"
        );

        Ok(token)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Verify signature and structural well-formedness; return the
    /// decoded claims.
    ///
    /// Does **not** reject on expiration - that is a separate predicate
    /// ([`Self::is_expired`]), and both must be applied before a token
    /// authorizes anything. Use [`Self::authorize`] for that.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                // Base64 failures count as signature failures: the claims
                // segment cannot fail decoding until the signature over it
                // has already verified, so an undecodable segment means the
                // token was altered after signing.
                let err = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::InvalidSignature
                    | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm
                    | jsonwebtoken::errors::ErrorKind::Base64(_) => {
                        AuthError::InvalidSignature
                    }
                    _ => AuthError::Malformed,
                };
                crate::security_event!(
                    SecurityEvent::TokenRejected,
                    reason = err.name(),
                    "Token failed validation"
                );
                err
            })
    }

    /// Full authorization check: signature, structure, and expiration.
    ///
    /// Returns [`AuthError::Expired`] for a cryptographically valid but
    /// time-expired token, so callers can distinguish "re-authenticate"
    /// from "reject outright".
    pub fn authorize(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate(token)?;
        if claims.exp <= Utc::now().timestamp_millis() {
            crate::security_event!(
                SecurityEvent::TokenRejected,
                subject = %claims.sub,
                reason = AuthError::Expired.name(),
                "Token expired"
            );
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Convenience composition of [`Self::validate`] and subject
    /// extraction.
    pub fn extract_subject(&self, token: &str) -> Result<String, AuthError> {
        self.validate(token).map(|claims| claims.sub)
    }

    // ========================================================================
    // Advisory predicates (fail-closed)
    // ========================================================================

    /// Whether the token's expiration timestamp is at or before now.
    ///
    /// Fail-closed: `true` when the token cannot be decoded at all.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.validate(token) {
            Ok(claims) => claims.exp <= Utc::now().timestamp_millis(),
            Err(_) => true,
        }
    }

    /// Time until expiration: `max(0, exp - now)`.
    ///
    /// Zero on any decode failure; never negative.
    pub fn remaining_lifetime(&self, token: &str) -> Duration {
        match self.validate(token) {
            Ok(claims) => {
                let remaining = claims.exp - Utc::now().timestamp_millis();
                if remaining > 0 {
                    Duration::from_millis(remaining as u64)
                } else {
                    Duration::ZERO
                }
            }
            Err(_) => Duration::ZERO,
        }
    }

    /// Whether the token is decodable and carries `tokenType = "refresh"`.
    ///
    /// `false` on any decode failure.
    pub fn is_refresh_token(&self, token: &str) -> bool {
        self.validate(token)
            .map(|claims| claims.is_refresh())
            .unwrap_or(false)
    }

    /// Whether the token may still be exchanged for a new access token:
    /// decodable, signature valid, and not yet expired.
    pub fn can_refresh(&self, token: &str) -> bool {
        self.authorize(token).is_ok()
    }

    /// Get a custom claim by name. `None` on any decode failure or when
    /// the claim is absent.
    pub fn extract_claim(&self, token: &str, name: &str) -> Option<serde_json::Value> {
        self.validate(token).ok()?.custom.get(name).cloned()
    }

    /// Get the token's expiration timestamp. `None` on any decode
    /// failure.
    pub fn extract_expiration(&self, token: &str) -> Option<DateTime<Utc>> {
        self.validate(token).ok().map(|claims| claims.expires_at())
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of Debug output.
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> CredentialConfig {
        CredentialConfig::new("test-signing-secret-at-least-32-bytes-long")
    }

    fn test_service() -> TokenService {
        TokenService::new(&test_config()).unwrap()
    }

    fn short_lived_service(ttl_ms: u64) -> TokenService {
        let config = CredentialConfig::builder("test-signing-secret-at-least-32-bytes-long")
            .access_token_ttl(Duration::from_millis(ttl_ms))
            .build();
        TokenService::new(&config).unwrap()
    }

    /// Replace the first character of the signature segment with a
    /// different base64url character.
    fn tamper_signature(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').unwrap();
        let first = sig.chars().next().unwrap();
        let replacement = if first == 'A' { 'B' } else { 'A' };
        format!("{}.{}{}", head, replacement, &sig[1..])
    }

    #[test]
    fn test_weak_secret_rejected() {
        let config = CredentialConfig::new("too-short");
        assert_eq!(TokenService::new(&config).unwrap_err(), AuthError::WeakSecret);
    }

    #[test]
    fn test_round_trip() {
        let tokens = test_service();
        let token = tokens.issue("alice").unwrap();

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.token_type.is_none());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_round_trip_custom_claims() {
        let tokens = test_service();
        let mut custom = HashMap::new();
        custom.insert("role".to_string(), serde_json::json!("admin"));
        custom.insert("tenant".to_string(), serde_json::json!(42));

        let token = tokens.issue_with_claims("alice", custom).unwrap();
        let claims = tokens.validate(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.get("role"), Some(&serde_json::json!("admin")));
        assert_eq!(claims.get("tenant"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn test_reserved_claims_overridden() {
        let tokens = test_service();
        let mut custom = HashMap::new();
        custom.insert("sub".to_string(), serde_json::json!("mallory"));
        custom.insert("exp".to_string(), serde_json::json!(0));
        custom.insert("tokenType".to_string(), serde_json::json!("refresh"));

        let token = tokens.issue_with_claims("alice", custom).unwrap();
        let claims = tokens.validate(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > 0);
        assert!(!claims.is_refresh());
        assert!(!tokens.is_refresh_token(&token));
    }

    #[test]
    fn test_tampered_signature_is_invalid_signature() {
        let tokens = test_service();
        let token = tokens.issue("alice").unwrap();
        let tampered = tamper_signature(&token);

        assert_eq!(
            tokens.validate(&tampered).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn test_undecodable_signature_is_invalid_signature() {
        let tokens = test_service();
        let token = tokens.issue("alice").unwrap();
        let (head, _sig) = token.rsplit_once('.').unwrap();

        // Signature segment that is not valid base64url at all.
        let corrupted = format!("{}.%%%", head);
        assert_eq!(
            tokens.validate(&corrupted).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let tokens = test_service();
        let other = TokenService::new(&CredentialConfig::new(
            "a-different-signing-secret-32-bytes-min",
        ))
        .unwrap();

        let token = tokens.issue("alice").unwrap();
        assert_eq!(other.validate(&token).unwrap_err(), AuthError::InvalidSignature);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = test_service();
        assert_eq!(
            tokens.validate("not-a-token").unwrap_err(),
            AuthError::Malformed
        );
        assert_eq!(tokens.validate("").unwrap_err(), AuthError::Malformed);
    }

    #[test]
    fn test_refresh_distinction() {
        let tokens = test_service();

        let access = tokens.issue("alice").unwrap();
        let refresh = tokens.issue_refresh("alice").unwrap();

        assert!(tokens.is_refresh_token(&refresh));
        assert!(!tokens.is_refresh_token(&access));
        assert!(!tokens.is_refresh_token("garbage"));

        let claims = tokens.validate(&refresh).unwrap();
        assert_eq!(claims.token_type.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_refresh_window_is_seven_times_access() {
        let tokens = short_lived_service(10_000);
        let refresh = tokens.issue_refresh("alice").unwrap();
        let claims = tokens.validate(&refresh).unwrap();
        assert_eq!(claims.exp - claims.iat, 70_000);
    }

    #[test]
    fn test_remaining_lifetime_bounds() {
        let tokens = test_service();
        let token = tokens.issue("alice").unwrap();

        let remaining = tokens.remaining_lifetime(&token);
        assert!(remaining > Duration::ZERO);
        assert!(remaining <= tokens.access_token_ttl());

        assert_eq!(tokens.remaining_lifetime("garbage"), Duration::ZERO);
    }

    #[test]
    fn test_expiration_scenario() {
        // Issue with a 1000ms window, wait past it: signature still
        // verifies, expiry predicate fires, authorization rejects.
        let tokens = short_lived_service(1000);
        let token = tokens.issue("alice").unwrap();

        assert!(!tokens.is_expired(&token));
        assert!(tokens.can_refresh(&token));

        std::thread::sleep(Duration::from_millis(1100));

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.sub, "alice");

        assert!(tokens.is_expired(&token));
        assert_eq!(tokens.remaining_lifetime(&token), Duration::ZERO);
        assert!(!tokens.can_refresh(&token));
        assert_eq!(tokens.authorize(&token).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_is_expired_fails_closed() {
        let tokens = test_service();
        assert!(tokens.is_expired("garbage"));
        assert!(tokens.is_expired(""));

        let tampered = tamper_signature(&tokens.issue("alice").unwrap());
        assert!(tokens.is_expired(&tampered));
    }

    #[test]
    fn test_extract_subject() {
        let tokens = test_service();
        let token = tokens.issue("alice").unwrap();
        assert_eq!(tokens.extract_subject(&token).unwrap(), "alice");
        assert!(tokens.extract_subject("garbage").is_err());
    }

    #[test]
    fn test_extract_claim_and_expiration() {
        let tokens = test_service();
        let mut custom = HashMap::new();
        custom.insert("org".to_string(), serde_json::json!("acme"));
        let token = tokens.issue_with_claims("alice", custom).unwrap();

        assert_eq!(tokens.extract_claim(&token, "org"), Some(serde_json::json!("acme")));
        assert_eq!(tokens.extract_claim(&token, "missing"), None);
        assert_eq!(tokens.extract_claim("garbage", "org"), None);

        assert!(tokens.extract_expiration(&token).unwrap() > Utc::now());
        assert!(tokens.extract_expiration("garbage").is_none());
    }
}
