//! Credential lifecycle configuration
//!
//! Provides a builder-pattern configuration for token issuance and
//! account-security policy. The configuration is constructed once at
//! startup and passed into the services by value; nothing in this crate
//! reads mutable global state, which keeps services testable with
//! distinct keys per test.

use std::time::Duration;

/// Refresh tokens live this many times longer than access tokens.
pub const REFRESH_TTL_MULTIPLIER: u32 = 7;

/// Minimum signing-secret length in bytes (256 bits of input material).
pub const MIN_SECRET_BYTES: usize = 32;

/// Configuration for the credential lifecycle services.
///
/// Controls:
/// - Token signing secret and expiration windows
/// - Failed-login lockout threshold
/// - Password-reset token lifetime
/// - Counter behavior for attempts against an already-locked account
///
/// # Example
///
/// ```
/// use portcullis::CredentialConfig;
/// use std::time::Duration;
///
/// let config = CredentialConfig::builder("a-signing-secret-of-at-least-32-bytes")
///     .access_token_ttl(Duration::from_secs(15 * 60))
///     .lockout_threshold(3)
///     .password_reset_ttl(Duration::from_secs(30 * 60))
///     .build();
///
/// assert_eq!(config.refresh_token_ttl(), Duration::from_secs(7 * 15 * 60));
/// ```
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Symmetric signing secret for session tokens.
    ///
    /// Minimum effective strength of 256 bits; enforced when the token
    /// service is constructed, not here, so configs can be assembled
    /// before the secret is known to be final.
    pub signing_secret: String,

    /// Access-token expiration window (default 24 hours).
    pub access_token_ttl: Duration,

    /// Failed authentication attempts before the account locks.
    ///
    /// The default of 5 follows NIST AC-7 guidance. This is a policy
    /// value, not a constant; deployments with stricter postures should
    /// lower it.
    pub lockout_threshold: u32,

    /// Lifetime of an issued password-reset token (default 1 hour).
    pub password_reset_ttl: Duration,

    /// Whether failed attempts against an already-locked account keep
    /// incrementing the counter.
    ///
    /// Default `false`: the counter freezes while locked, which keeps
    /// the audit trail readable (the stored count equals the count that
    /// triggered the lock).
    pub count_failures_while_locked: bool,
}

impl CredentialConfig {
    /// Create a configuration with the given signing secret and default
    /// policy values.
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            access_token_ttl: Duration::from_millis(86_400_000), // 24 hours
            lockout_threshold: 5,
            password_reset_ttl: Duration::from_secs(60 * 60), // 1 hour
            count_failures_while_locked: false,
        }
    }

    /// Create a new builder.
    pub fn builder(signing_secret: impl Into<String>) -> CredentialConfigBuilder {
        CredentialConfigBuilder {
            config: Self::new(signing_secret),
        }
    }

    /// Refresh-token expiration window, derived from the access window.
    pub fn refresh_token_ttl(&self) -> Duration {
        self.access_token_ttl * REFRESH_TTL_MULTIPLIER
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JWT_SECRET`: signing secret (required)
    /// - `ACCESS_TOKEN_TTL_MS`: access window in milliseconds (default: 86400000)
    /// - `LOCKOUT_THRESHOLD`: failed attempts before lockout (default: 5)
    /// - `PASSWORD_RESET_TTL_MS`: reset-token lifetime in milliseconds (default: 3600000)
    /// - `COUNT_FAILURES_WHILE_LOCKED`: "true"/"false" (default: "false")
    ///
    /// Returns `None` when `JWT_SECRET` is unset; there is no safe
    /// default for a signing secret.
    pub fn from_env() -> Option<Self> {
        let signing_secret = std::env::var("JWT_SECRET").ok()?;

        let mut config = Self::new(signing_secret);

        if let Some(ms) = std::env::var("ACCESS_TOKEN_TTL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.access_token_ttl = Duration::from_millis(ms);
        }

        if let Some(threshold) = std::env::var("LOCKOUT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.lockout_threshold = threshold;
        }

        if let Some(ms) = std::env::var("PASSWORD_RESET_TTL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.password_reset_ttl = Duration::from_millis(ms);
        }

        if let Ok(v) = std::env::var("COUNT_FAILURES_WHILE_LOCKED") {
            config.count_failures_while_locked = v.to_lowercase() == "true";
        }

        Some(config)
    }
}

/// Builder for [`CredentialConfig`].
#[derive(Debug, Clone)]
pub struct CredentialConfigBuilder {
    config: CredentialConfig,
}

impl CredentialConfigBuilder {
    /// Set the access-token expiration window.
    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.access_token_ttl = ttl;
        self
    }

    /// Set the failed-login lockout threshold.
    pub fn lockout_threshold(mut self, threshold: u32) -> Self {
        self.config.lockout_threshold = threshold;
        self
    }

    /// Set the password-reset token lifetime.
    pub fn password_reset_ttl(mut self, ttl: Duration) -> Self {
        self.config.password_reset_ttl = ttl;
        self
    }

    /// Set whether the failure counter keeps incrementing while locked.
    pub fn count_failures_while_locked(mut self, enabled: bool) -> Self {
        self.config.count_failures_while_locked = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CredentialConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CredentialConfig::new("x".repeat(32));
        assert_eq!(config.access_token_ttl, Duration::from_millis(86_400_000));
        assert_eq!(config.lockout_threshold, 5);
        assert_eq!(config.password_reset_ttl, Duration::from_secs(3600));
        assert!(!config.count_failures_while_locked);
    }

    #[test]
    fn test_refresh_ttl_derived() {
        let config = CredentialConfig::builder("x".repeat(32))
            .access_token_ttl(Duration::from_millis(1000))
            .build();
        assert_eq!(config.refresh_token_ttl(), Duration::from_millis(7000));
    }

    #[test]
    fn test_builder_overrides() {
        let config = CredentialConfig::builder("x".repeat(32))
            .lockout_threshold(3)
            .password_reset_ttl(Duration::from_secs(120))
            .count_failures_while_locked(true)
            .build();
        assert_eq!(config.lockout_threshold, 3);
        assert_eq!(config.password_reset_ttl, Duration::from_secs(120));
        assert!(config.count_failures_while_locked);
    }
}
