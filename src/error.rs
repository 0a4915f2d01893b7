//! Error taxonomy for the credential lifecycle
//!
//! Every boundary in this crate reports failure as an explicit
//! [`AuthError`] value; decode failures are tagged outcomes, never raised
//! faults. The one exception is the advisory predicates on
//! [`crate::token::TokenService`] (`is_expired`, `is_refresh_token`,
//! `remaining_lifetime`), which intentionally collapse all decode
//! failures into a safe default because they are advisory checks, not
//! authorization decisions.
//!
//! # Information Disclosure
//!
//! `Display` messages are deliberately generic: they never reveal which
//! field or which specific check failed, so callers can surface them to
//! end users without enabling account enumeration or oracle attacks.
//! The precise variant is still available to internal code and to
//! structured logs via [`crate::events`].

use thiserror::Error;

/// Errors produced by token validation and account-security transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Token decodes structurally but its signature does not verify
    /// (tampering, wrong key, wrong algorithm).
    #[error("invalid token")]
    InvalidSignature,

    /// Token cannot be structurally decoded at all.
    #[error("invalid token")]
    Malformed,

    /// Token is structurally and cryptographically valid but its
    /// expiration timestamp has passed.
    #[error("token expired")]
    Expired,

    /// Authentication attempted against a locked account.
    #[error("account is locked")]
    AccountLocked,

    /// Credential did not match the stored hash. The check itself is
    /// delegated to the caller; the failure path belongs to this crate.
    #[error("invalid credentials")]
    InvalidCredential,

    /// Password-reset token does not match the stored value or its
    /// expiry has passed.
    #[error("invalid or expired reset token")]
    ResetTokenInvalid,

    /// Email-verification token does not match the stored value.
    #[error("invalid verification token")]
    VerificationTokenInvalid,

    /// No user record for the given lookup key. Benign: reported as
    /// "no such record", not as an internal fault.
    #[error("user not found")]
    UserNotFound,

    /// Signing secret rejected at service construction (below the
    /// minimum effective strength).
    #[error("signing secret does not meet minimum strength requirements")]
    WeakSecret,

    /// Token encoder failure. Should not occur for valid subjects; kept
    /// explicit rather than panicking at a trust boundary.
    #[error("token encoding failed")]
    TokenEncoding,
}

impl AuthError {
    /// Whether this error is a token-validation failure (as opposed to
    /// an account-security rejection).
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::Malformed | Self::Expired | Self::TokenEncoding
        )
    }

    /// Stable machine-readable name, suitable for structured log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::AccountLocked => "account_locked",
            Self::InvalidCredential => "invalid_credential",
            Self::ResetTokenInvalid => "reset_token_invalid",
            Self::VerificationTokenInvalid => "verification_token_invalid",
            Self::UserNotFound => "user_not_found",
            Self::WeakSecret => "weak_secret",
            Self::TokenEncoding => "token_encoding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_generic() {
        // Signature and structural failures must be indistinguishable
        // to end users.
        assert_eq!(
            AuthError::InvalidSignature.to_string(),
            AuthError::Malformed.to_string()
        );
        // No variant message names a field or lookup key.
        for err in [
            AuthError::AccountLocked,
            AuthError::InvalidCredential,
            AuthError::ResetTokenInvalid,
            AuthError::UserNotFound,
        ] {
            let msg = err.to_string();
            assert!(!msg.contains("email"));
            assert!(!msg.contains("username"));
        }
    }

    #[test]
    fn test_token_error_classification() {
        assert!(AuthError::InvalidSignature.is_token_error());
        assert!(AuthError::Expired.is_token_error());
        assert!(!AuthError::AccountLocked.is_token_error());
        assert!(!AuthError::ResetTokenInvalid.is_token_error());
    }

    #[test]
    fn test_names_are_stable() {
        assert_eq!(AuthError::AccountLocked.name(), "account_locked");
        assert_eq!(AuthError::Malformed.name(), "malformed");
    }
}
