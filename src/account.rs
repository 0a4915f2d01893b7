//! Account Security State Machine
//!
//! Tracks failed authentication attempts, lock status, and the single-use
//! password-reset and email-verification tokens on a persisted
//! [`UserSecurityRecord`]. Session and refresh tokens are delegated to
//! [`crate::token::TokenService`]; the reset and verification tokens here
//! are random opaque strings stored against the record, not signed
//! tokens.
//!
//! # State Transitions
//!
//! | Event | Precondition | Effect |
//! |---|---|---|
//! | Auth success | not locked | counter = 0, `last_login` stamped |
//! | Auth failure | not locked | counter += 1; lock at threshold |
//! | Auth attempt while locked | locked | rejected, no counter change |
//! | Request password reset | - | new token + expiry stored |
//! | Redeem password reset | token matches, not expired | hash updated, token cleared |
//! | Request email verification | - | new token stored |
//! | Redeem email verification | token matches | verified, token cleared |
//! | Unlock | admin action | unlocked, counter = 0 |
//!
//! Every counter mutation runs inside a single serialized
//! [`UserStore::update`] call, so concurrent failed logins against the
//! same account cannot lose increments (see [`crate::store`] module docs).

use std::time::Duration;

use chrono::Utc;

use crate::config::CredentialConfig;
use crate::crypto::constant_time_str_eq;
use crate::error::AuthError;
use crate::events::SecurityEvent;
use crate::store::{UserSecurityRecord, UserStore};
use crate::token::TokenService;

/// Opaque reset/verification tokens: 43 alphanumeric characters, about
/// 256 bits of randomness.
const OPAQUE_TOKEN_LEN: usize = 43;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate an opaque single-use token.
fn generate_opaque_token() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    (0..OPAQUE_TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..TOKEN_CHARSET.len());
            TOKEN_CHARSET[idx] as char
        })
        .collect()
}

// ============================================================================
// Policy
// ============================================================================

/// Account-security policy parameters.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    /// Failed attempts before lockout
    pub lockout_threshold: u32,

    /// Lifetime of an issued password-reset token
    pub password_reset_ttl: Duration,

    /// Whether failures against an already-locked account keep counting
    pub count_failures_while_locked: bool,
}

impl SecurityPolicy {
    /// Extract the policy slice of a [`CredentialConfig`].
    pub fn from_config(config: &CredentialConfig) -> Self {
        Self {
            lockout_threshold: config.lockout_threshold,
            password_reset_ttl: config.password_reset_ttl,
            count_failures_while_locked: config.count_failures_while_locked,
        }
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
            password_reset_ttl: Duration::from_secs(60 * 60),
            count_failures_while_locked: false,
        }
    }
}

/// Token pair minted on successful login.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

// ============================================================================
// Account Security
// ============================================================================

/// The account-security state machine over a [`UserStore`].
#[derive(Debug)]
pub struct AccountSecurity<S: UserStore> {
    store: S,
    policy: SecurityPolicy,
}

impl<S: UserStore> AccountSecurity<S> {
    /// Create the state machine with the given store and policy.
    pub fn new(store: S, policy: SecurityPolicy) -> Self {
        Self { store, policy }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active policy.
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Evaluate an authentication attempt for the user matching
    /// `identifier` (email or username).
    ///
    /// `verify` receives the stored credential hash and decides whether
    /// the presented credential matches - hashing is delegated, but the
    /// accept/reject/lock decision belongs here. Locked accounts are
    /// rejected before the credential check, with no counter change.
    ///
    /// A failure increments the counter and locks the account when the
    /// new count reaches the threshold, in one serialized store update.
    pub fn authenticate<F>(
        &self,
        identifier: &str,
        verify: F,
    ) -> Result<UserSecurityRecord, AuthError>
    where
        F: FnOnce(&str) -> bool,
    {
        let user = self
            .store
            .find_by_email_or_username(identifier)
            .ok_or(AuthError::UserNotFound)?;

        if user.account_locked {
            // Rejected before the credential check; under the counting
            // policy the blocked attempt still increments.
            if self.policy.count_failures_while_locked {
                self.store
                    .update(&user.user_id, &mut |u| u.increment_failed_attempts())
                    .ok_or(AuthError::UserNotFound)?;
            }
            log_blocked_attempt(identifier);
            return Err(AuthError::AccountLocked);
        }

        if verify(&user.hashed_password) {
            let now = Utc::now();
            let updated = self
                .store
                .update(&user.user_id, &mut |u| {
                    // Locked concurrently since the read: leave untouched.
                    if u.account_locked {
                        return;
                    }
                    u.reset_failed_attempts();
                    u.last_login = Some(now);
                })
                .ok_or(AuthError::UserNotFound)?;

            if updated.account_locked {
                log_blocked_attempt(identifier);
                return Err(AuthError::AccountLocked);
            }

            log_login_success(identifier, &updated.user_id);
            Ok(updated)
        } else {
            let threshold = self.policy.lockout_threshold;
            let count_while_locked = self.policy.count_failures_while_locked;
            let mut locked_now = false;

            let updated = self
                .store
                .update(&user.user_id, &mut |u| {
                    if u.account_locked && !count_while_locked {
                        return;
                    }
                    u.increment_failed_attempts();
                    if !u.account_locked && u.failed_login_attempts >= threshold {
                        u.lock_account();
                        locked_now = true;
                    }
                })
                .ok_or(AuthError::UserNotFound)?;

            log_login_failure(identifier, updated.failed_login_attempts, threshold);
            if locked_now {
                log_account_locked(&updated.user_id, updated.failed_login_attempts);
            }

            Err(AuthError::InvalidCredential)
        }
    }

    /// Authenticate and, on acceptance, mint an access + refresh token
    /// pair for the user.
    pub fn login<F>(
        &self,
        tokens: &TokenService,
        identifier: &str,
        verify: F,
    ) -> Result<SessionTokens, AuthError>
    where
        F: FnOnce(&str) -> bool,
    {
        let user = self.authenticate(identifier, verify)?;
        Ok(SessionTokens {
            access_token: tokens.issue(&user.user_id)?,
            refresh_token: tokens.issue_refresh(&user.user_id)?,
        })
    }

    /// Unlock an account (administrative action). Clears the lock flag
    /// and the failure counter in one transition.
    pub fn unlock(&self, user_id: &str) -> Result<(), AuthError> {
        self.store
            .update(user_id, &mut |u| u.unlock_account())
            .ok_or(AuthError::UserNotFound)?;
        log_account_unlocked(user_id);
        Ok(())
    }

    // ========================================================================
    // Password Reset
    // ========================================================================

    /// Generate a single-use password-reset token for the user with the
    /// given email, valid for the configured window. A new request
    /// replaces any pending token.
    pub fn request_password_reset(&self, email: &str) -> Result<String, AuthError> {
        let user = self.store.find_by_email(email).ok_or(AuthError::UserNotFound)?;

        let token = generate_opaque_token();
        let expiry =
            Utc::now() + chrono::Duration::milliseconds(self.policy.password_reset_ttl.as_millis() as i64);

        self.store
            .update(&user.user_id, &mut |u| {
                u.password_reset_token = Some(token.clone());
                u.password_reset_token_expiry = Some(expiry);
            })
            .ok_or(AuthError::UserNotFound)?;

        log_reset_requested(&user.user_id);
        Ok(token)
    }

    /// Redeem a password-reset token: store the new credential hash and
    /// clear the token and its expiry in the same transition.
    ///
    /// Rejects with [`AuthError::ResetTokenInvalid`] - and mutates
    /// nothing - when the token matches no record, does not match the
    /// stored value, or has expired.
    pub fn redeem_password_reset(
        &self,
        token: &str,
        new_hashed_password: &str,
    ) -> Result<(), AuthError> {
        let now = Utc::now();
        let user = self
            .store
            .find_by_valid_reset_token(token, now)
            .ok_or(AuthError::ResetTokenInvalid)?;

        // Re-checked inside the serialized update: the token may have
        // been consumed or replaced since the lookup.
        let mut redeemed = false;
        self.store.update(&user.user_id, &mut |u| {
            let valid = match (&u.password_reset_token, u.password_reset_token_expiry) {
                (Some(stored), Some(expiry)) => {
                    constant_time_str_eq(stored, token) && now < expiry
                }
                _ => false,
            };
            if valid {
                u.hashed_password = new_hashed_password.to_string();
                u.password_reset_token = None;
                u.password_reset_token_expiry = None;
                redeemed = true;
            }
        });

        if redeemed {
            log_password_changed(&user.user_id);
            Ok(())
        } else {
            Err(AuthError::ResetTokenInvalid)
        }
    }

    // ========================================================================
    // Email Verification
    // ========================================================================

    /// Generate a single-use email-verification token for the user with
    /// the given email.
    pub fn request_email_verification(&self, email: &str) -> Result<String, AuthError> {
        let user = self.store.find_by_email(email).ok_or(AuthError::UserNotFound)?;

        let token = generate_opaque_token();
        self.store
            .update(&user.user_id, &mut |u| {
                u.email_verification_token = Some(token.clone());
            })
            .ok_or(AuthError::UserNotFound)?;

        log_verification_requested(&user.user_id);
        Ok(token)
    }

    /// Redeem an email-verification token: mark the email verified and
    /// clear the token, irreversibly.
    ///
    /// Rejects with [`AuthError::VerificationTokenInvalid`] - and
    /// mutates nothing - when the token matches no stored value.
    pub fn redeem_email_verification(&self, token: &str) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_verification_token(token)
            .ok_or(AuthError::VerificationTokenInvalid)?;

        let mut verified = false;
        self.store.update(&user.user_id, &mut |u| {
            if let Some(stored) = &u.email_verification_token {
                if constant_time_str_eq(stored, token) {
                    u.email_verified = true;
                    u.email_verification_token = None;
                    verified = true;
                }
            }
        });

        if verified {
            log_email_verified(&user.user_id);
            Ok(())
        } else {
            Err(AuthError::VerificationTokenInvalid)
        }
    }
}

// ============================================================================
// Security Event Logging
// ============================================================================

fn log_login_success(identifier: &str, user_id: &str) {
    crate::security_event!(
        SecurityEvent::AuthenticationSuccess,
        identifier = %identifier,
        user_id = %user_id,
        "Login successful"
    );
}

fn log_login_failure(identifier: &str, failed_attempts: u32, threshold: u32) {
    crate::security_event!(
        SecurityEvent::AuthenticationFailure,
        identifier = %identifier,
        failed_attempts = failed_attempts,
        remaining_attempts = threshold.saturating_sub(failed_attempts),
        "Login failed"
    );
}

fn log_blocked_attempt(identifier: &str) {
    crate::security_event!(
        SecurityEvent::AuthenticationFailure,
        identifier = %identifier,
        reason = "account_locked",
        "Login attempt against locked account"
    );
}

fn log_account_locked(user_id: &str, failed_attempts: u32) {
    crate::security_event!(
        SecurityEvent::AccountLocked,
        user_id = %user_id,
        failed_attempts = failed_attempts,
        "Account locked due to failed login attempts"
    );
}

fn log_account_unlocked(user_id: &str) {
    crate::security_event!(
        SecurityEvent::AccountUnlocked,
        user_id = %user_id,
        "Account unlocked"
    );
}

fn log_reset_requested(user_id: &str) {
    crate::security_event!(
        SecurityEvent::PasswordResetRequested,
        user_id = %user_id,
        "Password reset requested"
    );
}

fn log_password_changed(user_id: &str) {
    crate::security_event!(
        SecurityEvent::PasswordChanged,
        user_id = %user_id,
        "Password changed via reset token"
    );
}

fn log_verification_requested(user_id: &str) {
    crate::security_event!(
        SecurityEvent::EmailVerificationRequested,
        user_id = %user_id,
        "Email verification requested"
    );
}

fn log_email_verified(user_id: &str) {
    crate::security_event!(
        SecurityEvent::EmailVerified,
        user_id = %user_id,
        "Email address verified"
    );
}

// ============================================================================
// Tests
// ============================================================================
