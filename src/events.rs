//! Security Event Logging
//!
//! Structured logging for security-relevant events in the credential
//! lifecycle: authentication outcomes, lockouts, token issuance and
//! rejection, and single-use token flows.
//!
//! Events carry a category and a severity; the [`security_event!`] macro
//! maps severity onto `tracing` levels so operators can filter audit
//! records without parsing message text. Specific failure reasons belong
//! here, in the logs - user-facing errors stay generic (see
//! [`crate::error::AuthError`]).
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::events::SecurityEvent;
//! use portcullis::security_event;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     identifier = %identifier,
//!     failed_attempts = attempts,
//!     "Login failed"
//! );
//! ```

use std::fmt;

/// Security event categories for audit logging.
///
/// Covers the auditable events this crate itself produces. Applications
/// embedding the crate should define their own enum for events outside
/// the credential lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Successful user authentication
    AuthenticationSuccess,
    /// Failed authentication attempt
    AuthenticationFailure,

    // Lockout events
    /// Account locked after reaching the failure threshold
    AccountLocked,
    /// Account unlocked by administrative action
    AccountUnlocked,

    // Token events
    /// Access or refresh token issued
    TokenIssued,
    /// Token failed signature or structural validation
    TokenRejected,

    // Single-use token flows
    /// Password reset requested
    PasswordResetRequested,
    /// Password changed via reset-token redemption
    PasswordChanged,
    /// Email verification requested
    EmailVerificationRequested,
    /// Email address verified
    EmailVerified,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure => "authentication",

            Self::AccountLocked | Self::AccountUnlocked => "security",

            Self::TokenIssued | Self::TokenRejected => "token",

            Self::PasswordResetRequested
            | Self::PasswordChanged
            | Self::EmailVerificationRequested
            | Self::EmailVerified => "user_management",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            // High - security-relevant failures
            Self::AuthenticationFailure | Self::AccountLocked | Self::TokenRejected => {
                Severity::High
            }

            // Medium - important state changes
            Self::AuthenticationSuccess
            | Self::AccountUnlocked
            | Self::PasswordResetRequested
            | Self::PasswordChanged
            | Self::EmailVerificationRequested
            | Self::EmailVerified => Severity::Medium,

            // Low - routine operations
            Self::TokenIssued => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
            Self::TokenIssued => "token_issued",
            Self::TokenRejected => "token_rejected",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::PasswordChanged => "password_changed",
            Self::EmailVerificationRequested => "email_verification_requested",
            Self::EmailVerified => "email_verified",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
    /// Immediate attention required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// The macro automatically includes:
/// - `security_event`: Event type name
/// - `category`: Event category
/// - `severity`: Event severity level
///
/// # Examples
///
/// ```ignore
/// security_event!(
///     SecurityEvent::AccountLocked,
///     user_id = %user_id,
///     failed_attempts = attempts,
///     "Account locked after failed login attempts"
/// );
/// ```
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::events::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::events::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::events::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::events::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use crate::security_event;
