//! # Portcullis
//!
//! Credential lifecycle management: signed session tokens and
//! account-security policy enforcement.
//!
//! This crate owns the two halves of a login system that sit between
//! password hashing (delegated to the caller) and transport (out of
//! scope):
//!
//! - **Session tokens**: HMAC-signed tokens carrying subject, issue
//!   time, and millisecond-precision expiry, plus longer-lived refresh
//!   tokens derived from the same configuration.
//! - **Account security** (AC-7): failed-attempt tracking with
//!   threshold lockout, single-use password-reset tokens with expiry,
//!   and single-use email-verification tokens.
//!
//! ## Features
//!
//! - **Token Service**: issue, validate, and introspect signed tokens;
//!   signature and expiry are checked independently, so an expired
//!   token is still distinguishable from a forged one
//! - **Lockout Policy**: atomic failure counting with no lost updates
//!   under concurrent attempts
//! - **Single-Use Tokens**: constant-time matching, consumed on redemption
//! - **Structured Logging**: every security-relevant transition emits a
//!   [`security_event!`] audit record via `tracing`
//! - **Pluggable Storage**: the [`UserStore`] trait abstracts record
//!   persistence; an in-memory implementation is included
//!
//! ## Quick Start
//!
//! ```
//! use portcullis::{
//!     AccountSecurity, CredentialConfig, MemoryUserStore, SecurityPolicy,
//!     TokenService, UserSecurityRecord, UserStore,
//! };
//!
//! let config = CredentialConfig::builder("a-signing-secret-of-at-least-32-bytes")
//!     .lockout_threshold(5)
//!     .build();
//!
//! let tokens = TokenService::new(&config).unwrap();
//!
//! let store = MemoryUserStore::new();
//! store.insert(UserSecurityRecord::new(
//!     "user-1",
//!     "alice@example.com",
//!     "alice",
//!     "stored-credential-hash",
//! ));
//! let accounts = AccountSecurity::new(store, SecurityPolicy::from_config(&config));
//!
//! // The caller brings its own hash verification.
//! let session = accounts
//!     .login(&tokens, "alice", |hash| hash == "stored-credential-hash")
//!     .unwrap();
//!
//! assert_eq!(tokens.extract_subject(&session.access_token).unwrap(), "user-1");
//! assert!(tokens.is_refresh_token(&session.refresh_token));
//! ```
//!
//! ## What This Crate Does Not Do
//!
//! No password hashing, no HTTP surface, no email delivery, no
//! key rotation. Reset and verification tokens are returned to the
//! caller for delivery; credential hashes pass through opaquely.

pub mod account;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod prelude;
pub mod store;
pub mod token;

// Re-exports
pub use account::{AccountSecurity, SecurityPolicy, SessionTokens};
pub use config::{CredentialConfig, CredentialConfigBuilder, MIN_SECRET_BYTES, REFRESH_TTL_MULTIPLIER};
pub use crypto::{constant_time_eq, constant_time_str_eq};
pub use error::AuthError;
pub use events::{SecurityEvent, Severity};
pub use store::{MemoryUserStore, UserSecurityRecord, UserStore};
pub use token::{Claims, TokenService, TOKEN_TYPE_REFRESH};
