//! Portcullis Prelude - Common imports for credential handling
//!
//! Re-exports the types most applications need, providing a convenient
//! single import.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::prelude::*;
//!
//! let config = CredentialConfig::from_env().expect("JWT_SECRET not set");
//! let tokens = TokenService::new(&config)?;
//! ```

// =============================================================================
// Configuration
// =============================================================================

pub use crate::config::{CredentialConfig, CredentialConfigBuilder};

// =============================================================================
// Session Tokens
// =============================================================================

pub use crate::token::{Claims, TokenService, TOKEN_TYPE_REFRESH};

// =============================================================================
// Account Security (AC-7)
// =============================================================================

pub use crate::account::{AccountSecurity, SecurityPolicy, SessionTokens};

// =============================================================================
// Storage
// =============================================================================

pub use crate::store::{MemoryUserStore, UserSecurityRecord, UserStore};

// =============================================================================
// Errors and Events
// =============================================================================

pub use crate::error::AuthError;
pub use crate::events::{SecurityEvent, Severity};
pub use crate::security_event;

// =============================================================================
// External Re-exports for Convenience
// =============================================================================

// Tracing for logging
pub use tracing::{debug, error, info, instrument, trace, warn};
