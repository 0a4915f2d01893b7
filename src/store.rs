//! User record persistence boundary
//!
//! The account-security state machine reads and mutates a persisted
//! [`UserSecurityRecord`] through the [`UserStore`] trait. The trait has
//! key-value semantics - lookups by unique keys, point updates scoped to
//! one user - and deliberately prescribes no storage engine.
//!
//! # Storage Note
//!
//! [`MemoryUserStore`] is the reference implementation, suitable for
//! tests and single-instance deployments. For PostgreSQL, Redis, or
//! another shared backend, implement [`UserStore`] over that store;
//! each [`UserStore::update`] call maps naturally onto a single
//! transactional `UPDATE ... WHERE user_id = $1` statement.
//!
//! # Concurrency Contract
//!
//! [`UserStore::update`] is the single mutation entry point, and an
//! implementation MUST serialize closure execution per user id. The
//! failed-login counter is a read-modify-write against shared state;
//! without serialization, concurrent failures from the same account (a
//! plausible brute-force scenario) could lose updates and never reach
//! the lockout threshold.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

// ============================================================================
// User Security Record
// ============================================================================

/// The security-relevant slice of a persisted user record.
///
/// Created at registration with all security fields at defaults, mutated
/// by every authentication/reset/verification transition, never deleted
/// by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSecurityRecord {
    /// Unique identifier, immutable
    pub user_id: String,

    /// Unique lookup key
    pub email: String,

    /// Unique lookup key
    pub username: String,

    /// Credential hash. Opaque to this crate: it never sees or computes
    /// plaintext or hashes, only stores what the caller provides.
    pub hashed_password: String,

    /// Consecutive failed authentication attempts
    pub failed_login_attempts: u32,

    /// Whether the account is barred from authenticating
    pub account_locked: bool,

    /// Pending single-use password-reset token; both fields set or both
    /// `None`
    pub password_reset_token: Option<String>,
    pub password_reset_token_expiry: Option<DateTime<Utc>>,

    /// Whether the email address has been verified (irreversible)
    pub email_verified: bool,

    /// Pending single-use verification token; `None` once verified
    pub email_verification_token: Option<String>,

    /// Last successful authentication
    pub last_login: Option<DateTime<Utc>>,
}

impl UserSecurityRecord {
    /// Create a record with all security fields at their defaults.
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            username: username.into(),
            hashed_password: hashed_password.into(),
            failed_login_attempts: 0,
            account_locked: false,
            password_reset_token: None,
            password_reset_token_expiry: None,
            email_verified: false,
            email_verification_token: None,
            last_login: None,
        }
    }

    /// Record one more failed attempt.
    pub fn increment_failed_attempts(&mut self) {
        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
    }

    /// Clear the failure counter.
    pub fn reset_failed_attempts(&mut self) {
        self.failed_login_attempts = 0;
    }

    /// Bar the account from authenticating.
    pub fn lock_account(&mut self) {
        self.account_locked = true;
    }

    /// Unlock the account. The counter resets on every locked-to-unlocked
    /// transition.
    pub fn unlock_account(&mut self) {
        self.account_locked = false;
        self.reset_failed_attempts();
    }

    /// Whether a stored reset token exists and has not expired.
    pub fn has_valid_reset_token(&self, now: DateTime<Utc>) -> bool {
        matches!(
            (&self.password_reset_token, self.password_reset_token_expiry),
            (Some(_), Some(expiry)) if now < expiry
        )
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Persistence boundary for user security records.
///
/// Lookups return a snapshot clone; all mutation goes through
/// [`Self::update`], which serializes read-modify-write per user id (see
/// the module docs for why).
pub trait UserStore: Send + Sync {
    /// Lookup by unique identifier.
    fn find_by_id(&self, user_id: &str) -> Option<UserSecurityRecord>;

    /// Lookup by email.
    fn find_by_email(&self, email: &str) -> Option<UserSecurityRecord>;

    /// Lookup by username.
    fn find_by_username(&self, username: &str) -> Option<UserSecurityRecord>;

    /// Lookup by email or username, whichever matches.
    fn find_by_email_or_username(&self, identifier: &str) -> Option<UserSecurityRecord>;

    /// Lookup by a password-reset token that has not expired as of `now`.
    fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Option<UserSecurityRecord>;

    /// Lookup by email-verification token.
    fn find_by_verification_token(&self, token: &str) -> Option<UserSecurityRecord>;

    /// All currently locked accounts.
    fn locked_accounts(&self) -> Vec<UserSecurityRecord>;

    /// Insert a new record. Registration is an external concern; this
    /// exists for embedding applications and tests.
    fn insert(&self, record: UserSecurityRecord);

    /// Run `mutate` against the record for `user_id` as one serialized
    /// step, and return the post-mutation record.
    ///
    /// Returns `None` when no such record exists; `mutate` is not called
    /// in that case. The closure must be scoped to exactly this record
    /// and must not touch other users.
    fn update(
        &self,
        user_id: &str,
        mutate: &mut dyn FnMut(&mut UserSecurityRecord),
    ) -> Option<UserSecurityRecord>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory [`UserStore`] keyed by user id.
///
/// A single map lock serializes every `update` - stronger than the
/// per-user requirement, and fine at the scale this store targets.
/// Secondary-key lookups scan under the read lock; a database
/// implementation would use unique indexes instead.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: RwLock<HashMap<String, UserSecurityRecord>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn find_where(
        &self,
        pred: impl Fn(&UserSecurityRecord) -> bool,
    ) -> Option<UserSecurityRecord> {
        self.records.read().values().find(|r| pred(r)).cloned()
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_id(&self, user_id: &str) -> Option<UserSecurityRecord> {
        self.records.read().get(user_id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<UserSecurityRecord> {
        self.find_where(|r| r.email == email)
    }

    fn find_by_username(&self, username: &str) -> Option<UserSecurityRecord> {
        self.find_where(|r| r.username == username)
    }

    fn find_by_email_or_username(&self, identifier: &str) -> Option<UserSecurityRecord> {
        self.find_where(|r| r.email == identifier || r.username == identifier)
    }

    fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Option<UserSecurityRecord> {
        self.find_where(|r| {
            r.password_reset_token.as_deref() == Some(token) && r.has_valid_reset_token(now)
        })
    }

    fn find_by_verification_token(&self, token: &str) -> Option<UserSecurityRecord> {
        self.find_where(|r| r.email_verification_token.as_deref() == Some(token))
    }

    fn locked_accounts(&self) -> Vec<UserSecurityRecord> {
        self.records
            .read()
            .values()
            .filter(|r| r.account_locked)
            .cloned()
            .collect()
    }

    fn insert(&self, record: UserSecurityRecord) {
        self.records.write().insert(record.user_id.clone(), record);
    }

    fn update(
        &self,
        user_id: &str,
        mutate: &mut dyn FnMut(&mut UserSecurityRecord),
    ) -> Option<UserSecurityRecord> {
        // Write lock held across the closure: this is the serialization
        // the trait contract requires.
        let mut records = self.records.write();
        let record = records.get_mut(user_id)?;
        mutate(record);
        Some(record.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn sample(user_id: &str, email: &str, username: &str) -> UserSecurityRecord {
        UserSecurityRecord::new(user_id, email, username, "hash")
    }

    #[test]
    fn test_record_defaults() {
        let record = sample("u1", "alice@example.com", "alice");
        assert_eq!(record.failed_login_attempts, 0);
        assert!(!record.account_locked);
        assert!(!record.email_verified);
        assert!(record.password_reset_token.is_none());
        assert!(record.password_reset_token_expiry.is_none());
        assert!(record.email_verification_token.is_none());
        assert!(record.last_login.is_none());
    }

    #[test]
    fn test_unlock_resets_counter() {
        let mut record = sample("u1", "alice@example.com", "alice");
        record.increment_failed_attempts();
        record.increment_failed_attempts();
        record.lock_account();

        record.unlock_account();
        assert!(!record.account_locked);
        assert_eq!(record.failed_login_attempts, 0);
    }

    #[test]
    fn test_lookups() {
        let store = MemoryUserStore::new();
        store.insert(sample("u1", "alice@example.com", "alice"));
        store.insert(sample("u2", "bob@example.com", "bob"));

        assert!(store.find_by_id("u1").is_some());
        assert!(store.find_by_id("u3").is_none());
        assert_eq!(store.find_by_email("bob@example.com").unwrap().user_id, "u2");
        assert_eq!(store.find_by_username("alice").unwrap().user_id, "u1");
        assert_eq!(
            store.find_by_email_or_username("alice@example.com").unwrap().user_id,
            "u1"
        );
        assert_eq!(store.find_by_email_or_username("bob").unwrap().user_id, "u2");
        assert!(store.find_by_email_or_username("nobody").is_none());
    }

    #[test]
    fn test_valid_reset_token_lookup_excludes_expired() {
        let store = MemoryUserStore::new();
        let now = Utc::now();

        let mut live = sample("u1", "alice@example.com", "alice");
        live.password_reset_token = Some("live-token".to_string());
        live.password_reset_token_expiry = Some(now + ChronoDuration::hours(1));
        store.insert(live);

        let mut stale = sample("u2", "bob@example.com", "bob");
        stale.password_reset_token = Some("stale-token".to_string());
        stale.password_reset_token_expiry = Some(now - ChronoDuration::hours(1));
        store.insert(stale);

        assert!(store.find_by_valid_reset_token("live-token", now).is_some());
        assert!(store.find_by_valid_reset_token("stale-token", now).is_none());
        assert!(store.find_by_valid_reset_token("unknown", now).is_none());
    }

    #[test]
    fn test_verification_token_lookup() {
        let store = MemoryUserStore::new();
        let mut record = sample("u1", "alice@example.com", "alice");
        record.email_verification_token = Some("verify-me".to_string());
        store.insert(record);

        assert_eq!(
            store.find_by_verification_token("verify-me").unwrap().user_id,
            "u1"
        );
        assert!(store.find_by_verification_token("other").is_none());
    }

    #[test]
    fn test_locked_accounts() {
        let store = MemoryUserStore::new();
        let mut locked = sample("u1", "alice@example.com", "alice");
        locked.lock_account();
        store.insert(locked);
        store.insert(sample("u2", "bob@example.com", "bob"));

        let locked = store.locked_accounts();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].user_id, "u1");
    }

    #[test]
    fn test_update_missing_user() {
        let store = MemoryUserStore::new();
        let mut called = false;
        let result = store.update("ghost", &mut |_| called = true);
        assert!(result.is_none());
        assert!(!called);
    }

    #[test]
    fn test_update_returns_post_state() {
        let store = MemoryUserStore::new();
        store.insert(sample("u1", "alice@example.com", "alice"));

        let updated = store
            .update("u1", &mut |u| u.increment_failed_attempts())
            .unwrap();
        assert_eq!(updated.failed_login_attempts, 1);
        assert_eq!(store.find_by_id("u1").unwrap().failed_login_attempts, 1);
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_increments() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(sample("u1", "alice@example.com", "alice"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.update("u1", &mut |u| u.increment_failed_attempts());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.find_by_id("u1").unwrap().failed_login_attempts, 800);
    }
}
