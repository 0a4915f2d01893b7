//! Cryptographic utilities for secure operations
//!
//! ## Security Patterns
//!
//! - **Constant-Time Comparison**: Prevents timing attacks when matching
//!   stored single-use tokens (password reset, email verification)

use subtle::ConstantTimeEq;

/// Performs constant-time comparison of two byte slices.
///
/// ## Security Rationale
///
/// Standard comparison (`==`) uses early-exit optimization: it returns
/// `false` as soon as it finds a mismatching byte. This creates a timing
/// side-channel where an attacker can measure response times to
/// progressively discover a stored reset or verification token one byte
/// at a time.
///
/// The `subtle` crate provides cryptographic constant-time operations:
/// the comparison takes the same amount of time regardless of where (or
/// if) the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Performs constant-time comparison of two strings.
///
/// Convenience wrapper around `constant_time_eq` for string comparisons.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stored reset/verification tokens are 43-char alphanumeric strings;
    // exercise that length class, with mismatches at either end.
    const STORED: &str = "q3XK9mTbZ7wRdA2nLcVy5HsJ0gPfE8uW1oBiN6kMxS4";

    #[test]
    fn test_matching_token_accepted() {
        let presented = STORED.to_string();
        assert!(constant_time_str_eq(STORED, &presented));
        assert!(constant_time_eq(STORED.as_bytes(), presented.as_bytes()));
    }

    #[test]
    fn test_mismatch_position_is_irrelevant() {
        let first_differs = format!("Z{}", &STORED[1..]);
        let last_differs = format!("{}Z", &STORED[..STORED.len() - 1]);
        assert!(!constant_time_str_eq(STORED, &first_differs));
        assert!(!constant_time_str_eq(STORED, &last_differs));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        // A truncated or padded presentation never matches.
        assert!(!constant_time_str_eq(STORED, &STORED[..42]));
        assert!(!constant_time_eq(STORED.as_bytes(), b""));
        assert!(constant_time_eq(b"", b""));
    }
}
