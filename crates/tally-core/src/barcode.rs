//! Barcode candidates for products created without one.
//!
//! A candidate is the last 6 digits of the Unix timestamp followed by 6
//! random digits (100000-999999). The caller checks uniqueness and retries
//! up to [`crate::BARCODE_MAX_ATTEMPTS`] times before using
//! [`fallback_barcode`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds a 12-digit candidate from a timestamp and a random source.
pub fn candidate_from(now: DateTime<Utc>, random: u128) -> String {
    let ts = now.timestamp().unsigned_abs() % 1_000_000;
    let random_part = 100_000 + (random % 900_000) as u64;
    format!("{ts:06}{random_part}")
}

/// A fresh candidate using the current time and a v4 UUID as entropy.
pub fn candidate(now: DateTime<Utc>) -> String {
    candidate_from(now, Uuid::new_v4().as_u128())
}

/// First 12 decimal digits of a random UUID's integer value.
pub fn fallback_barcode() -> String {
    let digits = Uuid::new_v4().as_u128().to_string();
    digits.chars().take(12).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candidate_layout() {
        let now = Utc.timestamp_opt(1_760_000_123, 0).unwrap();
        assert_eq!(candidate_from(now, 0), "000123100000");
        assert_eq!(candidate_from(now, 899_999), "000123999999");
        assert_eq!(candidate_from(now, 900_000), "000123100000");
    }

    #[test]
    fn test_candidates_are_numeric_12_digits() {
        for _ in 0..50 {
            let code = candidate(Utc::now());
            assert_eq!(code.len(), 12);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
        let fallback = fallback_barcode();
        assert_eq!(fallback.len(), 12);
        assert!(fallback.chars().all(|c| c.is_ascii_digit()));
    }
}
