// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifier generation.

use rand::Rng;
use uuid::Uuid;

use crate::error::MindMapError;

/// Character set used by [`generate_random_string`] callers that have no preference.
pub const DEFAULT_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length used by [`generate_random_string`] callers that have no preference.
pub const DEFAULT_RANDOM_LENGTH: usize = 12;

/// Creates a process-unique node identifier.
#[must_use]
pub fn create_uid() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a random string of `length` characters drawn from `charset`.
///
/// # Errors
///
/// Returns [`MindMapError::InvalidParameter`] when `length` is zero or
/// `charset` is empty.
pub fn generate_random_string(length: usize, charset: &str) -> Result<String, MindMapError> {
    if length == 0 {
        return Err(MindMapError::InvalidParameter {
            name: "length",
            reason: "must be a positive integer",
        });
    }
    let chars: Vec<char> = charset.chars().collect();
    if chars.is_empty() {
        return Err(MindMapError::InvalidParameter {
            name: "charset",
            reason: "must not be empty",
        });
    }
    let mut rng = rand::thread_rng();
    Ok((0..length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uids_are_distinct() {
        let a = create_uid();
        let b = create_uid();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn random_string_respects_length_and_charset() {
        let s = generate_random_string(DEFAULT_RANDOM_LENGTH, DEFAULT_CHARSET).unwrap();
        assert_eq!(s.chars().count(), DEFAULT_RANDOM_LENGTH);
        assert!(s.chars().all(|c| DEFAULT_CHARSET.contains(c)));

        let only_x = generate_random_string(5, "x").unwrap();
        assert_eq!(only_x, "xxxxx");
    }

    #[test]
    fn zero_length_fails_fast() {
        let err = generate_random_string(0, DEFAULT_CHARSET).unwrap_err();
        assert!(matches!(
            err,
            MindMapError::InvalidParameter { name: "length", .. }
        ));
    }

    #[test]
    fn empty_charset_fails_fast() {
        let err = generate_random_string(4, "").unwrap_err();
        assert!(matches!(
            err,
            MindMapError::InvalidParameter { name: "charset", .. }
        ));
    }
}
