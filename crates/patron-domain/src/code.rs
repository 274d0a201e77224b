//! Referral code rules.
//!
//! Codes are short, uppercase, human-typeable strings like `ALICE0001`:
//! a name-derived prefix followed by four digits. Generation is
//! deterministic in (name, customer id) so retries of the activation
//! stage propose the same code; the probe counter steps the numeric
//! suffix when the unique constraint reports a collision.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Length of the name-derived prefix.
const PREFIX_LEN: usize = 5;

/// Prefix used when a name yields no usable characters.
const FALLBACK_PREFIX: &str = "FRIEND";

/// Normalize a code as typed by a customer: trim, uppercase, drop
/// anything that is not ASCII alphanumeric.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A normalized code is usable if it has at least one letter and fits
/// on a gift card sleeve.
pub fn is_plausible(code: &str) -> bool {
    !code.is_empty() && code.len() <= 16 && code.chars().any(|c| c.is_ascii_alphabetic())
}

/// The `probe`-th candidate code for a customer. Probe 0 is the
/// canonical code; higher probes are collision retries.
pub fn candidate(name: &str, customer_id: &str, probe: u32) -> String {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .take(PREFIX_LEN)
        .collect();
    let prefix = if prefix.is_empty() {
        FALLBACK_PREFIX.chars().take(PREFIX_LEN).collect()
    } else {
        prefix
    };

    let mut hasher = DefaultHasher::new();
    customer_id.hash(&mut hasher);
    let seed = (hasher.finish() % 10_000) as u32;
    let suffix = (seed + probe) % 10_000;

    format!("{prefix}{suffix:04}")
}
