//! Cent-denominated amounts.
//!
//! All reward amounts are integer cents; formatting is only for
//! customer-facing notification variables.

/// Format an amount in cents as a dollar string, e.g. `1000` → `$10.00`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
