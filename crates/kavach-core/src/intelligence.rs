//! Intelligence aggregator: merges a per-turn indicator delta into a session's
//! accumulated intelligence, deduplicating by normalized value.
//!
//! Normalization per category:
//! - phone numbers: digits only, reduced to the last [`PHONE_SIGNIFICANT_DIGITS`] so that
//!   `+91-9876543210`, `09876543210` and `9876543210` collapse to one entry
//! - bank accounts: digits only when the value is purely numeric with separators,
//!   otherwise lowercased with whitespace removed (IFSC-style alphanumeric ids)
//! - UPI ids, links, keywords: trimmed, lowercased, inner whitespace collapsed
//!
//! Merge is a set union: commutative, idempotent, and never removes entries.

use crate::types::{ExtractedIntelligence, IndicatorKind};

/// National significant number length kept for phone numbers.
pub const PHONE_SIGNIFICANT_DIGITS: usize = 10;

/// Separators tolerated inside a purely numeric identifier.
const NUMERIC_SEPARATORS: &[char] = &[' ', '-', '.', '/', '(', ')', '+', '_'];

/// Canonical form of `raw` for `kind`, or `None` if nothing meaningful remains.
pub fn normalize(kind: IndicatorKind, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let out = match kind {
        IndicatorKind::PhoneNumber => normalize_phone(trimmed),
        IndicatorKind::BankAccount => normalize_account(trimmed),
        IndicatorKind::UpiId | IndicatorKind::PhishingLink | IndicatorKind::SuspiciousKeyword => {
            collapse_lower(trimmed)
        }
    };
    (!out.is_empty()).then_some(out)
}

fn normalize_phone(s: &str) -> String {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > PHONE_SIGNIFICANT_DIGITS {
        digits[digits.len() - PHONE_SIGNIFICANT_DIGITS..].to_string()
    } else {
        digits
    }
}

fn normalize_account(s: &str) -> String {
    let numeric = s
        .chars()
        .all(|c| c.is_ascii_digit() || NUMERIC_SEPARATORS.contains(&c));
    if numeric {
        s.chars().filter(|c| c.is_ascii_digit()).collect()
    } else {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    }
}

fn collapse_lower(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized copy of a raw delta (duplicates inside the delta collapse too).
pub fn normalized(delta: &ExtractedIntelligence) -> ExtractedIntelligence {
    let mut out = ExtractedIntelligence::default();
    union_into(&mut out, delta);
    out
}

/// Merge `delta` into `accumulated`, returning the merged record.
pub fn merge(accumulated: &ExtractedIntelligence, delta: &ExtractedIntelligence) -> ExtractedIntelligence {
    let mut out = accumulated.clone();
    union_into(&mut out, delta);
    out
}

/// In-place union. Returns how many new indicators were added.
pub fn union_into(accumulated: &mut ExtractedIntelligence, delta: &ExtractedIntelligence) -> usize {
    let mut added = 0;
    for kind in IndicatorKind::ALL {
        let incoming: Vec<String> = delta
            .set(kind)
            .iter()
            .filter_map(|v| normalize(kind, v))
            .collect();
        let target = accumulated.set_mut(kind);
        for value in incoming {
            if target.insert(value) {
                added += 1;
            }
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(kind: IndicatorKind, values: &[&str]) -> ExtractedIntelligence {
        let mut d = ExtractedIntelligence::default();
        d.set_mut(kind).extend(values.iter().map(|v| v.to_string()));
        d
    }

    #[test]
    fn upi_ids_are_case_and_whitespace_insensitive() {
        let d = delta(IndicatorKind::UpiId, &["John@Bank", " john@bank "]);
        let merged = merge(&ExtractedIntelligence::default(), &d);
        assert_eq!(merged.upi_ids.len(), 1);
        assert!(merged.upi_ids.contains("john@bank"));
    }

    #[test]
    fn phone_formats_collapse_to_one_entry() {
        let turn1 = delta(IndicatorKind::PhoneNumber, &["+91-9876543210"]);
        let turn2 = delta(IndicatorKind::PhoneNumber, &["9876543210"]);
        let acc = merge(&ExtractedIntelligence::default(), &turn1);
        let acc = merge(&acc, &turn2);
        assert_eq!(acc.phone_numbers.len(), 1);
        assert!(acc.phone_numbers.contains("9876543210"));

        assert_eq!(normalize(IndicatorKind::PhoneNumber, "098765 43210").as_deref(), Some("9876543210"));
        assert_eq!(normalize(IndicatorKind::PhoneNumber, "(555) 0100").as_deref(), Some("5550100"));
    }

    #[test]
    fn bank_accounts_numeric_and_alphanumeric() {
        assert_eq!(
            normalize(IndicatorKind::BankAccount, "1234-5678 9012").as_deref(),
            Some("123456789012")
        );
        assert_eq!(
            normalize(IndicatorKind::BankAccount, "SBIN0001234 / 00012345").as_deref(),
            Some("sbin0001234/00012345")
        );
    }

    #[test]
    fn keywords_collapse_inner_whitespace() {
        assert_eq!(
            normalize(IndicatorKind::SuspiciousKeyword, "  Account   BLOCKED ").as_deref(),
            Some("account blocked")
        );
    }

    #[test]
    fn blank_values_are_dropped() {
        let d = delta(IndicatorKind::PhishingLink, &["   ", ""]);
        assert!(normalized(&d).is_empty());
        assert_eq!(normalize(IndicatorKind::PhoneNumber, "call me"), None);
    }

    #[test]
    fn merge_is_idempotent() {
        let d = delta(IndicatorKind::PhishingLink, &["http://Evil.example/Pay"]);
        let once = merge(&ExtractedIntelligence::default(), &d);
        let twice = merge(&once, &d);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_is_commutative() {
        let a = delta(IndicatorKind::UpiId, &["a@x", "B@y"]);
        let b = delta(IndicatorKind::UpiId, &["b@y", "c@z"]);
        let base = ExtractedIntelligence::default();
        assert_eq!(merge(&merge(&base, &a), &b), merge(&merge(&base, &b), &a));
    }

    #[test]
    fn union_reports_only_new_entries() {
        let mut acc = ExtractedIntelligence::default();
        let d = delta(IndicatorKind::SuspiciousKeyword, &["urgent", "KYC"]);
        assert_eq!(union_into(&mut acc, &d), 2);
        assert_eq!(union_into(&mut acc, &d), 0);
        assert_eq!(acc.total(), 2);
    }
}
