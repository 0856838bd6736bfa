//! Allowlist of exact addresses and CIDR ranges.
//!
//! Evaluation is an OR over all entries, so entry order never changes the
//! result. An entry matches when it equals the visitor address exactly or,
//! for entries containing `/`, when the address lies in the range.

use std::net::IpAddr;

use tracing::warn;

use super::cidr::CidrRange;
use crate::LOG_TARGET;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    /// Plain entry, matched by string and by parsed address
    Exact { raw: String, addr: Option<IpAddr> },
    /// Entry with a `/`; `range` is `None` when malformed
    Range { raw: String, range: Option<CidrRange> },
}

/// Pre-parsed allowlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    entries: Vec<Entry>,
}

impl Allowlist {
    /// Build from raw entries. Entries are trimmed and empty ones skipped.
    ///
    /// Malformed CIDR entries are logged as warnings and kept; they never match.
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let entries = entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .map(|raw| {
                if raw.contains('/') {
                    let range = CidrRange::parse(raw);
                    if range.is_none() {
                        warn!(target: LOG_TARGET, entry = %raw, "Invalid CIDR range in whitelist, it will never match");
                    }
                    Entry::Range {
                        raw: raw.to_string(),
                        range,
                    }
                } else {
                    Entry::Exact {
                        raw: raw.to_string(),
                        addr: raw.parse().ok(),
                    }
                }
            })
            .collect();

        Self { entries }
    }

    /// Parse a comma-separated list (the `whitelist` option format).
    pub fn from_csv(list: &str) -> Self {
        let entries: Vec<&str> = list.split(',').collect();
        Self::new(&entries)
    }

    /// Check whether an address matches any entry.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        let text = ip.to_string();

        self.entries.iter().any(|entry| match entry {
            Entry::Exact { raw, addr } => *raw == text || addr.as_ref() == Some(ip),
            Entry::Range { range, .. } => range.as_ref().is_some_and(|r| r.contains(ip)),
        })
    }

    /// Trimmed entries as configured.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| match entry {
            Entry::Exact { raw, .. } | Entry::Range { raw, .. } => raw.as_str(),
        })
    }

    /// Number of non-empty entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One-shot evaluation of `ip` against raw entries.
pub fn is_allowed<S: AsRef<str>>(ip: &IpAddr, entries: &[S]) -> bool {
    Allowlist::new(entries).contains(ip)
}
