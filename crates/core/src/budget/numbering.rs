//! Budget document numbering.
//!
//! Numbers are `{prefix}-{year}-{n:05}`, sequential per document kind and
//! year within a company. A number is only consumed by a committed document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of numbered budget documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Budget availability certificate.
    Cdp,
    /// Budget commitment.
    Rp,
    /// Obligation.
    Obligation,
    /// Payment.
    Payment,
    /// Budget modification.
    Modification,
}

impl DocumentKind {
    /// Number prefix of the kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Cdp => "CDP",
            Self::Rp => "RP",
            Self::Obligation => "OB",
            Self::Payment => "PG",
            Self::Modification => "MP",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Per-kind, per-year counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentNumbering {
    last: BTreeMap<(DocumentKind, i32), u32>,
}

impl DocumentNumbering {
    /// Hands out the next number for `kind` in `year`.
    pub fn next(&mut self, kind: DocumentKind, year: i32) -> String {
        let number = self.peek(kind, year);
        *self.last.entry((kind, year)).or_insert(0) += 1;
        number
    }

    /// The number [`Self::next`] would hand out, without consuming it.
    #[must_use]
    pub fn peek(&self, kind: DocumentKind, year: i32) -> String {
        format!("{}-{year}-{:05}", kind.prefix(), self.last(kind, year) + 1)
    }

    /// Last number handed out for `kind` in `year`, 0 if none.
    #[must_use]
    pub fn last(&self, kind: DocumentKind, year: i32) -> u32 {
        self.last.get(&(kind, year)).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_are_sequential_per_kind() {
        let mut numbering = DocumentNumbering::default();
        assert_eq!(numbering.next(DocumentKind::Cdp, 2026), "CDP-2026-00001");
        assert_eq!(numbering.next(DocumentKind::Cdp, 2026), "CDP-2026-00002");
        assert_eq!(numbering.next(DocumentKind::Rp, 2026), "RP-2026-00001");
        assert_eq!(numbering.last(DocumentKind::Cdp, 2026), 2);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut numbering = DocumentNumbering::default();
        assert_eq!(numbering.peek(DocumentKind::Obligation, 2026), "OB-2026-00001");
        assert_eq!(numbering.peek(DocumentKind::Obligation, 2026), "OB-2026-00001");
        assert_eq!(numbering.next(DocumentKind::Obligation, 2026), "OB-2026-00001");
        assert_eq!(numbering.peek(DocumentKind::Obligation, 2026), "OB-2026-00002");
    }

    #[test]
    fn test_year_restarts_sequence() {
        let mut numbering = DocumentNumbering::default();
        numbering.next(DocumentKind::Payment, 2025);
        assert_eq!(numbering.next(DocumentKind::Payment, 2026), "PG-2026-00001");
        assert_eq!(numbering.next(DocumentKind::Obligation, 2026), "OB-2026-00001");
        assert_eq!(numbering.next(DocumentKind::Modification, 2026), "MP-2026-00001");
    }
}
