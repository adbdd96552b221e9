//! Gap-free entry numbering per journal type.

use serde::{Deserialize, Serialize};

use super::types::JournalType;

/// A journal type together with its next sequence number.
///
/// Numbers are only consumed by successful postings: the owning book is
/// mutated inside the same transaction as the entry it numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalSequence {
    /// The journal type.
    pub journal_type: JournalType,
    /// Next number to hand out, starting at 1.
    pub next_number: u64,
}

impl JournalSequence {
    /// Starts a fresh sequence.
    #[must_use]
    pub const fn new(journal_type: JournalType) -> Self {
        Self {
            journal_type,
            next_number: 1,
        }
    }

    /// Formats the number `n` as `{prefix}{n:06}`.
    #[must_use]
    pub fn format(&self, n: u64) -> String {
        format!("{}{n:06}", self.journal_type.prefix)
    }

    /// Returns the next number and its formatted entry number.
    pub fn assign(&mut self) -> (u64, String) {
        let n = self.next_number;
        self.next_number += 1;
        (n, self.format(n))
    }
}
