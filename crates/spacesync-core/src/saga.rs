//! Run-scoped transaction log.
//!
//! An ordered stack of compensations, appended after each successful
//! mutation and replayed in reverse on failure. Best effort, not atomic.

use serde::Serialize;

use crate::compensation::Compensation;

#[derive(Debug, Default, Clone, Serialize)]
pub struct TransactionLog {
    entries: Vec<Compensation>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the inverse of a mutation that just succeeded
    pub fn push(&mut self, compensation: Compensation) {
        self.entries.push(compensation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in recording order
    pub fn entries(&self) -> &[Compensation] {
        &self.entries
    }

    /// Consume the log, yielding compensations in rollback (reverse) order
    pub fn into_rollback_order(self) -> impl Iterator<Item = Compensation> {
        self.entries.into_iter().rev()
    }
}
