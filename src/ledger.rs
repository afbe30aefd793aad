//! Committed splits, kept as a stack.
//!
//! Invariants held after every operation:
//! - `cumulative_ms` equals the sum of `segment_ms` over committed entries
//! - `next_index()` equals the number of committed entries
//! - `next_index() <= max_splits`, equality meaning the run is complete

use std::fmt;

use serde::Serialize;

use crate::catalog::ComparisonSplitSet;
use crate::error::{SessionError, SessionResult};
use crate::session::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SplitEntry {
    pub index: usize,
    pub name: String,
    pub segment_ms: u64,
    pub cumulative_ms: u64,
    pub clock_seconds_at_commit: u64,
    pub delta_ms: i64,
}

impl SplitEntry {
    pub fn delta(&self) -> Delta {
        Delta(self.delta_ms)
    }
}

/// Signed difference against the comparison, in milliseconds.
///
/// Displayed as whole seconds, floored on the magnitude: `-` when ahead,
/// `+` when behind or tied. `-300ms` renders `-0:00`, `+5000ms` renders `+0:05`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Delta(pub i64);

impl Delta {
    pub fn between(cumulative_ms: u64, comparison_ms: u64) -> Self {
        let diff = cumulative_ms as i128 - comparison_ms as i128;
        Delta(diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    pub fn is_ahead(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        let secs = self.0.unsigned_abs() / 1000;
        write!(f, "{}{}:{:02}", sign, secs / 60, secs % 60)
    }
}

/// `M:SS.mmm`, as shown in the splits table.
pub fn format_ms(ms: u64) -> String {
    format!("{}:{:02}.{:03}", ms / 60_000, (ms % 60_000) / 1000, ms % 1000)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ledger {
    committed: Vec<SplitEntry>,
    cumulative_ms: u64,
    max_splits: usize,
}

impl Ledger {
    pub fn new(max_splits: usize) -> Self {
        Self {
            committed: Vec::with_capacity(max_splits),
            cumulative_ms: 0,
            max_splits,
        }
    }

    pub fn max_splits(&self) -> usize {
        self.max_splits
    }

    pub fn next_index(&self) -> usize {
        self.committed.len()
    }

    pub fn cumulative_ms(&self) -> u64 {
        self.cumulative_ms
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.max_splits > 0 && self.committed.len() >= self.max_splits
    }

    /// Commit order, oldest first.
    pub fn entries(&self) -> &[SplitEntry] {
        &self.committed
    }

    /// Display order, most recent first.
    pub fn entries_recent_first(&self) -> impl Iterator<Item = &SplitEntry> {
        self.committed.iter().rev()
    }

    pub fn last(&self) -> Option<&SplitEntry> {
        self.committed.last()
    }

    pub fn commit(
        &mut self,
        segment_ms: u64,
        clock_seconds: u64,
        comparison: &ComparisonSplitSet,
    ) -> SessionResult<&SplitEntry> {
        if self.is_complete() {
            return Err(SessionError::illegal("commit", Phase::Completed));
        }
        let index = self.next_index();
        let cumulative_ms = self.cumulative_ms + segment_ms;
        let name = comparison
            .name_at(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Split {}", index + 1));
        let delta = Delta::between(cumulative_ms, comparison.cumulative_at(index));

        self.cumulative_ms = cumulative_ms;
        self.committed.push(SplitEntry {
            index,
            name,
            segment_ms,
            cumulative_ms,
            clock_seconds_at_commit: clock_seconds,
            delta_ms: delta.0,
        });
        Ok(&self.committed[index])
    }

    /// Pop the most recent entry. `None` on an empty ledger.
    pub fn undo(&mut self) -> Option<SplitEntry> {
        let entry = self.committed.pop()?;
        self.cumulative_ms -= entry.segment_ms;
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.cumulative_ms = 0;
    }
}
