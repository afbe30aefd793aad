//! Read-only projection of a session for renderers.

use serde::Serialize;

use crate::catalog::ComparisonMeta;
use crate::clock::format_hms;
use crate::input::DigitEntry;
use crate::ledger::{format_ms, SplitEntry};
use crate::session::{Phase, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitRow {
    pub index: usize,
    pub name: String,
    pub cumulative: String,
    pub segment: String,
    pub delta: String,
    pub ahead: bool,
}

impl From<&SplitEntry> for SplitRow {
    fn from(e: &SplitEntry) -> Self {
        Self {
            index: e.index,
            name: e.name.clone(),
            cumulative: format_ms(e.cumulative_ms),
            segment: format_ms(e.segment_ms),
            delta: e.delta().to_string(),
            ahead: e.delta().is_ahead(),
        }
    }
}

/// The comparison split the next commit will be diffed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextSplit {
    pub index: usize,
    pub name: String,
    pub comparison: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    /// Most recent first.
    pub rows: Vec<SplitRow>,
    pub committed: usize,
    pub max_splits: usize,
    pub cumulative_ms: u64,
    pub cumulative: String,
    pub elapsed_seconds: u64,
    pub clock: String,
    pub clock_running: bool,
    pub comparison: Option<ComparisonMeta>,
    pub next: Option<NextSplit>,
    pub pending_digits: String,
}

impl SessionSnapshot {
    pub fn capture(state: &SessionState, entry: &DigitEntry) -> Self {
        let ledger = state.ledger();
        let clock = state.clock();
        let next = state.comparison().and_then(|cmp| {
            let index = ledger.next_index();
            let split = cmp.splits().get(index)?;
            Some(NextSplit {
                index,
                name: cmp
                    .name_at(index)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Split {}", index + 1)),
                comparison: format_ms(split.cumulative_ms),
            })
        });
        Self {
            phase: state.phase(),
            rows: ledger.entries_recent_first().map(SplitRow::from).collect(),
            committed: ledger.next_index(),
            max_splits: ledger.max_splits(),
            cumulative_ms: ledger.cumulative_ms(),
            cumulative: format_ms(ledger.cumulative_ms()),
            elapsed_seconds: clock.elapsed_seconds(),
            clock: format_hms(clock.elapsed_seconds()),
            clock_running: clock.is_running(),
            comparison: state.comparison().map(|c| c.meta().clone()),
            next,
            pending_digits: entry.digits().render(),
        }
    }

    /// Same snapshot apart from the clock fields.
    pub fn same_except_clock(&self, other: &SessionSnapshot) -> bool {
        let mut a = self.clone();
        a.elapsed_seconds = other.elapsed_seconds;
        a.clock = other.clock.clone();
        a == *other
    }
}

/// Notified after every mutation of the session.
pub trait SessionObserver {
    fn on_change(&mut self, snapshot: &SessionSnapshot);
}

pub fn render_table(s: &SessionSnapshot) -> String {
    let title = s
        .comparison
        .as_ref()
        .map(|c| format!("{} ({} splits, {})", c.display_name, c.splits, format_ms(c.final_ms)))
        .unwrap_or_else(|| "no comparison loaded".to_string());
    let mut out = format!(
        "[{}] {}  rta {}{}  total {}  {}/{}\n",
        s.phase,
        title,
        s.clock,
        if s.clock_running { "" } else { " (stopped)" },
        s.cumulative,
        s.committed,
        s.max_splits,
    );
    out.push_str(&format!(
        "{:<24} {:>11} {:>11} {:>7}\n",
        "split", "time", "segment", "delta"
    ));
    for row in &s.rows {
        out.push_str(&format!(
            "{:<24} {:>11} {:>11} {:>7}\n",
            row.name, row.cumulative, row.segment, row.delta
        ));
    }
    if let Some(next) = &s.next {
        out.push_str(&format!(
            "next: {} (comparison {})  entry {}\n",
            next.name, next.comparison, s.pending_digits
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_split_set, ComparisonEntry};
    use crate::session::SessionEvent;

    fn state() -> SessionState {
        let entry = ComparisonEntry {
            display_name: "WR".to_string(),
            key: "wr.csv".to_string(),
        };
        let set = parse_split_set(&entry, "split,time\nFirst,1\nSecond,2\nThird,3\n").unwrap();
        let mut s = SessionState::new();
        s.install_comparison(set).unwrap();
        s
    }

    #[test]
    fn test_snapshot_rows_most_recent_first() {
        let mut s = state();
        s.reduce(SessionEvent::Start).unwrap();
        s.reduce(SessionEvent::Commit(1_200)).unwrap();
        s.reduce(SessionEvent::Commit(1_900)).unwrap();
        let snap = SessionSnapshot::capture(&s, &DigitEntry::new());
        assert_eq!(snap.rows[0].name, "Second");
        assert_eq!(snap.rows[0].cumulative, "0:03.100");
        assert_eq!(snap.rows[1].segment, "0:01.200");
        assert_eq!(snap.next.as_ref().unwrap().name, "Third");
        assert_eq!(snap.next.as_ref().unwrap().comparison, "0:06.000");
        assert_eq!(snap.cumulative_ms, 3_100);
    }

    #[test]
    fn test_snapshot_serializes_phase_tag() {
        let snap = SessionSnapshot::capture(&state(), &DigitEntry::new());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["phase"], "ready");
        assert_eq!(json["comparison"]["key"], "wr.csv");
        assert_eq!(json["pending_digits"], "_:__.___");
    }

    #[test]
    fn test_same_except_clock() {
        let mut s = state();
        s.reduce(SessionEvent::Start).unwrap();
        let a = SessionSnapshot::capture(&s, &DigitEntry::new());
        s.reduce(SessionEvent::Tick).unwrap();
        let b = SessionSnapshot::capture(&s, &DigitEntry::new());
        assert!(a.same_except_clock(&b));
        s.reduce(SessionEvent::Commit(1)).unwrap();
        let c = SessionSnapshot::capture(&s, &DigitEntry::new());
        assert!(!b.same_except_clock(&c));
    }

    #[test]
    fn test_render_table_lists_rows() {
        let mut s = state();
        s.reduce(SessionEvent::Start).unwrap();
        s.reduce(SessionEvent::Commit(70_000)).unwrap();
        let text = render_table(&SessionSnapshot::capture(&s, &DigitEntry::new()));
        assert!(text.starts_with("[running] WR (3 splits, 0:06.000)"));
        assert!(text.contains("+1:09"));
    }
}
