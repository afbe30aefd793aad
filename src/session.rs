//! Session state and its reducer: (State, Event) -> Transition
//!
//! ```text
//!            install_comparison            Start
//!   ┌──────┐ ─────────────────► ┌───────┐ ───────► ┌─────────┐
//!   │ Idle │                    │ Ready │          │ Running │ ◄──┐
//!   └──────┘ ◄───── Reset ───── └───────┘ ◄─Reset─ └─────────┘    │ Undo
//!                (no set)                            │ last Commit │
//!                                                    ▼             │
//!                                               ┌───────────┐ ─────┘
//!                                               │ Completed │
//!                                               └───────────┘
//! ```
//!
//! Every mutation goes through [`SessionState::reduce`] or
//! [`SessionState::install_comparison`]. A rejected event returns an error and
//! leaves the state untouched, which the returned `state_hash` makes checkable.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::catalog::ComparisonSplitSet;
use crate::clock::RunClock;
use crate::error::{SessionError, SessionResult};
use crate::export;
use crate::ledger::Ledger;
use crate::logging::{log, log_commit, log_rejected, log_transition, obj, v_str, Domain, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Ready,
    Running,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Ready => "ready",
            Phase::Running => "running",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Stop,
    Tick,
    Commit(u64),
    Undo,
    Reset,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::Stop => "stop",
            SessionEvent::Tick => "tick",
            SessionEvent::Commit(_) => "commit",
            SessionEvent::Undo => "undo",
            SessionEvent::Reset => "reset",
        }
    }

    fn domain(&self) -> Domain {
        match self {
            SessionEvent::Start | SessionEvent::Stop | SessionEvent::Tick => Domain::Clock,
            _ => Domain::Ledger,
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub changed: bool,
    pub phase: Phase,
    pub state_hash: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionState {
    comparison: Option<ComparisonSplitSet>,
    ledger: Ledger,
    clock: RunClock,
    phase: Phase,
    /// Set by an explicit stop; decides whether undo out of Completed resumes the clock.
    stopped_by_user: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            comparison: None,
            ledger: Ledger::default(),
            clock: RunClock::new(),
            phase: Phase::Idle,
            stopped_by_user: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn comparison(&self) -> Option<&ComparisonSplitSet> {
        self.comparison.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    pub fn max_splits(&self) -> usize {
        self.ledger.max_splits()
    }

    /// Deterministic hash of the whole session.
    pub fn state_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        Hash::hash(self, &mut h);
        h.finish()
    }

    fn transition(&self, changed: bool) -> Transition {
        Transition {
            changed,
            phase: self.phase,
            state_hash: self.state_hash(),
        }
    }

    /// Whether a new comparison may replace the active one.
    pub fn can_load(&self) -> SessionResult<()> {
        if !self.ledger.is_empty() || self.clock.is_running() {
            return Err(SessionError::illegal("load", self.phase));
        }
        Ok(())
    }

    /// Replace the active comparison set. Requires an empty ledger and a
    /// stopped clock; the clock is zeroed and MAX_SPLITS becomes the set length.
    pub fn install_comparison(&mut self, set: ComparisonSplitSet) -> SessionResult<Transition> {
        if let Err(err) = self.can_load() {
            log_rejected(Domain::Catalog, "load", err.kind(), &err.to_string());
            return Err(err);
        }
        if set.is_empty() {
            return Err(SessionError::malformed(&set.meta().key, 1, "no splits"));
        }
        let prev = self.phase;
        self.ledger = Ledger::new(set.len());
        self.clock.reset();
        self.stopped_by_user = false;
        self.comparison = Some(set);
        self.phase = Phase::Ready;
        log_transition(prev.as_str(), self.phase.as_str(), "load");
        Ok(self.transition(true))
    }

    pub fn reduce(&mut self, event: SessionEvent) -> SessionResult<Transition> {
        let prev = self.phase;
        let result = match event {
            SessionEvent::Start => self.handle_start(),
            SessionEvent::Stop => Ok(self.handle_stop()),
            SessionEvent::Tick => Ok(self.clock.tick()),
            SessionEvent::Commit(segment_ms) => self.handle_commit(segment_ms),
            SessionEvent::Undo => Ok(self.handle_undo()),
            SessionEvent::Reset => Ok(self.handle_reset()),
        };
        match result {
            Ok(changed) => {
                log_transition(prev.as_str(), self.phase.as_str(), event.name());
                Ok(self.transition(changed))
            }
            Err(err) => {
                log_rejected(event.domain(), event.name(), err.kind(), &err.to_string());
                Err(err)
            }
        }
    }

    fn handle_start(&mut self) -> SessionResult<bool> {
        match self.phase {
            Phase::Idle | Phase::Completed => Err(SessionError::illegal("start", self.phase)),
            Phase::Ready | Phase::Running => {
                let was_ready = self.phase == Phase::Ready;
                self.phase = Phase::Running;
                self.stopped_by_user = false;
                let started = self.clock.start();
                if started {
                    log(
                        Level::Debug,
                        Domain::Clock,
                        "clock_started",
                        obj(&[("elapsed_seconds", serde_json::json!(self.clock.elapsed_seconds()))]),
                    );
                }
                Ok(started || was_ready)
            }
        }
    }

    fn handle_stop(&mut self) -> bool {
        let was_running = self.clock.stop();
        if matches!(self.phase, Phase::Running | Phase::Completed) {
            self.stopped_by_user = true;
        }
        was_running
    }

    fn handle_commit(&mut self, segment_ms: u64) -> SessionResult<bool> {
        if self.phase != Phase::Running {
            return Err(SessionError::illegal("commit", self.phase));
        }
        let Some(comparison) = self.comparison.as_ref() else {
            return Err(SessionError::illegal("commit", self.phase));
        };
        let entry = self
            .ledger
            .commit(segment_ms, self.clock.elapsed_seconds(), comparison)?;
        log_commit(entry.index, &entry.name, entry.segment_ms, entry.cumulative_ms, entry.delta_ms);

        if self.ledger.is_complete() {
            self.phase = Phase::Completed;
            // force-stop regardless of who last touched the clock
            self.clock.stop();
        }
        Ok(true)
    }

    fn handle_undo(&mut self) -> bool {
        let Some(entry) = self.ledger.undo() else {
            return false;
        };
        log(
            Level::Info,
            Domain::Ledger,
            "undo",
            obj(&[
                ("index", serde_json::json!(entry.index)),
                ("name", v_str(&entry.name)),
                ("cumulative_ms", serde_json::json!(self.ledger.cumulative_ms())),
            ]),
        );
        if self.phase == Phase::Completed {
            self.phase = Phase::Running;
            if !self.stopped_by_user {
                self.clock.start();
            }
        }
        true
    }

    fn handle_reset(&mut self) -> bool {
        let before = self.state_hash();
        self.ledger.clear();
        self.clock.reset();
        self.stopped_by_user = false;
        self.phase = if self.comparison.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        };
        self.state_hash() != before
    }

    /// Committed splits as CSV, oldest first.
    pub fn export_history(&self) -> String {
        export::export_history(self.ledger.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_split_set, ComparisonEntry};

    fn three_split_set() -> ComparisonSplitSet {
        let entry = ComparisonEntry {
            display_name: "World Record".to_string(),
            key: "wr.csv".to_string(),
        };
        parse_split_set(&entry, "split,time\nFirst,1\nSecond,2\nThird,3\n").unwrap()
    }

    fn running() -> SessionState {
        let mut s = SessionState::new();
        s.install_comparison(three_split_set()).unwrap();
        s.reduce(SessionEvent::Start).unwrap();
        s
    }

    #[test]
    fn test_idle_rejects_start_and_commit() {
        let mut s = SessionState::new();
        let before = s.state_hash();
        assert!(matches!(
            s.reduce(SessionEvent::Start),
            Err(SessionError::IllegalState { op: "start", phase: Phase::Idle })
        ));
        assert!(s.reduce(SessionEvent::Commit(1_000)).is_err());
        assert_eq!(s.state_hash(), before);
    }

    #[test]
    fn test_ready_rejects_commit() {
        let mut s = SessionState::new();
        s.install_comparison(three_split_set()).unwrap();
        assert_eq!(s.phase(), Phase::Ready);
        assert_eq!(s.max_splits(), 3);
        let err = s.reduce(SessionEvent::Commit(1_000)).unwrap_err();
        assert_eq!(err, SessionError::illegal("commit", Phase::Ready));
    }

    #[test]
    fn test_completion_force_stops_clock() {
        let mut s = running();
        s.reduce(SessionEvent::Tick).unwrap();
        for seg in [1_200, 1_900, 2_800] {
            s.reduce(SessionEvent::Commit(seg)).unwrap();
        }
        assert_eq!(s.phase(), Phase::Completed);
        assert!(!s.clock().is_running());
        assert_eq!(s.clock().elapsed_seconds(), 1);

        let before = s.state_hash();
        assert!(s.reduce(SessionEvent::Commit(1)).is_err());
        assert!(s.reduce(SessionEvent::Start).is_err());
        assert_eq!(s.state_hash(), before);
    }

    #[test]
    fn test_undo_from_completed_resumes_clock() {
        let mut s = running();
        for seg in [1_000, 1_000, 1_000] {
            s.reduce(SessionEvent::Commit(seg)).unwrap();
        }
        let t = s.reduce(SessionEvent::Undo).unwrap();
        assert_eq!(t.phase, Phase::Running);
        assert!(s.clock().is_running());
        assert_eq!(s.ledger().next_index(), 2);
        assert_eq!(s.ledger().cumulative_ms(), 2_000);
    }

    #[test]
    fn test_undo_after_user_stop_keeps_clock_stopped() {
        let mut s = running();
        s.reduce(SessionEvent::Commit(1_000)).unwrap();
        s.reduce(SessionEvent::Stop).unwrap();
        s.reduce(SessionEvent::Commit(1_000)).unwrap();
        s.reduce(SessionEvent::Commit(1_000)).unwrap();
        assert_eq!(s.phase(), Phase::Completed);
        s.reduce(SessionEvent::Undo).unwrap();
        assert_eq!(s.phase(), Phase::Running);
        assert!(!s.clock().is_running());
    }

    #[test]
    fn test_undo_is_exact_inverse() {
        let mut s = running();
        s.reduce(SessionEvent::Commit(83_456)).unwrap();
        let before = s.clone();
        s.reduce(SessionEvent::Commit(5_000)).unwrap();
        s.reduce(SessionEvent::Undo).unwrap();
        assert_eq!(s, before);
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut s = running();
        let before = s.state_hash();
        let t = s.reduce(SessionEvent::Undo).unwrap();
        assert!(!t.changed);
        assert_eq!(t.state_hash, before);
    }

    #[test]
    fn test_load_rejected_mid_run() {
        let mut s = running();
        s.reduce(SessionEvent::Commit(1_000)).unwrap();
        s.reduce(SessionEvent::Stop).unwrap();
        let before = s.clone();
        let err = s.install_comparison(three_split_set()).unwrap_err();
        assert_eq!(err, SessionError::illegal("load", Phase::Running));
        assert_eq!(s, before);
    }

    #[test]
    fn test_load_rejected_while_clock_runs() {
        let mut s = running();
        assert!(s.install_comparison(three_split_set()).is_err());
        s.reduce(SessionEvent::Stop).unwrap();
        s.install_comparison(three_split_set()).unwrap();
        assert_eq!(s.phase(), Phase::Ready);
    }

    #[test]
    fn test_reset_then_reload_matches_fresh_ready() {
        let mut fresh = SessionState::new();
        fresh.install_comparison(three_split_set()).unwrap();

        let mut s = running();
        s.reduce(SessionEvent::Tick).unwrap();
        s.reduce(SessionEvent::Commit(1_000)).unwrap();
        s.reduce(SessionEvent::Reset).unwrap();
        assert_eq!(s.phase(), Phase::Ready);
        s.install_comparison(three_split_set()).unwrap();
        assert_eq!(s, fresh);
        assert_eq!(s.state_hash(), fresh.state_hash());
    }

    #[test]
    fn test_reset_without_comparison_is_idle() {
        let mut s = SessionState::new();
        let t = s.reduce(SessionEvent::Reset).unwrap();
        assert!(!t.changed);
        assert_eq!(t.phase, Phase::Idle);
    }

    #[test]
    fn test_tick_ignored_when_stopped() {
        let mut s = running();
        s.reduce(SessionEvent::Tick).unwrap();
        s.reduce(SessionEvent::Stop).unwrap();
        let t = s.reduce(SessionEvent::Tick).unwrap();
        assert!(!t.changed);
        assert_eq!(s.clock().elapsed_seconds(), 1);
    }
}
