//! Single-threaded event loop.
//!
//! User commands and clock ticks are two event sources feeding one loop, so
//! no two mutations ever interleave. The tick interval only exists while the
//! clock runs; it is dropped on stop, completion and reset.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use crate::catalog::Catalog;
use crate::config::TimerConfig;
use crate::error::{SessionError, SessionResult};
use crate::export::write_export;
use crate::input::{DigitEntry, KeyOutcome};
use crate::logging::{log, log_rejected, obj, v_str, Domain, Level};
use crate::presentation::{SessionObserver, SessionSnapshot};
use crate::session::{Phase, SessionEvent, SessionState, Transition};

pub const HELP: &str = "\
commands:
  <digits>      six digits M SS mmm per split, e.g. 012345 = 0:12.345
  start | stop | toggle
  undo | reset
  back | clear  edit the pending digit entry
  list          show available comparisons
  load <key>    load a comparison by file or name
  export [path] write the splits CSV
  snapshot      print the session as JSON
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Digits(String),
    Start,
    Stop,
    Toggle,
    Undo,
    Reset,
    Back,
    Clear,
    List,
    Load(String),
    Export(Option<PathBuf>),
    Snapshot,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        let Some(first) = line.chars().next() else {
            return Ok(None);
        };
        if first.is_ascii_digit() {
            return Ok(Some(Command::Digits(line.to_string())));
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        let cmd = match word.to_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "toggle" | "t" => Command::Toggle,
            "undo" | "u" => Command::Undo,
            "reset" => Command::Reset,
            "back" | "b" => Command::Back,
            "clear" => Command::Clear,
            "list" | "ls" => Command::List,
            "load" if !rest.is_empty() => Command::Load(rest.to_string()),
            "load" => return Err("load needs a comparison key".to_string()),
            "export" => Command::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "snapshot" | "json" => Command::Snapshot,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(Some(cmd))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    None,
    Text(String),
    Quit,
}

/// Owns the session and everything that mutates it.
pub struct Controller {
    state: SessionState,
    entry: DigitEntry,
    catalog: Catalog,
    cfg: TimerConfig,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl Controller {
    pub fn new(catalog: Catalog, cfg: TimerConfig) -> Self {
        Self {
            state: SessionState::new(),
            entry: DigitEntry::new(),
            catalog,
            cfg,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn entry(&self) -> &DigitEntry {
        &self.entry
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.state, &self.entry)
    }

    fn notify(&mut self) {
        let snapshot = self.snapshot();
        for obs in self.observers.iter_mut() {
            obs.on_change(&snapshot);
        }
    }

    /// Apply one event and notify observers if anything changed.
    pub fn apply(&mut self, event: SessionEvent) -> SessionResult<Transition> {
        let t = self.state.reduce(event)?;
        if t.changed {
            self.notify();
        }
        Ok(t)
    }

    /// Fetch a comparison set and install it. Nothing changes on failure.
    pub async fn load(&mut self, key: &str) -> SessionResult<Transition> {
        if let Err(err) = self.state.can_load() {
            log_rejected(Domain::Catalog, "load", err.kind(), &err.to_string());
            return Err(err);
        }
        let set = match self.catalog.load_comparison(key).await {
            Ok(set) => set,
            Err(err) => {
                log_rejected(Domain::Catalog, "load", err.kind(), &err.to_string());
                return Err(err);
            }
        };
        let t = self.state.install_comparison(set)?;
        self.entry.clear();
        self.notify();
        Ok(t)
    }

    /// Feed typed characters through the entry; each completed entry commits.
    ///
    /// A rejected submission puts back the five digits typed before it, so
    /// the operator only retypes the last one.
    pub fn type_digits(&mut self, text: &str) -> SessionResult<Vec<Transition>> {
        let mut committed = Vec::new();
        let mut result = Ok(());
        for c in text.chars() {
            let pending = self.entry.clone();
            let KeyOutcome::Submitted { segment_ms } = self.entry.push_char(c) else {
                continue;
            };
            log(
                Level::Debug,
                Domain::Input,
                "entry_submitted",
                obj(&[("segment_ms", serde_json::json!(segment_ms))]),
            );
            if self.cfg.auto_start && self.state.phase() == Phase::Ready {
                if let Err(err) = self.state.reduce(SessionEvent::Start) {
                    self.entry = pending;
                    result = Err(err);
                    break;
                }
            }
            match self.state.reduce(SessionEvent::Commit(segment_ms)) {
                Ok(t) => committed.push(t),
                Err(err) => {
                    self.entry = pending;
                    result = Err(err);
                    break;
                }
            }
        }
        self.notify();
        result.map(|_| committed)
    }

    pub async fn handle(&mut self, cmd: Command) -> SessionResult<Reply> {
        match cmd {
            Command::Digits(text) => {
                self.type_digits(&text)?;
            }
            Command::Start => {
                self.apply(SessionEvent::Start)?;
            }
            Command::Stop => {
                self.apply(SessionEvent::Stop)?;
            }
            Command::Toggle => {
                let event = if self.state.clock().is_running() {
                    SessionEvent::Stop
                } else {
                    SessionEvent::Start
                };
                self.apply(event)?;
            }
            Command::Undo => {
                self.apply(SessionEvent::Undo)?;
            }
            Command::Reset => {
                self.entry.clear();
                self.state.reduce(SessionEvent::Reset)?;
                self.notify();
            }
            Command::Back => {
                self.entry.backspace();
                self.notify();
            }
            Command::Clear => {
                self.entry.clear();
                self.notify();
            }
            Command::List => {
                let listing = self.catalog.list_comparisons().await?;
                let text = listing
                    .iter()
                    .map(|e| format!("  {:<28} {}", e.display_name, e.key))
                    .collect::<Vec<_>>()
                    .join("\n");
                return Ok(Reply::Text(text));
            }
            Command::Load(key) => {
                self.load(&key).await?;
            }
            Command::Export(path) => {
                let path = path.unwrap_or_else(|| self.cfg.export_path.clone());
                write_export(&path, &self.state.export_history())?;
                return Ok(Reply::Text(format!(
                    "exported {} splits to {}",
                    self.state.ledger().next_index(),
                    path.display()
                )));
            }
            Command::Snapshot => {
                let json = serde_json::to_string_pretty(&self.snapshot())
                    .map_err(|e| SessionError::Export {
                        path: "snapshot".to_string(),
                        reason: e.to_string(),
                    })?;
                return Ok(Reply::Text(json));
            }
            Command::Help => return Ok(Reply::Text(HELP.to_string())),
            Command::Quit => return Ok(Reply::Quit),
        }
        Ok(Reply::None)
    }
}

// Arm the interval when the clock starts, drop it when it stops.
fn sync_ticker(ticker: &mut Option<Interval>, running: bool, period: Duration) {
    match (running, ticker.is_some()) {
        (true, false) => {
            let mut iv = interval_at(Instant::now() + period, period);
            // missed ticks are dropped, never replayed
            iv.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some(iv);
        }
        (false, true) => *ticker = None,
        _ => {}
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Run until `quit` or end of input. Replies and errors go to stdout.
pub async fn run<R>(mut controller: Controller, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let period = Duration::from_millis(controller.cfg.tick_ms);
    let mut lines = input.lines();
    let mut ticker: Option<Interval> = None;

    loop {
        sync_ticker(&mut ticker, controller.state().clock().is_running(), period);
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let cmd = match Command::parse(&line) {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => continue,
                    Err(msg) => {
                        println!("{}", msg);
                        continue;
                    }
                };
                match controller.handle(cmd).await {
                    Ok(Reply::Quit) => break,
                    Ok(Reply::Text(text)) => println!("{}", text),
                    Ok(Reply::None) => {}
                    Err(err) => println!("error: {}", err),
                }
            }
            _ = next_tick(&mut ticker) => {
                let _ = controller.apply(SessionEvent::Tick);
            }
        }
    }

    log(
        Level::Info,
        Domain::System,
        "session_end",
        obj(&[
            ("phase", v_str(controller.state().phase().as_str())),
            ("splits", serde_json::json!(controller.state().ledger().next_index())),
        ]),
    );
    Ok(())
}
