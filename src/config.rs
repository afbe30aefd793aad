use std::path::PathBuf;

pub const DEFAULT_EXPORT_FILE: &str = "my_splits_export.csv";

/// Where comparison CSVs are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Dir(PathBuf),
    Http(String),
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Http(raw.to_string())
        } else {
            SourceLocation::Dir(PathBuf::from(raw))
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerConfig {
    pub source: SourceLocation,
    pub index_file: String,
    pub export_path: PathBuf,
    pub tick_ms: u64,
    pub auto_start: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            source: SourceLocation::Dir(PathBuf::from("./splits")),
            index_file: "index.csv".to_string(),
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
            tick_ms: 1000,
            auto_start: false,
        }
    }
}

impl TimerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let source = std::env::var("SPLITS_SOURCE")
            .map(|v| SourceLocation::parse(&v))
            .unwrap_or(d.source);
        let index_file = std::env::var("SPLITS_INDEX").unwrap_or(d.index_file);
        let export_path = std::env::var("EXPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or(d.export_path);
        let tick_ms = std::env::var("TICK_MS")
            .ok()
            .and_then(|v| parse_tick_ms(&v))
            .unwrap_or(d.tick_ms);
        let auto_start = std::env::var("AUTO_START")
            .map(|v| parse_flag(&v))
            .unwrap_or(d.auto_start);
        Self {
            source,
            index_file,
            export_path,
            tick_ms,
            auto_start,
        }
    }

    /// First CLI argument overrides the comparison source.
    pub fn with_args(mut self, mut args: impl Iterator<Item = String>) -> Self {
        if let Some(src) = args.next() {
            self.source = SourceLocation::parse(&src);
        }
        self
    }
}

fn parse_tick_ms(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|v| *v > 0)
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
