use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::SourceLocation;
use crate::error::{SessionError, SessionResult};

/// Fetches the raw text of a catalog file (the index or one split set).
#[async_trait]
pub trait CatalogSource {
    async fn fetch_text(&self, key: &str) -> SessionResult<String>;
    fn describe(&self) -> String;
}

pub fn build_source(loc: &SourceLocation) -> SessionResult<Box<dyn CatalogSource + Send + Sync>> {
    match loc {
        SourceLocation::Dir(root) => Ok(Box::new(FsSource::new(root.clone()))),
        SourceLocation::Http(base) => Ok(Box::new(HttpSource::new(base)?)),
    }
}

fn unavailable(key: &str, reason: impl ToString) -> SessionError {
    SessionError::Unavailable {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl CatalogSource for FsSource {
    async fn fetch_text(&self, key: &str) -> SessionResult<String> {
        let path = self.root.join(key);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| unavailable(key, format!("{}: {}", path.display(), e)))
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }
}

pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> SessionResult<Self> {
        // Url::join drops the last path segment unless the base ends in '/'
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base = Url::parse(&normalized).map_err(|e| unavailable(base, e))?;
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    fn url_for(&self, key: &str) -> SessionResult<Url> {
        self.base.join(key).map_err(|e| unavailable(key, e))
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    async fn fetch_text(&self, key: &str) -> SessionResult<String> {
        let url = self.url_for(key)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(key, e))?;
        let resp = resp.error_for_status().map_err(|e| unavailable(key, e))?;
        resp.text().await.map_err(|e| unavailable(key, e))
    }

    fn describe(&self) -> String {
        format!("http:{}", self.base)
    }
}

/// In-process source keyed by file name.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, text: &str) -> Self {
        self.files.insert(key.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl CatalogSource for MemorySource {
    async fn fetch_text(&self, key: &str) -> SessionResult<String> {
        self.files
            .get(key)
            .cloned()
            .ok_or_else(|| unavailable(key, "no such file"))
    }

    fn describe(&self) -> String {
        format!("memory:{} files", self.files.len())
    }
}
