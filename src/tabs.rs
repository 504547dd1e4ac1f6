use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{extractor, models::Envelope};

/// URL prefixes of pages the extractor is never injected into.
pub const RESTRICTED_PREFIXES: [&str; 8] = [
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "edge://",
    "about:",
    "moz-extension://",
    "view-source:",
    "devtools://",
];

/// Largest remote page the extractor will read.
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
}

impl Tab {
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        let url = self.url.trim_start().to_ascii_lowercase();
        RESTRICTED_PREFIXES
            .iter()
            .any(|prefix| url.starts_with(prefix))
    }
}

#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("标签页 {0} 不存在或已关闭")]
    UnknownTab(TabId),
}

/// The browser side of the orchestration: which tab is active, and how to
/// run the extractor inside one.
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn active_tab(&self) -> Option<Tab>;

    /// Starts the extractor in `tab`. The extractor reports back on its own
    /// schedule by posting exactly one envelope tagged with `request_id`.
    async fn inject_extractor(
        &self,
        tab: &Tab,
        request_id: Uuid,
        outbox: mpsc::Sender<Envelope>,
    ) -> Result<(), InjectionError>;
}

#[derive(Debug, Clone)]
struct TabEntry {
    url: String,
    snapshot: Option<String>,
}

#[derive(Debug, Default)]
struct TabRegistry {
    next_id: u32,
    tabs: HashMap<TabId, TabEntry>,
    active: Option<TabId>,
}

/// Tabs opened through the HTTP surface. A tab either carries an HTML
/// snapshot or is fetched from its URL each time the extractor runs.
pub struct BrowserTabs {
    http: Client,
    fetch_timeout: Duration,
    registry: Mutex<TabRegistry>,
}

impl BrowserTabs {
    #[must_use]
    pub fn new(http: Client, fetch_timeout: Duration) -> Self {
        Self {
            http,
            fetch_timeout,
            registry: Mutex::new(TabRegistry::default()),
        }
    }

    /// Opens a tab and makes it the active one.
    #[must_use]
    pub fn open(&self, url: impl Into<String>, snapshot: Option<String>) -> Tab {
        let url = url.into();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = TabId(registry.next_id);
        registry.tabs.insert(
            id,
            TabEntry {
                url: url.clone(),
                snapshot,
            },
        );
        registry.active = Some(id);
        info!("Opened {id} at {url}");
        Tab { id, url }
    }

    #[must_use]
    pub fn activate(&self, id: TabId) -> Option<Tab> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let url = registry.tabs.get(&id)?.url.clone();
        registry.active = Some(id);
        Some(Tab { id, url })
    }

    /// Returns false when no such tab was open.
    #[must_use]
    pub fn close(&self, id: TabId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.active == Some(id) {
            registry.active = None;
        }
        registry.tabs.remove(&id).is_some()
    }

    fn entry(&self, id: TabId) -> Option<TabEntry> {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.tabs.get(&id).cloned()
    }
}

#[async_trait]
impl TabHost for BrowserTabs {
    async fn active_tab(&self) -> Option<Tab> {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.active?;
        registry.tabs.get(&id).map(|entry| Tab {
            id,
            url: entry.url.clone(),
        })
    }

    async fn inject_extractor(
        &self,
        tab: &Tab,
        request_id: Uuid,
        outbox: mpsc::Sender<Envelope>,
    ) -> Result<(), InjectionError> {
        let entry = self.entry(tab.id).ok_or(InjectionError::UnknownTab(tab.id))?;
        let http = self.http.clone();
        let fetch_timeout = self.fetch_timeout;
        let tab_id = tab.id;

        debug!("Injecting extractor into {tab_id} for request {request_id}");
        tokio::spawn(async move {
            let document = match entry.snapshot {
                Some(html) => Some(html),
                None => fetch_document(&http, &entry.url, fetch_timeout).await,
            };
            extractor::run_in_page(tab_id, request_id, document, outbox).await;
        });
        Ok(())
    }
}

async fn fetch_document(http: &Client, url: &str, timeout: Duration) -> Option<String> {
    let mut response = match http.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Fetching {url} failed: {e}");
            return None;
        }
    };
    if !response.status().is_success() {
        warn!("Fetching {url} returned {}", response.status());
        return None;
    }
    let is_text = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.contains("html") || ct.starts_with("text/"));
    if !is_text {
        warn!("Fetching {url} returned a non-text document");
        return None;
    }
    if response
        .content_length()
        .is_some_and(|len| len > MAX_DOCUMENT_BYTES as u64)
    {
        warn!("Fetching {url} exceeds {MAX_DOCUMENT_BYTES} bytes");
        return None;
    }

    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if body.len() + chunk.len() > MAX_DOCUMENT_BYTES {
                    warn!("Fetching {url} exceeds {MAX_DOCUMENT_BYTES} bytes");
                    return None;
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Reading {url} failed: {e}");
                return None;
            }
        }
    }
    Some(String::from_utf8_lossy(&body).into_owned())
}
