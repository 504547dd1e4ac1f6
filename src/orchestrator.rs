use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    error::SummaryError,
    llm::Summarizer,
    models::{Envelope, ExtractionResult, Message, SummaryResult},
    pending::PendingRequests,
    tabs::TabHost,
};

pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(15);

const OUTBOX_CAPACITY: usize = 64;

/// Runs one summarization per call: extraction in the active tab, a bounded
/// wait for its reply, then the LLM round trip.
pub struct Orchestrator {
    tabs: Arc<dyn TabHost>,
    summarizer: Arc<dyn Summarizer>,
    pending: Arc<PendingRequests>,
    outbox: mpsc::Sender<Envelope>,
    extraction_timeout: Duration,
}

impl Orchestrator {
    /// Builds the orchestrator and spawns the task that routes extractor
    /// replies into the pending table. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(tabs: Arc<dyn TabHost>, summarizer: Arc<dyn Summarizer>) -> Arc<Self> {
        Self::start_with_timeout(tabs, summarizer, EXTRACTION_TIMEOUT)
    }

    #[must_use]
    pub fn start_with_timeout(
        tabs: Arc<dyn TabHost>,
        summarizer: Arc<dyn Summarizer>,
        extraction_timeout: Duration,
    ) -> Arc<Self> {
        let pending = PendingRequests::new();
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
        tokio::spawn(dispatch_replies(inbox, Arc::clone(&pending)));

        Arc::new(Self {
            tabs,
            summarizer,
            pending,
            outbox,
            extraction_timeout,
        })
    }

    #[must_use]
    pub fn pending(&self) -> &Arc<PendingRequests> {
        &self.pending
    }

    /// Sender that page-side extractors post their envelopes to.
    #[must_use]
    pub fn outbox(&self) -> mpsc::Sender<Envelope> {
        self.outbox.clone()
    }

    /// Answers one incoming message. `SUMMARIZE_CONTENT` always yields
    /// exactly one `SUMMARY_RESULT`; other kinds yield nothing.
    pub async fn handle_message(&self, message: Message) -> Option<Message> {
        match message {
            Message::SummarizeContent => Some(Message::SummaryResult(self.summarize().await)),
            other => {
                debug!("Ignoring message without a reply: {other:?}");
                None
            }
        }
    }

    /// Never fails: every error becomes a `success: false` result.
    pub async fn summarize(&self) -> SummaryResult {
        match self.run().await {
            Ok(summary) => {
                info!("Summary ready ({} chars)", summary.chars().count());
                SummaryResult::summarized(summary)
            }
            Err(e) => {
                warn!("Summarization failed: {e:?}");
                SummaryResult::failed(e.to_string())
            }
        }
    }

    async fn run(&self) -> Result<String, SummaryError> {
        let tab = self
            .tabs
            .active_tab()
            .await
            .ok_or(SummaryError::RestrictedPage)?;
        if tab.is_restricted() {
            info!("Refusing restricted page {}", tab.url);
            return Err(SummaryError::RestrictedPage);
        }

        let content = {
            let mut handle = self.pending.register(tab.id)?;
            self.tabs
                .inject_extractor(&tab, handle.request_id(), self.outbox.clone())
                .await
                .map_err(|e| SummaryError::ExtractionFailed(e.to_string()))?;

            match tokio::time::timeout(self.extraction_timeout, handle.reply()).await {
                Err(_) => {
                    warn!("No reply from {} within {:?}", tab.id, self.extraction_timeout);
                    return Err(SummaryError::ExtractionTimeout);
                }
                Ok(None) => {
                    return Err(SummaryError::ExtractionFailed(
                        "内容脚本未返回结果".to_string(),
                    ));
                }
                Ok(Some(result)) => accept_extraction(result)?,
            }
        };

        self.summarizer.summarize(&content).await
    }
}

fn accept_extraction(result: ExtractionResult) -> Result<String, SummaryError> {
    if !result.success {
        return Err(SummaryError::ExtractionFailed(
            result.error.unwrap_or_else(|| "未知原因".to_string()),
        ));
    }
    match result.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(SummaryError::EmptyContent),
    }
}

async fn dispatch_replies(mut inbox: mpsc::Receiver<Envelope>, pending: Arc<PendingRequests>) {
    while let Some(envelope) = inbox.recv().await {
        if deliver(&pending, &envelope) {
            debug!("Delivered reply {} for {}", envelope.request_id, envelope.tab_id);
        }
    }
    debug!("Reply dispatcher stopped");
}

/// Routes one envelope into the pending table. Returns true when it woke a
/// waiting request.
#[must_use]
pub fn deliver(pending: &PendingRequests, envelope: &Envelope) -> bool {
    match envelope.open() {
        Ok(Message::GetPageContent(result)) => {
            pending.resolve(envelope.tab_id, envelope.request_id, result)
        }
        Ok(other) => {
            debug!("Unexpected message from {}: {other:?}", envelope.tab_id);
            false
        }
        Err(e) => {
            error!("Malformed envelope from {}: {e}", envelope.tab_id);
            false
        }
    }
}
