use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tabs::TabId;

/// Outcome of one extraction attempt inside a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    #[must_use]
    pub fn extracted(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// Terminal value handed back to whoever asked for a summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResult {
    #[must_use]
    pub fn summarized(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            summary: Some(summary.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    GetPageContent(ExtractionResult),
    SummarizeContent,
    SummaryResult(SummaryResult),
}

/// A serialized message crossing the page boundary. The body is the JSON
/// text of a [`Message`]; nothing else is shared with the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub tab_id: TabId,
    pub request_id: Uuid,
    pub body: String,
}

impl Envelope {
    /// # Errors
    ///
    /// Fails only if the message cannot be serialized.
    pub fn seal(tab_id: TabId, request_id: Uuid, message: &Message) -> serde_json::Result<Self> {
        Ok(Self {
            tab_id,
            request_id,
            body: serde_json::to_string(message)?,
        })
    }

    /// # Errors
    ///
    /// Fails when the body is not a well-formed [`Message`].
    pub fn open(&self) -> serde_json::Result<Message> {
        serde_json::from_str(&self.body)
    }
}
