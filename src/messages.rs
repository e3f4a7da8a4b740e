/// Chat endpoint message types
use crate::snapshot::{PageSnapshot, PageType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Local only; never sent as history
    #[serde(skip)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Body of `/api/chatbot/{chat,analyze,summarize}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest<'a> {
    pub page_type: PageType,
    pub page_data: &'a PageSnapshot,

    /// Chat only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,

    /// Analyze only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<&'a str>,

    /// Chat only: every turn before this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<&'a [ChatMessage]>,
}

impl<'a> ChatRequest<'a> {
    pub fn chat(page_data: &'a PageSnapshot, message: &'a str, history: &'a [ChatMessage]) -> Self {
        ChatRequest {
            page_type: page_data.page_type,
            page_data,
            message: Some(message),
            query: None,
            conversation_history: Some(history),
        }
    }

    pub fn analyze(page_data: &'a PageSnapshot, query: &'a str) -> Self {
        ChatRequest {
            page_type: page_data.page_type,
            page_data,
            message: None,
            query: Some(query),
            conversation_history: None,
        }
    }

    pub fn summarize(page_data: &'a PageSnapshot) -> Self {
        ChatRequest {
            page_type: page_data.page_type,
            page_data,
            message: None,
            query: None,
            conversation_history: None,
        }
    }
}

/// Which field of a reply carries the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Response,
    Analysis,
    Summary,
}

impl ReplyKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReplyKind::Response => "/api/chatbot/chat",
            ReplyKind::Analysis => "/api/chatbot/analyze",
            ReplyKind::Summary => "/api/chatbot/summarize",
        }
    }

    /// Error text when the reply has neither the expected field nor an `error`
    pub fn fallback_error(&self) -> &'static str {
        match self {
            ReplyKind::Response => "Failed to get response",
            ReplyKind::Analysis => "Failed to analyze data",
            ReplyKind::Summary => "Failed to summarize data",
        }
    }
}

/// Reply from the chat endpoint. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub success: bool,
    pub response: Option<String>,
    pub analysis: Option<String>,
    pub summary: Option<String>,
    pub error: Option<String>,
}

impl ChatReply {
    /// The reply text, or the message to show instead
    pub fn into_text(self, kind: ReplyKind) -> Result<String, String> {
        let text = match kind {
            ReplyKind::Response => self.response,
            ReplyKind::Analysis => self.analysis,
            ReplyKind::Summary => self.summary,
        };
        match text {
            Some(text) if self.success && !text.is_empty() => Ok(text),
            _ => Err(self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| kind.fallback_error().to_string())),
        }
    }
}
