/// Chat and analysis sessions
///
/// A `ChatSession` sends bounded page snapshots to the chat endpoint and
/// keeps the conversation as an append-only log. Failures never propagate:
/// they are recorded as an `Error: ...` assistant turn and as `last_error`,
/// the same way a view shows its fetch errors.

use crate::client::BackendClient;
use crate::error::ApiError;
use crate::messages::{ChatMessage, ChatReply, ChatRequest, ReplyKind};
use crate::snapshot::PageSnapshot;
use log::debug;

/// Turns in the order they happened. Entries are only ever appended or
/// cleared all at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

pub struct ChatSession {
    client: BackendClient,
    log: ConversationLog,
    last_error: Option<String>,
}

impl ChatSession {
    pub fn new(client: BackendClient) -> Self {
        ChatSession {
            client,
            log: ConversationLog::new(),
            last_error: None,
        }
    }

    pub fn history(&self) -> &ConversationLog {
        &self.log
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_history(&mut self) {
        self.log.clear();
        self.last_error = None;
    }

    /// Send a chat turn with all earlier turns as history.
    ///
    /// Blank messages are ignored without a request. Returns the reply text.
    pub async fn send_message(&mut self, message: &str, page_data: &PageSnapshot) -> Option<String> {
        if message.trim().is_empty() {
            return None;
        }
        let history = self.log.messages().to_vec();
        self.log.push(ChatMessage::user(message));

        let request = ChatRequest::chat(page_data, message, &history);
        let outcome = self.call(ReplyKind::Response, &request).await;
        self.record(outcome)
    }

    /// Ask a one-off question about the page. Blank queries are ignored.
    pub async fn analyze(&mut self, query: &str, page_data: &PageSnapshot) -> Option<String> {
        if query.trim().is_empty() {
            return None;
        }
        let request = ChatRequest::analyze(page_data, query);
        let outcome = self.call(ReplyKind::Analysis, &request).await;
        self.record(outcome)
    }

    pub async fn summarize(&mut self, page_data: &PageSnapshot) -> Option<String> {
        let request = ChatRequest::summarize(page_data);
        let outcome = self.call(ReplyKind::Summary, &request).await;
        self.record(outcome)
    }

    async fn call(&self, kind: ReplyKind, request: &ChatRequest<'_>) -> Result<String, String> {
        debug!("chat {:?} for {}", kind, request.page_type.as_str());
        let reply: Result<ChatReply, ApiError> = self.client.post_json(kind.endpoint(), request).await;
        match reply {
            Ok(reply) => reply.into_text(kind),
            Err(err) => Err(err.display_message()),
        }
    }

    fn record(&mut self, outcome: Result<String, String>) -> Option<String> {
        match outcome {
            Ok(text) => {
                self.last_error = None;
                self.log.push(ChatMessage::assistant(text.clone()));
                Some(text)
            }
            Err(message) => {
                self.log.push(ChatMessage::assistant(format!("Error: {}", message)));
                self.last_error = Some(message);
                None
            }
        }
    }
}
