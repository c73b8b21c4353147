//! Turns one inbound chat message into a knowledge-base answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    ferry_config::RepliesConfig,
    ferry_feishu::{MessageReceiveEvent, MessageSender},
    ferry_ragflow::{KnowledgeBase, QueryResult},
};

/// Why an event produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotText,
    InvalidContent,
    EmptyText,
    MissingSender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Ignored(IgnoreReason),
    /// The answer card was sent (or at least attempted).
    Answered,
    /// The query failed and the apology text was sent.
    Failed,
}

/// Reply sent when the knowledge base could not answer.
pub fn failure_text(error: &str) -> String {
    format!(
        "❌ Sorry, the query failed: {error}\n\nYou can try:\n1. Rephrasing your question\n2. Contacting HR for help"
    )
}

pub struct Relay {
    sender: Arc<dyn MessageSender>,
    knowledge: Arc<dyn KnowledgeBase>,
    replies: RepliesConfig,
}

impl Relay {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        knowledge: Arc<dyn KnowledgeBase>,
        replies: RepliesConfig,
    ) -> Self {
        Self {
            sender,
            knowledge,
            replies,
        }
    }

    /// Handle an `im.message.receive_v1` event: acknowledge, query, reply.
    ///
    /// Send failures are logged and swallowed; the caller only sees the
    /// outcome.
    pub async fn handle_message(&self, event: &MessageReceiveEvent) -> RelayOutcome {
        let message_id = event.message_id().unwrap_or_default();

        if !event.is_text() {
            debug!(
                message_id,
                message_type = event.message_type().unwrap_or_default(),
                "ignoring non-text message"
            );
            return RelayOutcome::Ignored(IgnoreReason::NotText);
        }

        let question = match event.text() {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(message_id, "ignoring empty message");
                return RelayOutcome::Ignored(IgnoreReason::EmptyText);
            },
            Err(e) => {
                warn!(message_id, "ignoring message: {e}");
                return RelayOutcome::Ignored(IgnoreReason::InvalidContent);
            },
        };

        let Some(open_id) = event.sender_open_id() else {
            warn!(message_id, "ignoring message without sender open_id");
            return RelayOutcome::Ignored(IgnoreReason::MissingSender);
        };

        info!(open_id, message_id, question = %question, "received question");

        if let Err(e) = self
            .sender
            .send_text(open_id, &self.replies.thinking_text)
            .await
        {
            warn!(open_id, "failed to send acknowledgment: {e}");
        }

        match self.knowledge.query(&question).await {
            QueryResult::Answer { answer, sources } => {
                if let Err(e) = self
                    .sender
                    .send_card(open_id, &self.replies.card_title, &answer, &sources)
                    .await
                {
                    warn!(open_id, "failed to send answer card: {e}");
                }
                info!(open_id, citations = sources.len(), "answer sent");
                RelayOutcome::Answered
            },
            QueryResult::Failure { error } => {
                if let Err(e) = self.sender.send_text(open_id, &failure_text(&error)).await {
                    warn!(open_id, "failed to send failure notice: {e}");
                }
                info!(open_id, error = %error, "query failed, user notified");
                RelayOutcome::Failed
            },
        }
    }
}
