use super::SamplingParams;
use model::{ChatMessage, CompletionClient};

/// Append-only message history owned by one agent.
///
/// The system prompt is always the first entry. The other party's lines are
/// recorded as `user`, the agent's own lines as `assistant`.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    /// Record a line spoken by the other party.
    pub fn record_incoming(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Record an own line that was not generated, such as a scripted opener.
    pub fn record_scripted(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Request a completion over the current history and record it as our own line.
    pub async fn respond(&mut self, client: &CompletionClient, sampling: SamplingParams) -> String {
        let reply = client
            .complete(&self.messages, sampling.temperature, sampling.seed)
            .await;
        self.messages.push(ChatMessage::assistant(reply.clone()));
        reply
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
