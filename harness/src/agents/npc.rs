use super::{ConversationLog, SamplingParams};
use model::CompletionClient;
use std::sync::Arc;
use tracing::debug;

/// The character under evaluation.
pub struct NpcAgent {
    name: String,
    client: Arc<CompletionClient>,
    log: ConversationLog,
}

impl NpcAgent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        client: Arc<CompletionClient>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            log: ConversationLog::new(system_prompt),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record the player's line, then generate and record the NPC's answer.
    pub async fn reply(&mut self, player_line: &str, sampling: SamplingParams) -> String {
        self.log.record_incoming(player_line);
        let reply = self.log.respond(&self.client, sampling).await;
        debug!(npc = %self.name, chars = reply.chars().count(), "NPC replied");
        reply
    }

    pub fn history(&self) -> &ConversationLog {
        &self.log
    }
}
