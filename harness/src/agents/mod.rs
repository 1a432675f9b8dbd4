//! Dialogue agents.
//!
//! Both agents wrap a [`model::CompletionClient`] and keep a private
//! [`ConversationLog`]. Neither exposes its history for external mutation.

pub mod history;
pub mod npc;
pub mod player;
pub mod prompts;

pub use history::ConversationLog;
pub use npc::NpcAgent;
pub use player::{parse_player_output, PlayerSimulator, PlayerTurn};

/// Sampling parameters forwarded to every completion of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub seed: Option<u64>,
}

impl SamplingParams {
    pub fn new(temperature: f32, seed: Option<u64>) -> Self {
        Self { temperature, seed }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            seed: None,
        }
    }
}
