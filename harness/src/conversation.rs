//! Turn-taking conversation driver.
//!
//! Each turn is one Player line followed by one NPC line. Turns run strictly
//! in order since every turn consumes the previous NPC reply.

use crate::agents::prompts::{NpcPrompt, PlayerPrompt};
use crate::agents::{NpcAgent, PlayerSimulator, SamplingParams};
use crate::scenario::Scenario;
use crate::transcript::{Speaker, Transcript};
use model::CompletionClient;
use std::sync::Arc;
use tracing::info;

pub struct ConversationDriver {
    npc: NpcAgent,
    player: PlayerSimulator,
    seed_line: Option<String>,
    max_turns: usize,
}

impl ConversationDriver {
    pub fn new(npc: NpcAgent, player: PlayerSimulator, max_turns: usize) -> Self {
        Self {
            npc,
            player,
            seed_line: None,
            max_turns,
        }
    }

    /// Driver with both agents prompted from `scenario`.
    pub fn for_scenario(
        scenario: &Scenario,
        npc_client: Arc<CompletionClient>,
        player_client: Arc<CompletionClient>,
    ) -> Self {
        let npc = NpcAgent::new(
            scenario.npc_profile.name.clone(),
            NpcPrompt::build(scenario),
            npc_client,
        );
        let player = PlayerSimulator::new(PlayerPrompt::build(scenario), player_client);

        Self::new(npc, player, scenario.max_turns).with_seed_line(scenario.seed_dialogue.clone())
    }

    pub fn with_seed_line(mut self, seed_line: Option<String>) -> Self {
        self.seed_line = seed_line.filter(|line| !line.is_empty());
        self
    }

    pub fn npc(&self) -> &NpcAgent {
        &self.npc
    }

    pub fn player(&self) -> &PlayerSimulator {
        &self.player
    }

    /// Play `max_turns` turns and return the 2 × `max_turns` line transcript.
    pub async fn run(&mut self, sampling: SamplingParams) -> Transcript {
        let mut transcript = Transcript::new();
        let mut last_response: Option<String> = None;

        for turn in 0..self.max_turns {
            let player_turn = match (turn, self.seed_line.as_deref()) {
                (0, Some(seed_line)) => self.player.open_with(seed_line),
                _ => {
                    self.player
                        .next_action(last_response.as_deref(), sampling)
                        .await
                }
            };
            info!(turn, speaker = "Player", "{}", player_turn.action);
            transcript.push(turn, Speaker::Player, player_turn.action.clone());

            let reply = self.npc.reply(&player_turn.action, sampling).await;
            info!(turn, speaker = "NPC", npc = %self.npc.name(), "{}", reply);
            transcript.push(turn, Speaker::Npc, reply.clone());

            last_response = Some(reply);
        }

        transcript
    }
}
