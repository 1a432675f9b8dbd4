use super::prompts::{ACTION_MARKER, THOUGHTS_CLOSE, THOUGHTS_OPEN};
use super::{ConversationLog, SamplingParams};
use model::CompletionClient;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error};

static ACTION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    marker_regex(format!(r"(?s){}\s*(.*)", regex::escape(ACTION_MARKER)))
});
static THOUGHTS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    marker_regex(format!(
        r"(?s){}\s*(.*?){}",
        regex::escape(THOUGHTS_OPEN),
        regex::escape(THOUGHTS_CLOSE)
    ))
});

fn marker_regex(pattern: String) -> Option<Regex> {
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            error!(pattern = %pattern, error = %e, "Player output pattern failed to compile");
            None
        }
    }
}

/// One parsed player completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTurn {
    /// Spoken line; goes into the transcript
    pub action: String,
    /// Private reasoning, diagnostics only
    pub thoughts: Option<String>,
}

/// Split a raw player completion into its action and optional thoughts.
///
/// Everything after `[ACTION]` is the action. Without the marker the whole
/// completion is used and thoughts are dropped.
pub fn parse_player_output(raw: &str) -> PlayerTurn {
    let action = ACTION_RE
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());

    match action {
        Some(action) => {
            let thoughts = THOUGHTS_RE
                .as_ref()
                .and_then(|re| re.captures(raw))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string());
            PlayerTurn { action, thoughts }
        }
        None => PlayerTurn {
            action: raw.to_string(),
            thoughts: None,
        },
    }
}

/// Model-driven stand-in for a human player.
pub struct PlayerSimulator {
    client: Arc<CompletionClient>,
    log: ConversationLog,
}

impl PlayerSimulator {
    pub fn new(system_prompt: impl Into<String>, client: Arc<CompletionClient>) -> Self {
        Self {
            client,
            log: ConversationLog::new(system_prompt),
        }
    }

    /// Speak a scripted opening line verbatim.
    pub fn open_with(&mut self, seed_line: &str) -> PlayerTurn {
        self.log.record_scripted(seed_line);
        PlayerTurn {
            action: seed_line.to_string(),
            thoughts: None,
        }
    }

    /// Generate the next line, after recording the NPC's last reply if any.
    pub async fn next_action(
        &mut self,
        last_npc_line: Option<&str>,
        sampling: SamplingParams,
    ) -> PlayerTurn {
        if let Some(line) = last_npc_line.filter(|line| !line.is_empty()) {
            self.log.record_incoming(line);
        }

        let raw = self.log.respond(&self.client, sampling).await;
        let turn = parse_player_output(&raw);
        if let Some(thoughts) = &turn.thoughts {
            debug!(thoughts = %thoughts, "Player inner thoughts");
        }
        turn
    }

    pub fn history(&self) -> &ConversationLog {
        &self.log
    }
}
