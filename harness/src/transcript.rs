use serde::{Deserialize, Serialize};
use std::fmt;

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Speaker {
    Player,
    #[serde(rename = "NPC")]
    Npc,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Player => write!(f, "Player"),
            Speaker::Npc => write!(f, "NPC"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptLine {
    pub turn: usize,
    pub speaker: Speaker,
    pub content: String,
}

/// Ordered dialogue of one run: Player then NPC for each turn index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Transcript(Vec<TranscriptLine>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: usize, speaker: Speaker, content: impl Into<String>) {
        self.0.push(TranscriptLine {
            turn,
            speaker,
            content: content.into(),
        });
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn npc_lines(&self) -> impl Iterator<Item = &TranscriptLine> {
        self.0.iter().filter(|line| line.speaker == Speaker::Npc)
    }

    /// `"{speaker}: {content}"` per line, newline terminated.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|line| format!("{}: {}\n", line.speaker, line.content))
            .collect()
    }
}

impl From<Vec<TranscriptLine>> for Transcript {
    fn from(lines: Vec<TranscriptLine>) -> Self {
        Self(lines)
    }
}
