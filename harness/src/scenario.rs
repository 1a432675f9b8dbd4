//! Scenario definitions.
//!
//! A scenario is a YAML document describing the NPC under test, the simulated
//! player, the turn budget, and how the transcript is graded. The parsed
//! document is kept verbatim (as JSON) so run records can embed it unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MAX_TURNS: usize = 8;
pub const DEFAULT_MAX_RESPONSE_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid scenario definition: {0}")]
    Definition(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),

    #[error("Invalid scenario glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub scenario_id: String,

    pub npc_profile: NpcProfile,

    #[serde(default)]
    pub constraints: Constraints,

    #[serde(default)]
    pub player_persona: PlayerPersona,

    #[serde(default)]
    pub goal: String,

    /// Scripted opening line spoken by the player on turn 0
    #[serde(default)]
    pub seed_dialogue: Option<String>,

    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default)]
    pub rubric: Option<Rubric>,

    /// Per-line character budget for NPC replies
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_max_response_chars() -> usize {
    DEFAULT_MAX_RESPONSE_CHARS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NpcProfile {
    pub name: String,

    #[serde(default)]
    pub archetype: String,

    #[serde(default)]
    pub style_rules: StyleRules,

    /// Replaces the generated NPC system prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StyleRules {
    #[serde(default)]
    pub must_have: Vec<String>,

    #[serde(default)]
    pub must_not: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    #[serde(default)]
    pub hard_fail: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerPersona {
    #[serde(default)]
    pub tone: String,

    #[serde(default)]
    pub traits: Vec<String>,

    /// Replaces the generated player system prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreRange {
    #[serde(default)]
    pub min: f64,

    #[serde(default = "default_range_max")]
    pub max: f64,
}

fn default_range_max() -> f64 {
    5.0
}

/// How the model judge scores a transcript.
///
/// A mapping with a `dimensions` key must hold valid score ranges, as must
/// a mapping whose entries look like `{min, max}`. Other mappings are kept
/// as freeform criteria.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Rubric {
    /// `{dimensions: {name: {min, max}}}`
    Dimensions {
        dimensions: BTreeMap<String, ScoreRange>,
    },
    /// `{name: {min, max}}`
    Ranges(BTreeMap<String, ScoreRange>),
    Text(String),
    /// Anything else, restated verbatim to the judge
    Freeform(serde_json::Value),
}

impl TryFrom<serde_json::Value> for Rubric {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::String(text) => Ok(Rubric::Text(text)),
            Value::Object(mut map) => {
                if let Some(dimensions) = map.remove("dimensions") {
                    let dimensions = serde_json::from_value(dimensions)?;
                    return Ok(Rubric::Dimensions { dimensions });
                }
                if looks_like_ranges(&map) {
                    return Ok(Rubric::Ranges(serde_json::from_value(Value::Object(map))?));
                }
                Ok(Rubric::Freeform(Value::Object(map)))
            }
            other => Ok(Rubric::Freeform(other)),
        }
    }
}

impl<'de> Deserialize<'de> for Rubric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Rubric::try_from(value).map_err(serde::de::Error::custom)
    }
}

fn looks_like_ranges(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    let entries: Option<Vec<_>> = map.values().map(|v| v.as_object()).collect();
    match entries {
        Some(entries) => entries
            .iter()
            .any(|inner| inner.contains_key("min") || inner.contains_key("max")),
        None => false,
    }
}

impl Rubric {
    pub fn dimensions(&self) -> Option<&BTreeMap<String, ScoreRange>> {
        match self {
            Rubric::Dimensions { dimensions } => Some(dimensions),
            Rubric::Ranges(ranges) => Some(ranges),
            Rubric::Text(_) | Rubric::Freeform(_) => None,
        }
    }

    /// Sum of dimension maxima; zero for unstructured rubrics.
    pub fn max_possible_score(&self) -> f64 {
        self.dimensions()
            .map(|dims| dims.values().map(|range| range.max).sum())
            .unwrap_or(0.0)
    }
}

/// A parsed scenario plus the document it came from.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub scenario: Scenario,
    pub document: serde_json::Value,
    pub source: Option<PathBuf>,
}

impl Scenario {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> ScenarioResult<LoadedScenario> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let document = serde_json::to_value(&raw)?;
        let scenario: Scenario = serde_json::from_value(document.clone())?;
        scenario.validate()?;

        Ok(LoadedScenario {
            scenario,
            document,
            source: None,
        })
    }

    pub fn load(path: &Path) -> ScenarioResult<LoadedScenario> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut loaded = Self::from_yaml_str(&yaml)?;
        loaded.source = Some(path.to_path_buf());
        Ok(loaded)
    }

    pub fn validate(&self) -> ScenarioResult<()> {
        if self.scenario_id.trim().is_empty() {
            return Err(ScenarioError::Invalid(
                "scenario_id cannot be empty".to_string(),
            ));
        }

        if self
            .scenario_id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
        {
            return Err(ScenarioError::Invalid(format!(
                "scenario_id '{}' must be usable in a file name",
                self.scenario_id
            )));
        }

        if self.npc_profile.name.trim().is_empty() {
            return Err(ScenarioError::Invalid(
                "npc_profile.name cannot be empty".to_string(),
            ));
        }

        if self.max_turns == 0 {
            return Err(ScenarioError::Invalid(
                "max_turns must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Phrases that must never appear in an NPC line.
    pub fn forbidden_phrases(&self) -> Vec<String> {
        let mut phrases: Vec<String> = self
            .npc_profile
            .style_rules
            .must_not
            .iter()
            .chain(self.constraints.hard_fail.iter())
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .collect();
        phrases.sort();
        phrases.dedup();
        phrases
    }
}

/// Scenario files (`*.yaml`, `*.yml`) directly under `dir`, sorted by path.
pub fn discover(dir: &Path) -> ScenarioResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for extension in ["yaml", "yml"] {
        let pattern = dir.join(format!("*.{}", extension));
        for entry in glob::glob(&pattern.to_string_lossy())? {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => tracing::warn!("Skipping unreadable scenario entry: {}", e),
            }
        }
    }
    paths.sort();
    Ok(paths)
}
