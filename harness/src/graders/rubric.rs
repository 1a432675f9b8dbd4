//! Model-judged rubric grading.
//!
//! The judge is asked for a JSON object and may wrap it in prose. The first
//! `{` that starts a complete JSON object wins; otherwise the whole text is
//! parsed. Anything unparseable becomes an `ERROR` grade carrying the raw
//! output, never a failure of the run.

use super::{coerce_number, RubricGrade, Verdict};
use crate::agents::prompts::{JudgePrompt, JUDGE_SYSTEM_PROMPT};
use crate::scenario::Rubric;
use crate::transcript::Transcript;
use model::{ChatMessage, CompletionClient};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RubricGrader {
    client: Arc<CompletionClient>,
    temperature: f32,
}

impl RubricGrader {
    pub fn new(client: Arc<CompletionClient>) -> Self {
        Self {
            client,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn messages(transcript: &Transcript, rubric: &Rubric) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(JUDGE_SYSTEM_PROMPT),
            ChatMessage::user(JudgePrompt::build(transcript, rubric)),
        ]
    }

    /// Ask the judge once and parse its verdict.
    pub async fn grade(
        &self,
        transcript: &Transcript,
        rubric: &Rubric,
        seed: Option<u64>,
    ) -> RubricGrade {
        let messages = Self::messages(transcript, rubric);
        let raw = self.client.complete(&messages, self.temperature, seed).await;
        debug!(chars = raw.len(), "Judge responded");
        parse_judge_output(&raw, rubric)
    }
}

/// First JSON object embedded in `raw`, or `raw` itself parsed as JSON.
///
/// Braces nested inside a rejected candidate are never tried on their own,
/// and a candidate that runs off the end of the text is an error.
pub fn extract_json_object(raw: &str) -> Result<Value, serde_json::Error> {
    let mut resume_at = 0;
    for (start, _) in raw.match_indices('{') {
        if start < resume_at {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => return Ok(value),
            Some(Err(e)) if e.is_eof() => return Err(e),
            _ => {}
        }
        resume_at = match balanced_end(&raw[start..]) {
            Some(len) => start + len,
            None => raw.len(),
        };
    }
    serde_json::from_str(raw)
}

/// Byte length of the brace group opening `text`, string literals respected.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Build a rubric grade from the judge's raw text.
///
/// A parsed object always yields `PASS`; no score threshold is applied.
pub fn parse_judge_output(raw: &str, rubric: &Rubric) -> RubricGrade {
    let object = match extract_json_object(raw) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return parse_failure(format!("expected a JSON object, found {}", other), raw);
        }
        Err(e) => return parse_failure(e.to_string(), raw),
    };

    let total_score = match coerce_number(object.get("total_score")) {
        Ok(score) => score,
        Err(e) => return parse_failure(format!("total_score: {}", e), raw),
    };

    let max_possible_score = match object.get("max_possible_score") {
        None | Some(Value::Null) => rubric.max_possible_score(),
        Some(value) => match coerce_number(Some(value)) {
            Ok(score) => score,
            Err(e) => return parse_failure(format!("max_possible_score: {}", e), raw),
        },
    };

    RubricGrade::Scored {
        result: Verdict::Pass,
        scores: object_field(&object, "scores"),
        reasoning: object_field(&object, "reasoning"),
        total_score,
        max_possible_score,
        raw_output: raw.to_string(),
    }
}

fn object_field(object: &Map<String, Value>, key: &str) -> BTreeMap<String, Value> {
    match object.get(key) {
        Some(Value::Object(map)) => map.clone().into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

fn parse_failure(error: String, raw: &str) -> RubricGrade {
    warn!(error = %error, "Failed to parse judge output");
    RubricGrade::error(error, raw)
}
