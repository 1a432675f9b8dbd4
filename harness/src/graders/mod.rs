//! Transcript graders and the grade wire format.
//!
//! Grades are persisted inside run records as JSON objects discriminated by
//! their `metric` field. Older files may carry shapes this version no longer
//! produces; they still deserialize so reports can be rebuilt from them.

pub mod rubric;
pub mod rules;

pub use rubric::{extract_json_object, RubricGrader};
pub use rules::{check_forbidden_content, check_keyword_presence, check_max_length};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

impl Verdict {
    pub fn from_score(score: u8) -> Self {
        if score > 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of a deterministic rule check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleGrade {
    pub result: Verdict,
    pub score: u8,
    pub reason: String,
}

impl RuleGrade {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            result: Verdict::Pass,
            score: 1,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            result: Verdict::Fail,
            score: 0,
            reason: reason.into(),
        }
    }
}

impl<'de> Deserialize<'de> for RuleGrade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Early records stored only `score`; the verdict follows from it.
        #[derive(Deserialize)]
        struct Stored {
            #[serde(default)]
            result: Option<Verdict>,
            #[serde(default, deserialize_with = "lenient_number")]
            score: f64,
            #[serde(default)]
            reason: String,
        }

        let stored = Stored::deserialize(deserializer)?;
        let score = if stored.score > 0.0 { 1 } else { 0 };
        Ok(Self {
            result: stored.result.unwrap_or_else(|| Verdict::from_score(score)),
            score,
            reason: stored.reason,
        })
    }
}

/// Outcome of the model-judged rubric grader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RubricGrade {
    /// The judge output could not be parsed
    Failed {
        result: Verdict,
        score: u8,
        error: String,
        raw_output: String,
    },
    Scored {
        result: Verdict,
        scores: BTreeMap<String, serde_json::Value>,
        #[serde(default)]
        reasoning: BTreeMap<String, serde_json::Value>,
        #[serde(default, deserialize_with = "lenient_number")]
        total_score: f64,
        #[serde(default, deserialize_with = "lenient_number")]
        max_possible_score: f64,
        #[serde(default)]
        raw_output: String,
    },
    /// Flat `score` shape written before dimension scoring existed
    Legacy {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Verdict>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_output: Option<String>,
    },
}

impl RubricGrade {
    pub fn error(error: impl Into<String>, raw_output: impl Into<String>) -> Self {
        RubricGrade::Failed {
            result: Verdict::Error,
            score: 0,
            error: error.into(),
            raw_output: raw_output.into(),
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            RubricGrade::Failed { result, .. } | RubricGrade::Scored { result, .. } => {
                Some(*result)
            }
            RubricGrade::Legacy { result, .. } => *result,
        }
    }

    /// Only an explicit FAIL or ERROR fails a run.
    pub fn passes(&self) -> bool {
        !matches!(self.verdict(), Some(Verdict::Fail) | Some(Verdict::Error))
    }

    /// The judge's total; zero for errors and legacy shapes.
    pub fn total_score(&self) -> f64 {
        match self {
            RubricGrade::Scored { total_score, .. } => *total_score,
            RubricGrade::Failed { .. } | RubricGrade::Legacy { .. } => 0.0,
        }
    }
}

/// A grade as persisted in a run record, keyed by `metric`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum GradeResult {
    MaxLengthCheck(RuleGrade),
    KeywordPresence(RuleGrade),
    ForbiddenContent(RuleGrade),
    RubricEval(RubricGrade),
    /// A metric this version does not know; neutral for pass/fail
    #[serde(other)]
    Unrecognized,
}

impl GradeResult {
    pub fn metric(&self) -> &'static str {
        match self {
            GradeResult::MaxLengthCheck(_) => "max_length_check",
            GradeResult::KeywordPresence(_) => "keyword_presence",
            GradeResult::ForbiddenContent(_) => "forbidden_content",
            GradeResult::RubricEval(_) => "rubric_eval",
            GradeResult::Unrecognized => "unrecognized",
        }
    }

    pub fn rule(&self) -> Option<&RuleGrade> {
        match self {
            GradeResult::MaxLengthCheck(grade)
            | GradeResult::KeywordPresence(grade)
            | GradeResult::ForbiddenContent(grade) => Some(grade),
            GradeResult::RubricEval(_) | GradeResult::Unrecognized => None,
        }
    }

    pub fn rubric(&self) -> Option<&RubricGrade> {
        match self {
            GradeResult::RubricEval(grade) => Some(grade),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            GradeResult::RubricEval(grade) => grade.verdict(),
            GradeResult::Unrecognized => None,
            other => other.rule().map(|grade| grade.result),
        }
    }

    pub fn passes(&self) -> bool {
        match self {
            GradeResult::RubricEval(grade) => grade.passes(),
            GradeResult::Unrecognized => true,
            other => other.rule().is_some_and(|grade| grade.result.is_pass()),
        }
    }
}

/// A run passes iff every grade passes.
pub fn all_pass(grades: &[GradeResult]) -> bool {
    grades.iter().all(GradeResult::passes)
}

/// Accepts numbers and numeric strings. `"-"`, `""` and `null` read as zero.
pub fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    coerce_number(value.as_ref()).map_err(serde::de::Error::custom)
}

pub fn coerce_number(value: Option<&serde_json::Value>) -> Result<f64, String> {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("number {} is out of range", n)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" {
                Ok(0.0)
            } else {
                trimmed
                    .parse::<f64>()
                    .map_err(|_| format!("expected a number, found \"{}\"", s))
            }
        }
        Some(other) => Err(format!("expected a number, found {}", other)),
    }
}
