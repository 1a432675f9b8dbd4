use crate::record::RunRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Reliability of one scenario across its `k` trials.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScenarioStats {
    pub scenario_id: String,
    pub trial_count: usize,
    pub pass_count: usize,
    /// At least one trial passed
    pub pass_at_k: bool,
    /// Every trial passed
    pub pass_caret_k: bool,
    pub average_score: f64,
}

impl ScenarioStats {
    fn from_totals(scenario_id: String, trial_count: usize, pass_count: usize, score_sum: f64) -> Self {
        let average_score = if trial_count > 0 {
            score_sum / trial_count as f64
        } else {
            0.0
        };

        Self {
            scenario_id,
            trial_count,
            pass_count,
            pass_at_k: pass_count >= 1,
            pass_caret_k: trial_count > 0 && pass_count == trial_count,
            average_score,
        }
    }
}

/// Group records by scenario id and fold each group into its stats.
pub fn aggregate<'a, I>(records: I) -> Vec<ScenarioStats>
where
    I: IntoIterator<Item = &'a RunRecord>,
{
    let mut totals: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.scenario.as_str()).or_default();
        entry.0 += 1;
        if record.passed() {
            entry.1 += 1;
        }
        entry.2 += record.score();
    }

    totals
        .into_iter()
        .map(|(scenario, (k, passes, score_sum))| {
            ScenarioStats::from_totals(scenario.to_string(), k, passes, score_sum)
        })
        .collect()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}
