use super::stats::{aggregate, yes_no};
use crate::graders::{GradeResult, RubricGrade};
use crate::record::LoadedRecord;
use serde_json::Value;

/// Render the full Markdown report for `records`.
pub fn render_markdown(records: &[LoadedRecord]) -> String {
    let sorted = sort_newest_first(records);
    let mut md = String::new();

    md.push_str("# AI NPC Evaluation Report\n\n");
    md.push_str(&format!("**Total Runs**: {}\n\n", records.len()));

    md.push_str("## Reliability Analysis (Pass@k / Pass^k)\n");
    md.push_str("Concepts:\n");
    md.push_str("- **pass@k**: At least 1 success in k trials. Suitable for products allowing retry.\n");
    md.push_str("- **pass^k**: All k trials successful. Suitable for NPCs requiring high stability.\n\n");

    md.push_str("| Scenario | Trials (k) | Pass Count | pass@k | pass^k | Avg Score |\n");
    md.push_str("|----------|------------|------------|--------|--------|-----------|\n");
    for stats in aggregate(records.iter().map(|loaded| &loaded.record)) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.2} |\n",
            cell(&stats.scenario_id),
            stats.trial_count,
            stats.pass_count,
            yes_no(stats.pass_at_k),
            yes_no(stats.pass_caret_k),
            stats.average_score
        ));
    }

    md.push_str("\n## Run Summary\n\n");
    md.push_str("| Timestamp | Scenario | Run ID | Result | Score |\n");
    md.push_str("|-----------|----------|--------|--------|-------|\n");
    for loaded in &sorted {
        let record = &loaded.record;
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            record.timestamp,
            cell(&record.scenario),
            run_id_label(loaded),
            pass_label(record.passed()),
            record.score()
        ));
    }

    md.push_str("\n## Detailed Results\n\n");
    for loaded in &sorted {
        render_run(&mut md, loaded);
    }

    md
}

fn render_run(md: &mut String, loaded: &LoadedRecord) {
    let record = &loaded.record;
    md.push_str(&format!(
        "### Run: {} (Run {}, time: {})\n",
        record.scenario,
        run_id_label(loaded),
        record.timestamp
    ));
    md.push_str(&format!("**Result**: {}\n", pass_label(record.passed())));

    md.push_str("#### Rubric Evaluation\n");
    for grade in record.grades.iter().filter_map(GradeResult::rubric) {
        render_rubric(md, grade);
    }

    md.push_str("\n#### Transcript\n");
    md.push_str("```\n");
    md.push_str(&record.transcript.render());
    md.push_str("```\n\n");
    md.push_str("---\n");
}

fn render_rubric(md: &mut String, grade: &RubricGrade) {
    match grade {
        RubricGrade::Scored {
            scores,
            reasoning,
            total_score,
            ..
        } => {
            md.push_str("| Dimension | Score | Evidence/Reasoning |\n");
            md.push_str("|-----------|-------|--------------------|\n");
            for (dimension, score) in scores {
                let reason = reasoning
                    .get(dimension)
                    .map(plain)
                    .unwrap_or_else(|| "-".to_string());
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    cell(dimension),
                    cell(&plain(score)),
                    cell(&reason)
                ));
            }
            md.push_str(&format!("\n**Total Score**: {}\n", total_score));
        }
        RubricGrade::Failed {
            result,
            score,
            error,
            ..
        } => {
            md.push_str(&format!("- **Score**: {} ({})\n", score, result));
            md.push_str(&format!("  - Error: {}\n", error));
        }
        RubricGrade::Legacy {
            score,
            result,
            reason,
            ..
        } => {
            let score = score.as_ref().map(plain).unwrap_or_else(|| "-".to_string());
            let result = result
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!("- **Score**: {} ({})\n", score, result));
            if let Some(reason) = reason {
                md.push_str(&format!("  - Reason: {}\n", reason));
            }
        }
    }
}

pub(crate) fn sort_newest_first(records: &[LoadedRecord]) -> Vec<&LoadedRecord> {
    let mut sorted: Vec<&LoadedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
    sorted
}

fn run_id_label(loaded: &LoadedRecord) -> String {
    loaded
        .record
        .run_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn pass_label(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

/// JSON scalar as display text, strings without quotes.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep a value inside one table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::{RuleGrade, Verdict};
    use crate::record::{RunConfig, RunRecord};
    use crate::transcript::{Speaker, Transcript};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn loaded(run_id: u32, timestamp: &str, grades: Vec<GradeResult>) -> LoadedRecord {
        let mut transcript = Transcript::new();
        transcript.push(0, Speaker::Player, "Hello there!");
        transcript.push(0, Speaker::Npc, "Aye, what d'ye want?");
        let record = RunRecord::new(
            "blacksmith",
            json!({}),
            RunConfig {
                run_id,
                temperature: 0.7,
                seed: None,
            },
            transcript,
            grades,
        )
        .with_timestamp(timestamp);
        LoadedRecord {
            file_name: record.file_name(),
            record,
        }
    }

    fn scored(total: f64) -> GradeResult {
        let mut scores = BTreeMap::new();
        scores.insert("tone".to_string(), json!(4));
        let mut reasoning = BTreeMap::new();
        reasoning.insert("tone".to_string(), json!("Gruff | consistent\nthroughout"));
        GradeResult::RubricEval(RubricGrade::Scored {
            result: Verdict::Pass,
            scores,
            reasoning,
            total_score: total,
            max_possible_score: 5.0,
            raw_output: String::new(),
        })
    }

    #[test]
    fn test_report_sections() {
        let records = vec![
            loaded(1, "20250101_100000", vec![scored(4.0)]),
            loaded(
                2,
                "20250101_110000",
                vec![GradeResult::MaxLengthCheck(RuleGrade::fail("Failed turns: [0]"))],
            ),
        ];
        let md = render_markdown(&records);

        assert!(md.starts_with("# AI NPC Evaluation Report\n\n**Total Runs**: 2\n\n"));
        assert!(md.contains("| blacksmith | 2 | 1 | YES | NO | 2.00 |\n"));
        assert!(md.contains("| Dimension | Score | Evidence/Reasoning |\n"));
        assert!(md.contains("| tone | 4 | Gruff \\| consistent throughout |\n"));
        assert!(md.contains("\n**Total Score**: 4\n"));
        assert!(md.contains("```\nPlayer: Hello there!\nNPC: Aye, what d'ye want?\n```\n\n---\n"));

        let newer = md.find("| 20250101_110000 | blacksmith | 2 | FAIL | 0 |").unwrap();
        let older = md.find("| 20250101_100000 | blacksmith | 1 | PASS | 4 |").unwrap();
        assert!(newer < older);

        let detail_newer = md.find("### Run: blacksmith (Run 2, time: 20250101_110000)").unwrap();
        let detail_older = md.find("### Run: blacksmith (Run 1, time: 20250101_100000)").unwrap();
        assert!(detail_newer < detail_older);
    }

    #[test]
    fn test_error_and_legacy_rows() {
        let records = vec![
            loaded(
                1,
                "20250101_100000",
                vec![GradeResult::RubricEval(RubricGrade::error("no JSON", "???"))],
            ),
            loaded(
                2,
                "20240101_100000",
                vec![GradeResult::RubricEval(RubricGrade::Legacy {
                    score: Some(json!(7)),
                    result: Some(Verdict::Pass),
                    reason: Some("Good".to_string()),
                    raw_output: None,
                })],
            ),
        ];
        let md = render_markdown(&records);

        assert!(md.contains("- **Score**: 0 (ERROR)\n  - Error: no JSON\n"));
        assert!(md.contains("- **Score**: 7 (PASS)\n  - Reason: Good\n"));
        assert!(md.contains("| blacksmith | 2 | 1 | YES | NO | 0.00 |\n"));
    }

    #[test]
    fn test_empty_report() {
        let md = render_markdown(&[]);
        assert!(md.contains("**Total Runs**: 0"));
        assert!(md.contains("## Run Summary"));
    }
}
