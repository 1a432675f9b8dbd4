//! End-to-end evaluation runs against the offline mock providers.

use async_trait::async_trait;
use harness::{
    load_dir, EvalConfig, EvalRunner, GradeResult, RubricGrade, RunSettings, Scenario,
    ScenarioError, Speaker, Verdict,
};
use model::mock::MOCK_PLAYER_LINES;
use model::{
    ChatMessage, ChatRequest, ChatResponse, Choice, CompletionClient, FinishReason, ModelInfo,
    ModelProvider, ModelResult,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Judge that never answers in JSON.
struct RamblingJudge;

#[async_trait]
impl ModelProvider for RamblingJudge {
    async fn chat(&self, _request: ChatRequest) -> ModelResult<ChatResponse> {
        Ok(ChatResponse {
            choices: vec![Choice {
                message: ChatMessage::assistant("The NPC was charming, I would say 8 out of 10."),
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: None,
        })
    }

    async fn list_models(&self) -> ModelResult<Vec<ModelInfo>> {
        Ok(vec![])
    }

    async fn health_check(&self) -> ModelResult<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "rambling"
    }
}

const GREETING: &str = r#"
scenario_id: greeting
npc_profile:
  name: Brom
  archetype: gruff dwarven blacksmith
  style_rules:
    must_have: [forge, Mock]
    must_not: [as an AI]
constraints:
  hard_fail: [language model]
player_persona:
  tone: curious
  traits: [polite]
goal: Learn about the forge.
seed_dialogue: Hello there!
max_turns: 2
rubric:
  dimensions:
    persona_consistency: {min: 0, max: 5}
    helpfulness: {min: 0, max: 5}
"#;

const NO_SEED: &str = r#"
scenario_id: wanderer
npc_profile:
  name: Mira
max_turns: 3
rubric: Judge whether Mira stays in character.
"#;

fn write_scenarios(dir: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).unwrap();
    }
}

fn runner(output: &TempDir, trials: u32) -> EvalRunner {
    EvalRunner::mock(
        RunSettings::default()
            .with_trials(trials)
            .with_concurrency(3)
            .with_seed(Some(7))
            .with_output_dir(output.path()),
    )
}

#[tokio::test]
async fn test_seeded_scenario_end_to_end() {
    let scenarios = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scenarios(scenarios.path(), &[("greeting.yaml", GREETING)]);

    let summary = runner(&output, 1).run_dir(scenarios.path()).await.unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.runs_written.len(), 1);

    let records = load_dir(output.path()).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0].record;

    let lines = record.transcript.lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].speaker, Speaker::Player);
    assert_eq!(lines[0].content, "Hello there!");
    assert_eq!(lines[1].content, "Mock NPC Response to: Hello there!...");
    assert!(MOCK_PLAYER_LINES.contains(&lines[2].content.as_str()));
    assert!(lines[3].content.starts_with("Mock NPC Response to: "));

    let turns: Vec<usize> = lines.iter().map(|l| l.turn).collect();
    assert_eq!(turns, vec![0, 0, 1, 1]);

    assert_eq!(record.run_config.map(|c| c.run_id), Some(1));
    assert_eq!(record.run_config.and_then(|c| c.seed), Some(8));
    assert_eq!(record.config["npc_profile"]["archetype"], "gruff dwarven blacksmith");
    assert!(record.grades.iter().any(|g| matches!(g, GradeResult::RubricEval(_))));
    assert!(record.passed());
}

#[tokio::test]
async fn test_unseeded_player_opens() {
    let scenarios = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scenarios(scenarios.path(), &[("wanderer.yml", NO_SEED)]);

    runner(&output, 1).run_dir(scenarios.path()).await.unwrap();
    let records = load_dir(output.path()).unwrap();
    let transcript = &records[0].record.transcript;

    assert_eq!(transcript.len(), 6);
    for (i, line) in transcript.lines().iter().enumerate() {
        let expected = if i % 2 == 0 { Speaker::Player } else { Speaker::Npc };
        assert_eq!(line.speaker, expected);
        assert_eq!(line.turn, i / 2);
        if expected == Speaker::Player {
            assert!(MOCK_PLAYER_LINES.contains(&line.content.as_str()));
        }
    }
}

#[tokio::test]
async fn test_malformed_scenario_does_not_stop_batch() {
    let scenarios = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scenarios(
        scenarios.path(),
        &[
            ("a_broken.yaml", "npc_profile:\n  name: Nobody\n"),
            ("b_not_yaml.yaml", "scenario_id: [unclosed\n"),
            ("greeting.yaml", GREETING),
        ],
    );

    let summary = runner(&output, 2).run_dir(scenarios.path()).await.unwrap();

    assert_eq!(summary.scenario_failures.len(), 2);
    assert!(matches!(
        summary.scenario_failures[0].error,
        ScenarioError::Definition(_)
    ));
    assert!(matches!(
        summary.scenario_failures[1].error,
        ScenarioError::Yaml(_)
    ));
    assert_eq!(summary.runs_written.len(), 2);
    assert_eq!(summary.runs_failed, 0);
}

#[tokio::test]
async fn test_concurrent_trials_write_distinct_records() {
    let scenarios = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scenarios(
        scenarios.path(),
        &[("greeting.yaml", GREETING), ("wanderer.yaml", NO_SEED)],
    );

    let summary = runner(&output, 4).run_dir(scenarios.path()).await.unwrap();
    assert_eq!(summary.runs_written.len(), 8);

    let records = load_dir(output.path()).unwrap();
    assert_eq!(records.len(), 8);

    for scenario in ["greeting", "wanderer"] {
        let mut ids: Vec<u32> = records
            .iter()
            .filter(|r| r.record.scenario == scenario)
            .filter_map(|r| r.record.run_id())
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    let leftovers = std::fs::read_dir(output.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .map(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                .unwrap_or(false)
        })
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_runner_from_default_config() {
    let config = EvalConfig::default();
    let runner = EvalRunner::from_config(&config).unwrap();
    for (_, client) in runner.clients() {
        assert_eq!(client.provider_name(), "mock");
    }

    let loaded = Scenario::from_yaml_str(GREETING).unwrap();
    let record = runner.evaluate(&loaded, 1).await;
    assert_eq!(record.transcript.len(), 4);
}

#[tokio::test]
async fn test_unwritable_output_counts_as_failed_run() {
    let scenarios = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scenarios(scenarios.path(), &[("greeting.yaml", GREETING)]);

    let blocker = output.path().join("runs");
    std::fs::write(&blocker, "not a directory").unwrap();

    let runner = EvalRunner::mock(RunSettings::default().with_output_dir(&blocker));
    let summary = runner.run_dir(scenarios.path()).await.unwrap();

    assert_eq!(summary.runs_failed, 1);
    assert!(summary.runs_written.is_empty());
}

#[test]
fn test_shipped_scenarios_load() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../evals/scenarios");
    let paths = harness::scenario::discover(&dir).unwrap();
    assert!(!paths.is_empty());
    for path in paths {
        let loaded = Scenario::load(&path).unwrap();
        assert!(loaded.scenario.rubric.is_some(), "{} has no rubric", path.display());
    }

    let config = EvalConfig::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("../evals.toml"))
        .unwrap();
    assert_eq!(config.run.trials, 3);
}

#[tokio::test]
async fn test_unparseable_judge_still_persists_run() {
    let scenarios = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scenarios(scenarios.path(), &[("greeting.yaml", GREETING)]);

    let runner = EvalRunner::new(
        Arc::new(CompletionClient::mock()),
        Arc::new(CompletionClient::mock()),
        Arc::new(CompletionClient::new(Arc::new(RamblingJudge), "judge-model")),
        RunSettings::default().with_output_dir(output.path()),
    );
    let summary = runner.run_dir(scenarios.path()).await.unwrap();
    assert_eq!(summary.runs_written.len(), 1);

    let records = load_dir(output.path()).unwrap();
    let record = &records[0].record;
    assert_eq!(record.transcript.len(), 4);
    assert!(!record.passed());

    let rubric = record.grades.iter().find_map(GradeResult::rubric).unwrap();
    assert_eq!(rubric.verdict(), Some(Verdict::Error));
    match rubric {
        RubricGrade::Failed { raw_output, .. } => {
            assert_eq!(raw_output, "The NPC was charming, I would say 8 out of 10.")
        }
        other => panic!("expected error grade, got {:?}", other),
    }
}
