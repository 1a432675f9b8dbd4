//! Batch execution of scenario trials.
//!
//! Every trial owns its agents and writes its own record, so trials of any
//! scenario run concurrently up to the configured limit. A scenario that
//! fails to load is reported and skipped; the rest of the batch continues.

use crate::agents::SamplingParams;
use crate::config::{EvalConfig, RunSettings};
use crate::conversation::ConversationDriver;
use crate::graders::{
    check_forbidden_content, check_keyword_presence, check_max_length, GradeResult, RubricGrader,
};
use crate::record::{RecordError, RunConfig, RunRecord};
use crate::scenario::{LoadedScenario, Scenario, ScenarioError};
use crate::transcript::Transcript;
use futures::stream::{self, StreamExt};
use model::{CompletionClient, ModelError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Model setup failed: {0}")]
    Model(#[from] ModelError),

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// A scenario file that could not be loaded.
#[derive(Debug)]
pub struct ScenarioFailure {
    pub path: PathBuf,
    pub error: ScenarioError,
}

/// Outcome counts for one batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub runs_written: Vec<PathBuf>,
    pub runs_failed: usize,
    pub scenario_failures: Vec<ScenarioFailure>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.runs_failed == 0 && self.scenario_failures.is_empty()
    }
}

pub struct EvalRunner {
    npc: Arc<CompletionClient>,
    player: Arc<CompletionClient>,
    judge: Arc<CompletionClient>,
    settings: RunSettings,
}

impl EvalRunner {
    pub fn new(
        npc: Arc<CompletionClient>,
        player: Arc<CompletionClient>,
        judge: Arc<CompletionClient>,
        settings: RunSettings,
    ) -> Self {
        Self {
            npc,
            player,
            judge,
            settings,
        }
    }

    pub fn from_config(config: &EvalConfig) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self::new(
            Arc::new(CompletionClient::from_config(&config.npc)?),
            Arc::new(CompletionClient::from_config(&config.player)?),
            Arc::new(CompletionClient::from_config(&config.judge)?),
            config.run.clone(),
        ))
    }

    /// All three roles backed by the offline mock.
    pub fn mock(settings: RunSettings) -> Self {
        Self::new(
            Arc::new(CompletionClient::mock()),
            Arc::new(CompletionClient::mock()),
            Arc::new(CompletionClient::mock()),
            settings,
        )
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn clients(&self) -> [(&'static str, &CompletionClient); 3] {
        [
            ("npc", self.npc.as_ref()),
            ("player", self.player.as_ref()),
            ("judge", self.judge.as_ref()),
        ]
    }

    /// Drive and grade one trial without persisting it.
    pub async fn evaluate(&self, loaded: &LoadedScenario, run_id: u32) -> RunRecord {
        let scenario = &loaded.scenario;
        let run_config = RunConfig {
            run_id,
            temperature: self.settings.temperature,
            seed: self.settings.trial_seed(run_id),
        };
        info!(
            scenario = %scenario.scenario_id,
            run_id,
            max_turns = scenario.max_turns,
            "Starting trial"
        );

        let mut driver =
            ConversationDriver::for_scenario(scenario, self.npc.clone(), self.player.clone());
        let transcript = driver
            .run(SamplingParams::new(run_config.temperature, run_config.seed))
            .await;

        let grades = self.grade(scenario, &transcript, run_config.seed).await;
        RunRecord::new(
            scenario.scenario_id.clone(),
            loaded.document.clone(),
            run_config,
            transcript,
            grades,
        )
    }

    pub async fn grade(
        &self,
        scenario: &Scenario,
        transcript: &Transcript,
        seed: Option<u64>,
    ) -> Vec<GradeResult> {
        let mut grades = vec![GradeResult::MaxLengthCheck(check_max_length(
            transcript,
            scenario.max_response_chars,
        ))];

        let must_have = &scenario.npc_profile.style_rules.must_have;
        if !must_have.is_empty() {
            grades.push(GradeResult::KeywordPresence(check_keyword_presence(
                transcript, must_have,
            )));
        }

        let forbidden = scenario.forbidden_phrases();
        if !forbidden.is_empty() {
            grades.push(GradeResult::ForbiddenContent(check_forbidden_content(
                transcript, &forbidden,
            )));
        }

        if let Some(rubric) = &scenario.rubric {
            let grader = RubricGrader::new(self.judge.clone())
                .with_temperature(self.settings.judge_temperature);
            grades.push(GradeResult::RubricEval(
                grader.grade(transcript, rubric, seed).await,
            ));
        }

        grades
    }

    /// Run, grade and persist one trial.
    pub async fn run_trial(&self, loaded: &LoadedScenario, run_id: u32) -> EvalResult<PathBuf> {
        let record = self.evaluate(loaded, run_id).await;
        let path = record.persist(&self.settings.output_dir)?;
        info!(
            scenario = %record.scenario,
            run_id,
            passed = record.passed(),
            path = %path.display(),
            "Trial finished"
        );
        Ok(path)
    }

    /// Load every scenario in `paths` and run `trials` trials of each.
    pub async fn run_batch(&self, paths: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut scenarios = Vec::new();

        for path in paths {
            match Scenario::load(path) {
                Ok(loaded) => scenarios.push(loaded),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping scenario");
                    summary.scenario_failures.push(ScenarioFailure {
                        path: path.clone(),
                        error: e,
                    });
                }
            }
        }

        let trials: Vec<(&LoadedScenario, u32)> = scenarios
            .iter()
            .flat_map(|loaded| (1..=self.settings.trials).map(move |run_id| (loaded, run_id)))
            .collect();
        info!(
            scenarios = scenarios.len(),
            trials = trials.len(),
            concurrency = self.settings.concurrency,
            "Running batch"
        );

        let results: Vec<_> = stream::iter(trials)
            .map(|(loaded, run_id)| async move {
                let result = self.run_trial(loaded, run_id).await;
                (loaded.scenario.scenario_id.as_str(), run_id, result)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for (scenario, run_id, result) in results {
            match result {
                Ok(path) => summary.runs_written.push(path),
                Err(e) => {
                    error!(scenario, run_id, error = %e, "Trial failed");
                    summary.runs_failed += 1;
                }
            }
        }

        summary.runs_written.sort();
        summary
    }

    /// Run every scenario discovered under `dir`.
    pub async fn run_dir(&self, dir: &Path) -> EvalResult<BatchSummary> {
        let paths = crate::scenario::discover(dir)?;
        if paths.is_empty() {
            warn!(dir = %dir.display(), "No scenarios found");
        }
        Ok(self.run_batch(&paths).await)
    }
}
