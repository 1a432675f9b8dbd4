pub mod agents;
pub mod config;
pub mod conversation;
pub mod graders;
pub mod record;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod transcript;

pub use agents::{
    parse_player_output, ConversationLog, NpcAgent, PlayerSimulator, PlayerTurn, SamplingParams,
};
pub use config::{ConfigError, ConfigResult, EvalConfig, RunSettings};
pub use conversation::ConversationDriver;
pub use graders::{
    all_pass, check_forbidden_content, check_keyword_presence, check_max_length, GradeResult,
    RubricGrade, RubricGrader, RuleGrade, Verdict,
};
pub use record::{load_dir, LoadedRecord, RecordError, RecordResult, RunConfig, RunRecord};
pub use report::{aggregate, render_dashboard_data, render_markdown, ReportBuilder, ScenarioStats};
pub use runner::{BatchSummary, EvalError, EvalResult, EvalRunner, ScenarioFailure};
pub use scenario::{LoadedScenario, Rubric, Scenario, ScenarioError, ScenarioResult};
pub use transcript::{Speaker, Transcript, TranscriptLine};
