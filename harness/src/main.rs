use clap::{Parser, Subcommand};
use harness::report::{ReportBuilder, DASHBOARD_FILE, MARKDOWN_FILE};
use harness::{EvalConfig, EvalRunner};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "npc-evals")]
#[command(about = "Multi-turn evaluation harness for language-model driven NPCs")]
struct Cli {
    /// Batch configuration file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "evals.toml")]
    config: PathBuf,

    /// Use mock providers for every role
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every scenario, then write the report and dashboard data
    Run {
        /// Directory containing scenario YAML files
        #[arg(long)]
        scenarios: Option<PathBuf>,
        /// Directory run records are written to
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory the report and dashboard data are written to
        #[arg(long)]
        report_dir: Option<PathBuf>,
        /// Trials per scenario
        #[arg(short = 'k', long)]
        trials: Option<u32>,
        /// Trials running at once
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        /// Sampling temperature for both agents
        #[arg(long)]
        temperature: Option<f32>,
        /// Base seed; trial n uses seed + n
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Build the Markdown report from existing run records
    Report {
        /// Directory containing run records
        #[arg(long)]
        runs: Option<PathBuf>,
        /// Output file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write the dashboard data script from existing run records
    Dashboard {
        /// Directory containing run records
        #[arg(long)]
        runs: Option<PathBuf>,
        /// Output file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Check that the configured providers are reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = EvalConfig::load_or_default(&cli.config)?;
    if cli.mock {
        config = config.force_mock();
    }

    match cli.command {
        Commands::Run {
            scenarios,
            output,
            report_dir,
            trials,
            concurrency,
            temperature,
            seed,
        } => {
            let run = &mut config.run;
            if let Some(dir) = scenarios {
                run.scenarios_dir = dir;
            }
            if let Some(dir) = output {
                run.output_dir = dir;
            }
            if let Some(dir) = report_dir {
                run.report_dir = dir;
            }
            if let Some(trials) = trials {
                run.trials = trials;
            }
            if let Some(concurrency) = concurrency {
                run.concurrency = concurrency;
            }
            if let Some(temperature) = temperature {
                run.temperature = temperature;
            }
            if seed.is_some() {
                run.seed = seed;
            }
            run_batch(&config).await?;
        }
        Commands::Report { runs, out } => {
            let runs = runs.unwrap_or_else(|| config.run.output_dir.clone());
            let out = out.unwrap_or_else(|| config.run.report_dir.join(MARKDOWN_FILE));
            let builder = ReportBuilder::from_dir(&runs)?;
            builder.write_markdown(&out)?;
            println!("Report generated at {}", out.display());
        }
        Commands::Dashboard { runs, out } => {
            let runs = runs.unwrap_or_else(|| config.run.output_dir.clone());
            let out = out.unwrap_or_else(|| config.run.report_dir.join(DASHBOARD_FILE));
            let builder = ReportBuilder::from_dir(&runs)?;
            builder.write_dashboard(&out)?;
            println!(
                "Wrote {} records to {}",
                builder.records().len(),
                out.display()
            );
        }
        Commands::Health => {
            health_check(&config).await?;
        }
    }

    Ok(())
}

async fn run_batch(config: &EvalConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runner = EvalRunner::from_config(config)?;
    let settings = runner.settings();

    let summary = runner.run_dir(&settings.scenarios_dir).await?;
    println!(
        "Finished: {} runs written, {} failed, {} scenarios skipped",
        summary.runs_written.len(),
        summary.runs_failed,
        summary.scenario_failures.len()
    );
    for failure in &summary.scenario_failures {
        println!("  ✗ {}: {}", failure.path.display(), failure.error);
    }

    if summary.runs_written.is_empty() {
        info!("No runs written, skipping report");
        return Ok(());
    }

    write_reports(&settings.output_dir, &settings.report_dir)
}

fn write_reports(runs_dir: &Path, report_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let builder = ReportBuilder::from_dir(runs_dir)?;
    let markdown = builder.write_markdown(&report_dir.join(MARKDOWN_FILE))?;
    let dashboard = builder.write_dashboard(&report_dir.join(DASHBOARD_FILE))?;

    for stats in builder.stats() {
        println!(
            "  {}: {}/{} passed, pass@k={} pass^k={}, avg score {:.2}",
            stats.scenario_id,
            stats.pass_count,
            stats.trial_count,
            harness::report::stats::yes_no(stats.pass_at_k),
            harness::report::stats::yes_no(stats.pass_caret_k),
            stats.average_score
        );
    }
    println!("Report generated at {}", markdown.display());
    println!("Dashboard data written to {}", dashboard.display());
    Ok(())
}

async fn health_check(config: &EvalConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Performing health check...");
    let runner = EvalRunner::from_config(config)?;

    let mut healthy = true;
    for (role, client) in runner.clients() {
        match client.provider().health_check().await {
            Ok(()) => {
                println!(
                    "✓ {} ({} / {}) is reachable",
                    role,
                    client.provider_name(),
                    client.model()
                );
                info!(role, provider = client.provider_name(), "Health check successful");
            }
            Err(e) => {
                println!("✗ {} ({}) failed: {}", role, client.provider_name(), e);
                error!(role, "Health check failed: {}", e);
                healthy = false;
            }
        }
    }

    if healthy {
        Ok(())
    } else {
        Err("one or more providers failed the health check".into())
    }
}
