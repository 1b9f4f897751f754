//! Shield operator CLI
//!
//! Scores payment identifiers and replays recorded predictor outputs through
//! the full assessment pipeline. Output is JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use shield_core::{
    identifier, AssessmentRequest, PolicyEngine, RecordedPredictions, RiskAssessor, ShieldConfig,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "shield",
    about = "Score payment identifiers and replay recorded risk assessments",
    version
)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a handle@provider payment identifier
    Identifier(IdentifierArgs),
    /// Re-run an assessment from a file of recorded predictor outputs
    Replay(ReplayArgs),
    /// List policy and identifier rules
    Rules,
}

#[derive(Args, Debug)]
struct IdentifierArgs {
    /// Identifier to score, e.g. name@okicici
    identifier: String,
    /// Display name shown for the payee
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// JSON file with `request` and `predictions`
    file: PathBuf,
    /// Attach the decision trace even if the recorded request did not ask for it
    #[arg(long)]
    trace: bool,
}

/// A recorded assessment
#[derive(Debug, Deserialize)]
struct Recording {
    request: AssessmentRequest,
    #[serde(default)]
    predictions: RecordedPredictions,
}

#[derive(Debug, Serialize)]
struct RuleListing {
    policy: Vec<RuleEntry>,
    identifier: Vec<RuleEntry>,
}

#[derive(Debug, Serialize)]
struct RuleEntry {
    id: &'static str,
    name: &'static str,
}

impl RuleListing {
    fn collect() -> Self {
        let entries = |catalog: Vec<(&'static str, &'static str)>| {
            catalog
                .into_iter()
                .map(|(id, name)| RuleEntry { id, name })
                .collect()
        };
        Self {
            policy: entries(PolicyEngine::catalog()),
            identifier: entries(identifier::rule_catalog()),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays machine-readable
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

async fn replay(args: ReplayArgs, config: ShieldConfig) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let mut recording: Recording = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.file.display()))?;
    if args.trace {
        recording.request.include_trace = true;
    }

    info!("Replaying assessment from {}", args.file.display());
    let assessor = RiskAssessor::new(recording.predictions.into_predictors(), config);
    let decision = assessor.assess(&recording.request).await?;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn score(args: IdentifierArgs) -> Result<()> {
    let result = identifier::score_identifier(&args.identifier, args.name.as_deref());
    debug!("Identifier rules fired: {}", result.contributions.len());

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_valid() {
        bail!("'{}' is not a valid payment identifier", args.identifier.trim());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = ShieldConfig::from_env().context("loading SHIELD__* configuration")?;
    debug!("Configuration: {:?}", config);

    match cli.command {
        Command::Identifier(args) => score(args),
        Command::Replay(args) => replay(args, config).await,
        Command::Rules => {
            println!("{}", serde_json::to_string_pretty(&RuleListing::collect())?);
            Ok(())
        }
    }
}
