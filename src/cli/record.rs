use std::path::{Path, PathBuf};

use action_recorder::{AssertionType, WireAction};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};
use crate::harness::{SessionHarness, SessionOutcome, WindowStatus};
use crate::script::SessionScript;

#[derive(Args, Clone, Debug)]
pub struct RecordArgs {
    /// Session script (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub script: PathBuf,

    /// Write the sealed recording as JSON lines, one action per line
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Also save the recording under the configured output directory
    #[arg(long)]
    pub save: bool,

    /// Override the duplicate suppression window (ms)
    #[arg(long, value_name = "MS")]
    pub dedup_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordReport<'a> {
    recording_id: String,
    source_url: &'a str,
    actions: &'a [WireAction],
    assertions: &'a [AssertionType],
    statuses: &'a [WindowStatus],
}

pub(crate) async fn read_script(path: &Path) -> Result<SessionScript> {
    let source = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    SessionScript::from_yaml(&source).with_context(|| format!("Invalid script {}", path.display()))
}

pub async fn cmd_record(args: RecordArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let script = read_script(&args.script).await?;
    let mut config = ctx.config().clone();
    if let Some(ms) = args.dedup_ms {
        config.dedup_window_ms = ms;
    }
    let output_dir = config.output_dir.clone();

    let mut harness = SessionHarness::load(&script, config)?;
    harness.run(&script.steps)?;
    let outcome = harness.finish()?;
    let wire: Vec<WireAction> = outcome
        .recording
        .actions()
        .iter()
        .map(WireAction::from)
        .collect();

    if let Some(path) = &args.out {
        write_jsonl(path, &wire).await?;
    }
    if args.save {
        fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let path = output_dir.join(format!("{}.jsonl", outcome.recording.id));
        write_jsonl(&path, &wire).await?;
    }

    let report = RecordReport {
        recording_id: outcome.recording.id.to_string(),
        source_url: &outcome.recording.source_url,
        actions: &wire,
        assertions: &outcome.assertions,
        statuses: &outcome.statuses,
    };
    match render(&report, &output)? {
        Some(text) => println!("{}", text),
        None => print_human(&outcome, &wire),
    }
    Ok(())
}

async fn write_jsonl(path: &Path, actions: &[WireAction]) -> Result<()> {
    let mut body = String::new();
    for action in actions {
        body.push_str(&serde_json::to_string(action).context("Failed to encode action")?);
        body.push('\n');
    }
    fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), actions = actions.len(), "recording written");
    Ok(())
}

fn print_human(outcome: &SessionOutcome, actions: &[WireAction]) {
    println!(
        "Recording {} ({})",
        outcome.recording.id, outcome.recording.source_url
    );
    for (index, action) in actions.iter().enumerate() {
        println!("{:>3}. [{}] {}", index + 1, action.kind, action.description);
        match &action.xpath {
            Some(xpath) => println!("       xpath: {}", xpath),
            None => println!("       full:  {}", action.full_xpath),
        }
        if let Some(frames) = &action.iframe {
            println!("       frames: {}", frames.len());
        }
        if let Some(hosts) = &action.shadow {
            println!("       shadow hosts: {}", hosts.len());
        }
    }
    for status in &outcome.statuses {
        println!(
            "window {} ({}): {}, {} actions, {} pending, {} roots observed",
            status.window,
            status.url,
            status.status.state,
            status.status.action_count,
            status.status.pending_inputs,
            status.status.observed_roots
        );
    }
    println!(
        "{} actions recorded, {} assertions completed",
        actions.len(),
        outcome.assertions.len()
    );
}
