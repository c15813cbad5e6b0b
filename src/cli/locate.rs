use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};
use crate::cli::record::read_script;
use crate::harness::{ElementReport, SessionHarness};
use crate::script::{ScopedTarget, TargetRef};

#[derive(Args, Clone, Debug)]
pub struct LocateArgs {
    /// Session script (YAML) providing the page
    #[arg(short, long, value_name = "FILE")]
    pub script: PathBuf,

    /// XPath of the element, evaluated in the innermost frame or shadow scope
    #[arg(short, long)]
    pub target: String,

    /// iframe to descend into, outermost first (repeatable)
    #[arg(long = "frame", value_name = "XPATH")]
    pub frames: Vec<String>,

    /// Shadow host to descend into, outermost first (repeatable)
    #[arg(long = "shadow", value_name = "XPATH")]
    pub shadow: Vec<String>,

    /// Replay the script's steps before locating
    #[arg(long)]
    pub after_steps: bool,
}

pub async fn cmd_locate(args: LocateArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let script = read_script(&args.script).await?;
    let mut harness = SessionHarness::load(&script, ctx.config().clone())?;
    if args.after_steps {
        harness.run(&script.steps)?;
    }
    let target = TargetRef::Scoped(ScopedTarget {
        frames: args.frames,
        shadow: args.shadow,
        xpath: args.target,
    });
    let report = harness.describe(&target)?;
    match render(&report, &output)? {
        Some(text) => println!("{}", text),
        None => print_human(&report),
    }
    Ok(())
}

fn print_human(report: &ElementReport) {
    println!(
        "primary:   {}",
        report.locator.primary.as_deref().unwrap_or("(none unique)")
    );
    if let Some(strategy) = report.locator.strategy {
        println!("strategy:  {}", strategy.name());
    }
    println!("full path: {}", report.locator.full_path);
    for frame in &report.frames {
        match &frame.locator {
            Some(locator) => println!(
                "frame[{}]: {} (index {})",
                frame.depth,
                locator,
                frame
                    .ordinal_index
                    .map(|index| index.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ),
            None => println!("frame[{}]: cross-origin, identity unavailable", frame.depth),
        }
    }
    for host in &report.shadow {
        println!(
            "shadow:    {} ({}) -> {}",
            host.host_locator,
            host.mode.as_str(),
            host.inner_path_within_root
        );
        if let Some(note) = &host.note {
            println!("           {}", note);
        }
    }
}
