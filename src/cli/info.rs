use anyhow::Result;
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};
use crate::config::Config;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo<'a> {
    version: &'static str,
    git_hash: &'static str,
    build_date: &'static str,
    config_path: String,
    config: &'a Config,
}

pub fn cmd_info(ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let info = BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_date: env!("BUILD_DATE"),
        config_path: ctx.config_path().display().to_string(),
        config: ctx.config(),
    };
    if let Some(text) = render(&info, &output)? {
        println!("{}", text);
        return Ok(());
    }

    let config = ctx.config();
    println!("SoulRecorder {} ({}, built {})", info.version, info.git_hash, info.build_date);
    println!("config file:            {}", info.config_path);
    println!("output dir:             {}", config.output_dir.display());
    println!("dedup window:           {} ms", config.dedup_window_ms);
    println!("step gap:               {} ms", config.step_gap_ms);
    println!("bus capacity:           {}", config.bus_capacity);
    println!("cross-origin handshake: {}", config.cross_origin_handshake);
    println!("page marker:            {}", config.emit_page_marker);
    println!("text limit:             {}", config.text_limit);
    Ok(())
}
