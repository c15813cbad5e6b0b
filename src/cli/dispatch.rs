use super::env::CliArgs;
use super::info::cmd_info;
use super::locate::cmd_locate;
use super::record::cmd_record;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Record(args) => cmd_record(args, ctx, cli.output.clone()).await,
        Commands::Locate(args) => cmd_locate(args, ctx, cli.output.clone()).await,
        Commands::Info => cmd_info(ctx, cli.output.clone()),
    }
}
