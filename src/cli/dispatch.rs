use anyhow::Result;

use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::extract::cmd_extract;
use super::info::cmd_info;
use super::serve::cmd_serve;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, ctx.config().clone()).await,
        Commands::Extract(args) => cmd_extract(args, ctx.config()).await,
        Commands::Info => cmd_info(ctx),
    }
}
