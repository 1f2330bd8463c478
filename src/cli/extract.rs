use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;
use crate::orchestrator::{Extractor, StatisticsSource};

#[derive(Args, Clone)]
pub struct ExtractArgs {
    /// Profile page URL
    pub url: String,

    /// Pretty-print the JSON record
    #[arg(long)]
    pub pretty: bool,
}

pub async fn cmd_extract(args: ExtractArgs, config: &Config) -> Result<()> {
    let url = url::Url::parse(&args.url)
        .with_context(|| format!("invalid profile URL {}", args.url))?;
    let extractor = Extractor::from_config(config).context("failed to prepare extractor")?;

    let record = extractor.extract_statistics(url.as_str()).await?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };
    println!("{}", rendered);
    Ok(())
}
