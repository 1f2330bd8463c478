use clap::Subcommand;

use super::extract::ExtractArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the HTTP scrape service
    Serve(ServeArgs),

    /// Extract statistics for one profile URL and print them as JSON
    Extract(ExtractArgs),

    /// Show build information, detected browser and effective configuration
    Info,
}
