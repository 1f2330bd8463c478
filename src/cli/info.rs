use anyhow::Result;
use cdp_adapter::discover_browser;

use super::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("statgrab System Information");
    println!("===========================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("STATGRAB_BUILD_DATE"));
    println!("Git Commit: {}", env!("STATGRAB_GIT_HASH"));
    println!();

    println!("Browser:");
    match config.browser.executable.as_ref() {
        Some(path) => println!("- Configured executable: {}", path.display()),
        None => match discover_browser() {
            Some(found) => println!(
                "- Detected executable: {} (via {})",
                found.path.display(),
                found.source.describe()
            ),
            None => println!("- Detected executable: (none found; set STATGRAB_CHROME)"),
        },
    }
    if let Some(ws) = config.browser.ws_url.as_deref() {
        println!("- DevTools endpoint: {}", ws);
    }
    println!();

    match ctx.config_path() {
        Some(path) => println!("Configuration ({}):", path.display()),
        None => println!("Configuration (defaults):"),
    }
    print!("{}", serde_yaml::to_string(&config.redacted())?);
    Ok(())
}
