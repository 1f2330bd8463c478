#[tokio::main]
async fn main() -> anyhow::Result<()> {
    statgrab::cli::run().await
}
