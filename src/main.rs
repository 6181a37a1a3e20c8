mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use newsdesk::config::Settings;
use newsdesk::Newsdesk;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(cli.config.as_deref())?;
    let desk = Newsdesk::connect(settings, true).await?;
    if cli.command.needs_session() {
        desk.require_session().await?;
    }
    cli::run(&desk, cli.command).await
}
