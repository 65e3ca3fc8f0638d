mod chart;
mod collect;
mod config;
mod elapsed;
mod github;
mod menu;
mod stats;
mod store;
mod summary;
mod visualize;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use config::{Command, Config};
use github::GithubClient;
use menu::Session;
use std::io;
use store::DataStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();
    tracing::debug!(
        api_url = %config.api_url,
        data_dir = %config.data_dir.display(),
        authenticated = config.token.is_some(),
        "starting"
    );

    let client = GithubClient::new(&config.api_url, config.token.clone());
    let store = DataStore::new(&config.data_dir);

    match &config.command {
        Some(Command::Collect { owner, repo }) => {
            let mut stdout = io::stdout().lock();
            if let Some(report) = collect::collect_repository(
                &client,
                &store,
                config.max_pages,
                owner,
                repo,
                &mut stdout,
            )
            .await?
            {
                tracing::info!(
                    pull_requests = report.pull_requests,
                    users = report.users,
                    "collection finished"
                );
            }
        }
        Some(Command::Summary { owner, repo }) => {
            let prs = store.load_pull_requests(owner, repo)?;
            println!(
                "{}",
                summary::summarize(&prs).describe(Utc::now().date_naive())
            );
        }
        None => {
            let stdin = io::stdin().lock();
            let stdout = io::stdout().lock();
            Session::new(
                &client,
                &store,
                config.theme,
                config.max_pages,
                stdin,
                stdout,
            )
            .run()
            .await?;
        }
    }

    Ok(())
}
