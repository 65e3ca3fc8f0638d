use crate::chart::Theme;
use crate::github::DEFAULT_API_URL;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Collect GitHub pull request data into CSV files and plot it.
#[derive(Parser, Debug)]
#[command(name = "gh-data-analysis", version)]
pub struct Config {
    /// GitHub personal access token; requests are anonymous without one.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory holding the CSV files and plots.
    #[arg(long, env = "GH_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Maximum number of pull request pages (100 per page) to fetch.
    #[arg(long, default_value_t = 10)]
    pub max_pages: u32,

    /// Colour theme of the generated plots.
    #[arg(long, value_enum, default_value_t = Theme::Light)]
    pub theme: Theme,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Collect data for one repository without the menu.
    Collect { owner: String, repo: String },
    /// Print the summary of a collected repository.
    Summary { owner: String, repo: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_arguments() {
        let config = Config::try_parse_from(["gh-data-analysis"]).unwrap();

        assert_eq!(config.max_pages, 10);
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert!(config.command.is_none());
    }

    #[test]
    fn collect_subcommand_takes_owner_and_repo() {
        let config = Config::try_parse_from([
            "gh-data-analysis",
            "--theme",
            "dark",
            "--max-pages",
            "2",
            "collect",
            "rust-lang",
            "cargo",
        ])
        .unwrap();

        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.max_pages, 2);
        assert_eq!(
            config.command,
            Some(Command::Collect {
                owner: "rust-lang".to_string(),
                repo: "cargo".to_string()
            })
        );
    }
}
