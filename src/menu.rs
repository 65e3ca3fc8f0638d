//! Interactive text menus over any line-based input and output.

use crate::chart::Theme;
use crate::collect::collect_repository;
use crate::github::GithubClient;
use crate::store::{DataStore, RepositoryRecord};
use crate::summary::summarize;
use crate::visualize::{self, RepositoryPlot};
use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{BufRead, Write};
use std::path::PathBuf;

const INVALID_CHOICE: &str = "Invalid choice, please try again.";

pub struct Session<'a, R, W> {
    client: &'a GithubClient,
    store: &'a DataStore,
    theme: Theme,
    max_pages: u32,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(
        client: &'a GithubClient,
        store: &'a DataStore,
        theme: Theme,
        max_pages: u32,
        input: R,
        out: W,
    ) -> Self {
        Self {
            client,
            store,
            theme,
            max_pages,
            input,
            out,
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }

    /// Prints `message` and reads one trimmed line; `None` at end of input.
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.out, "{message}")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Prints a failed action and lets the menu carry on.
    fn report(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = result {
            tracing::debug!("{e:?}");
            writeln!(self.out, "An error occurred: {e:#}")?;
        }
        Ok(())
    }

    /// Main menu; returns on "Exit" or end of input.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.out, "\nGitHub Data Analysis")?;
            writeln!(self.out, "1. Collect data for a specific repository")?;
            writeln!(self.out, "2. Show all repositories")?;
            writeln!(self.out, "3. Create visualizations")?;
            writeln!(self.out, "4. Calculate correlations")?;
            writeln!(self.out, "5. Exit")?;

            let Some(choice) = self.prompt("Enter your choice (1-5): ")? else {
                writeln!(self.out)?;
                return Ok(());
            };

            match choice.as_str() {
                "1" => {
                    let result = self.collect().await;
                    self.report(result)?;
                }
                "2" => {
                    let result = self.show_all_repositories();
                    self.report(result)?;
                }
                "3" => self.visualization_menu()?,
                "4" => {
                    let result = visualize::repository_correlations(self.store).and_then(|m| {
                        write!(self.out, "Correlations across repositories:\n{m}")?;
                        Ok(())
                    });
                    self.report(result)?;
                }
                "5" => {
                    writeln!(self.out, "Exiting...")?;
                    return Ok(());
                }
                _ => writeln!(self.out, "{INVALID_CHOICE}")?,
            }
        }
    }

    fn ask_repository(&mut self) -> Result<Option<(String, String)>> {
        let Some(owner) = self.prompt("Enter the repository owner's username: ")? else {
            return Ok(None);
        };
        let Some(repo) = self.prompt("Enter the repository name: ")? else {
            return Ok(None);
        };
        Ok(Some((owner, repo)))
    }

    async fn collect(&mut self) -> Result<()> {
        let Some((owner, repo)) = self.ask_repository()? else {
            return Ok(());
        };
        collect_repository(
            self.client,
            self.store,
            self.max_pages,
            &owner,
            &repo,
            &mut self.out,
        )
        .await?;
        Ok(())
    }

    fn show_all_repositories(&mut self) -> Result<()> {
        let repositories = self.store.load_repositories()?;

        writeln!(self.out, "Repositories:")?;
        for (idx, repo) in repositories.iter().enumerate() {
            writeln!(self.out, "{}. {}", idx + 1, repo.name)?;
        }

        let Some(answer) = self.prompt(
            "Select a repository for more actions (enter the number, or 0 to go back): ",
        )?
        else {
            return Ok(());
        };
        let choice: usize = answer
            .parse()
            .with_context(|| format!("Invalid repository number: {answer:?}"))?;
        if choice == 0 {
            return Ok(());
        }

        let selected = repositories
            .get(choice - 1)
            .cloned()
            .with_context(|| format!("There is no repository number {choice}"))?;
        self.repository_menu(&selected)
    }

    fn repository_menu(&mut self, repo: &RepositoryRecord) -> Result<()> {
        loop {
            writeln!(self.out, "\nSelected Repository: {}", repo.name)?;
            writeln!(self.out, "1. Show pull requests")?;
            writeln!(self.out, "2. Show repository summary")?;
            writeln!(self.out, "3. Go back")?;

            let Some(choice) = self.prompt("Enter your choice (1-3): ")? else {
                return Ok(());
            };

            match choice.as_str() {
                "1" => {
                    let result = self.show_pull_requests(&repo.owner, &repo.name);
                    self.report(result)?;
                }
                "2" => {
                    let result = self.show_summary(&repo.owner, &repo.name);
                    self.report(result)?;
                }
                "3" => return Ok(()),
                _ => writeln!(self.out, "{INVALID_CHOICE}")?,
            }
        }
    }

    fn show_pull_requests(&mut self, owner: &str, repo: &str) -> Result<()> {
        let prs = self.store.load_pull_requests(owner, repo)?;

        writeln!(self.out, "Pull Requests for {repo}:")?;
        for pr in &prs {
            writeln!(
                self.out,
                "#{} [{}] {} by {} ({} commits, +{} -{}, {} files, created {})",
                pr.number,
                pr.state,
                pr.title,
                pr.user,
                pr.commits,
                pr.additions,
                pr.deletions,
                pr.changed_files,
                pr.created_at.format("%Y-%m-%d"),
            )?;
        }
        Ok(())
    }

    fn show_summary(&mut self, owner: &str, repo: &str) -> Result<()> {
        let prs = self.store.load_pull_requests(owner, repo)?;
        let summary = summarize(&prs);
        writeln!(self.out, "{}", summary.describe(Utc::now().date_naive()))?;
        Ok(())
    }

    fn visualization_menu(&mut self) -> Result<()> {
        let Some((owner, repo)) = self.ask_repository()? else {
            return Ok(());
        };

        loop {
            writeln!(self.out, "\nVisualizations for Repository: {repo}")?;
            writeln!(self.out, "1. Boxplot of Commits in Open vs Closed Pull Requests")?;
            writeln!(self.out, "2. Boxplot of Additions and Deletions in Pull Requests")?;
            writeln!(self.out, "3. Boxplot of Changed Files by Author Association")?;
            writeln!(self.out, "4. Scatterplot of Additions vs Deletions")?;
            writeln!(self.out, "5. Line Graph of Total PRs per Day")?;
            writeln!(self.out, "6. Line Graph of Open vs Closed PRs per Day")?;
            writeln!(self.out, "7. Bar Plot of Users per Repository")?;
            writeln!(self.out, "8. Calculate correlations")?;
            writeln!(self.out, "9. Go Back")?;

            let Some(choice) = self.prompt("Enter your choice (1-9): ")? else {
                return Ok(());
            };

            let plot = match choice.as_str() {
                "1" => RepositoryPlot::CommitsByState,
                "2" => RepositoryPlot::AdditionsDeletions,
                "3" => RepositoryPlot::ChangedFilesByAssociation,
                "4" => RepositoryPlot::AdditionsVsDeletions,
                "5" => RepositoryPlot::PullRequestsPerDay,
                "6" => RepositoryPlot::OpenedClosedPerDay,
                "7" => {
                    let result = visualize::plot_users_per_repository(self.store, self.theme);
                    self.report_plot(result)?;
                    continue;
                }
                "8" => {
                    let result = visualize::pull_request_correlations(self.store, &owner, &repo)
                        .and_then(|m| {
                            write!(self.out, "Correlations for {owner}/{repo}:\n{m}")?;
                            Ok(())
                        });
                    self.report(result)?;
                    continue;
                }
                "9" => return Ok(()),
                _ => {
                    writeln!(self.out, "{INVALID_CHOICE}")?;
                    continue;
                }
            };

            let result = visualize::plot_repository(self.store, self.theme, plot, &owner, &repo);
            self.report_plot(result)?;
        }
    }

    fn report_plot(&mut self, result: Result<PathBuf>) -> Result<()> {
        let result = result.and_then(|path| {
            writeln!(self.out, "Plot saved to {}", path.display())?;
            Ok(())
        });
        self.report(result)
    }
}
