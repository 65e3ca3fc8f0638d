//! Plots and correlations computed from the saved CSV files.

use crate::chart::{self, Series, Theme};
use crate::stats::CorrelationMatrix;
use crate::store::{DataStore, PullRequestRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

/// Plots drawn from one repository's pull request file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryPlot {
    CommitsByState,
    AdditionsDeletions,
    ChangedFilesByAssociation,
    AdditionsVsDeletions,
    PullRequestsPerDay,
    OpenedClosedPerDay,
}

impl RepositoryPlot {
    fn file_stem(self) -> &'static str {
        match self {
            Self::CommitsByState => "boxplot-commits",
            Self::AdditionsDeletions => "boxplot-additions-deletions",
            Self::ChangedFilesByAssociation => "boxplot-changed-files-association",
            Self::AdditionsVsDeletions => "scatter-additions-deletions",
            Self::PullRequestsPerDay => "line-prs-per-day",
            Self::OpenedClosedPerDay => "line-opened-closed-per-day",
        }
    }

    fn render(self, theme: Theme, repo: &str, prs: &[PullRequestRecord]) -> String {
        let values = |f: fn(&PullRequestRecord) -> u64, keep: fn(&PullRequestRecord) -> bool| {
            prs.iter()
                .filter(|pr| keep(pr))
                .map(|pr| f(pr) as f64)
                .collect::<Vec<_>>()
        };

        match self {
            Self::CommitsByState => chart::box_plot(
                theme,
                &format!("Commits in Open vs Closed Pull Requests ({repo})"),
                "Commits",
                &[
                    ("Open".to_string(), values(|pr| pr.commits, PullRequestRecord::is_open)),
                    ("Closed".to_string(), values(|pr| pr.commits, PullRequestRecord::is_closed)),
                ],
            ),
            Self::AdditionsDeletions => chart::box_plot(
                theme,
                &format!("Additions and Deletions in Pull Requests ({repo})"),
                "Lines",
                &[
                    ("Additions".to_string(), values(|pr| pr.additions, |_| true)),
                    ("Deletions".to_string(), values(|pr| pr.deletions, |_| true)),
                ],
            ),
            Self::ChangedFilesByAssociation => {
                let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
                for pr in prs {
                    let association = if pr.author_association.is_empty() {
                        "NONE"
                    } else {
                        pr.author_association.as_str()
                    };
                    groups
                        .entry(association.to_string())
                        .or_default()
                        .push(pr.changed_files as f64);
                }
                chart::box_plot(
                    theme,
                    &format!("Changed Files by Author Association ({repo})"),
                    "Changed files",
                    &groups.into_iter().collect::<Vec<_>>(),
                )
            }
            Self::AdditionsVsDeletions => chart::scatter_plot(
                theme,
                &format!("Additions vs Deletions ({repo})"),
                "Additions",
                "Deletions",
                &prs
                    .iter()
                    .map(|pr| (pr.additions as f64, pr.deletions as f64))
                    .collect::<Vec<_>>(),
            ),
            Self::PullRequestsPerDay => {
                let created: Vec<NaiveDate> =
                    prs.iter().map(|pr| pr.created_at.date_naive()).collect();
                chart::line_chart(
                    theme,
                    &format!("Total Pull Requests per Day ({repo})"),
                    "Pull requests",
                    &[Series {
                        name: "Pull requests".to_string(),
                        points: daily_counts(&created, &created),
                    }],
                )
            }
            Self::OpenedClosedPerDay => {
                let opened: Vec<NaiveDate> =
                    prs.iter().map(|pr| pr.created_at.date_naive()).collect();
                let closed: Vec<NaiveDate> = prs
                    .iter()
                    .filter_map(|pr| pr.closed_at.map(|d| d.date_naive()))
                    .collect();
                let span: Vec<NaiveDate> = opened.iter().chain(&closed).copied().collect();
                chart::line_chart(
                    theme,
                    &format!("Opened vs Closed Pull Requests per Day ({repo})"),
                    "Pull requests",
                    &[
                        Series {
                            name: "Opened".to_string(),
                            points: daily_counts(&opened, &span),
                        },
                        Series {
                            name: "Closed".to_string(),
                            points: daily_counts(&closed, &span),
                        },
                    ],
                )
            }
        }
    }
}

/// Per-day counts of `dates` over every day between the extremes of `span`.
fn daily_counts(dates: &[NaiveDate], span: &[NaiveDate]) -> Vec<(NaiveDate, f64)> {
    let (Some(first), Some(last)) = (span.iter().min(), span.iter().max()) else {
        return Vec::new();
    };

    let mut counts: BTreeMap<NaiveDate, f64> = first
        .iter_days()
        .take_while(|d| d <= last)
        .map(|d| (d, 0.0))
        .collect();
    for date in dates {
        *counts.entry(*date).or_insert(0.0) += 1.0;
    }

    counts.into_iter().collect()
}

/// Renders `plot` for `owner/repo` and returns the written SVG path.
pub fn plot_repository(
    store: &DataStore,
    theme: Theme,
    plot: RepositoryPlot,
    owner: &str,
    repo: &str,
) -> Result<PathBuf> {
    let prs = store.load_pull_requests(owner, repo)?;
    let svg = plot.render(theme, repo, &prs);
    write_plot(store, &format!("{}-{owner}-{repo}", plot.file_stem()), &svg)
}

/// Bar plot of distinct contributors per repository in users.csv.
pub fn plot_users_per_repository(store: &DataStore, theme: Theme) -> Result<PathBuf> {
    let mut per_repo: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for user in store.load_users()? {
        per_repo.entry(user.repository).or_default().insert(user.username);
    }

    let bars: Vec<(String, f64)> = per_repo
        .into_iter()
        .map(|(repo, users)| (repo, users.len() as f64))
        .collect();
    let svg = chart::bar_chart(theme, "Users per Repository", "Users", &bars);
    write_plot(store, "bar-users-per-repository", &svg)
}

/// Correlations between Forks and Watchers across collected repositories.
pub fn repository_correlations(store: &DataStore) -> Result<CorrelationMatrix> {
    let repos = store.load_repositories()?;
    Ok(CorrelationMatrix::from_columns(&[
        ("Forks", repos.iter().map(|r| r.forks as f64).collect()),
        ("Watchers", repos.iter().map(|r| r.watchers as f64).collect()),
    ]))
}

/// Correlations between the numeric columns of one repository's PR file.
pub fn pull_request_correlations(
    store: &DataStore,
    owner: &str,
    repo: &str,
) -> Result<CorrelationMatrix> {
    let prs = store.load_pull_requests(owner, repo)?;
    let column = |f: fn(&PullRequestRecord) -> u64| -> Vec<f64> {
        prs.iter().map(|pr| f(pr) as f64).collect()
    };
    Ok(CorrelationMatrix::from_columns(&[
        ("Commits", column(|pr| pr.commits)),
        ("Additions", column(|pr| pr.additions)),
        ("Deletions", column(|pr| pr.deletions)),
        ("Changed_Files", column(|pr| pr.changed_files)),
    ]))
}

fn write_plot(store: &DataStore, stem: &str, svg: &str) -> Result<PathBuf> {
    let dir = store.plots_dir();
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{stem}.svg"));
    fs::write(&path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "plot written");
    Ok(path)
}
