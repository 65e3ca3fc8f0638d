//! CSV files under the data directory.
//!
//! Every file is written header first, even when it holds no rows, so the
//! readers can always match columns by name.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const REPOSITORY_HEADERS: [&str; 8] = [
    "Name",
    "Owner",
    "Description",
    "Homepage",
    "License",
    "Forks",
    "Watchers",
    "Date of Collection",
];

pub const PULL_REQUEST_HEADERS: [&str; 12] = [
    "Title",
    "PR_Number",
    "Body",
    "State",
    "Created_At",
    "Closed_At",
    "User",
    "Author_Association",
    "Commits",
    "Additions",
    "Deletions",
    "Changed_Files",
];

pub const USER_HEADERS: [&str; 6] = [
    "Repository",
    "Username",
    "Repositories",
    "Followers",
    "Following",
    "Contributions",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Homepage")]
    pub homepage: String,
    #[serde(rename = "License")]
    pub license: String,
    #[serde(rename = "Forks")]
    pub forks: u64,
    #[serde(rename = "Watchers")]
    pub watchers: u64,
    #[serde(rename = "Date of Collection")]
    pub date_of_collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "PR_Number")]
    pub number: u64,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Created_At")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "Closed_At")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Author_Association")]
    pub author_association: String,
    #[serde(rename = "Commits")]
    pub commits: u64,
    #[serde(rename = "Additions")]
    pub additions: u64,
    #[serde(rename = "Deletions")]
    pub deletions: u64,
    #[serde(rename = "Changed_Files")]
    pub changed_files: u64,
}

impl PullRequestRecord {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    pub fn is_closed(&self) -> bool {
        self.state == "closed"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Repositories")]
    pub repositories: u64,
    #[serde(rename = "Followers")]
    pub followers: u64,
    #[serde(rename = "Following")]
    pub following: u64,
    #[serde(rename = "Contributions")]
    pub contributions: u64,
}

/// Root of the CSV and plot files.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn repositories_path(&self) -> PathBuf {
        self.root.join("repositories.csv")
    }

    pub fn users_path(&self) -> PathBuf {
        self.root.join("users.csv")
    }

    pub fn pull_requests_path(&self, owner: &str, repo: &str) -> PathBuf {
        self.root.join("repos").join(format!("{owner}-{repo}.csv"))
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.root.join("plots")
    }

    pub fn load_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        read_records(&self.repositories_path())
    }

    /// Replace the row with the same owner and name, or append a new one.
    pub fn save_repository(&self, record: RepositoryRecord) -> Result<()> {
        let path = self.repositories_path();
        let mut rows: Vec<RepositoryRecord> = if path.exists() {
            read_records(&path)?
        } else {
            Vec::new()
        };

        match rows
            .iter_mut()
            .find(|r| r.owner == record.owner && r.name == record.name)
        {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }

        write_records(&path, &REPOSITORY_HEADERS, &rows)
    }

    pub fn write_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        rows: &[PullRequestRecord],
    ) -> Result<()> {
        write_records(
            &self.pull_requests_path(owner, repo),
            &PULL_REQUEST_HEADERS,
            rows,
        )
    }

    pub fn load_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequestRecord>> {
        read_records(&self.pull_requests_path(owner, repo))
    }

    pub fn load_users(&self) -> Result<Vec<UserRecord>> {
        read_records(&self.users_path())
    }

    /// Replace every row of `repository` with `rows`, keeping other repositories.
    pub fn save_users(&self, repository: &str, rows: &[UserRecord]) -> Result<()> {
        let path = self.users_path();
        let mut all: Vec<UserRecord> = if path.exists() {
            read_records(&path)?
        } else {
            Vec::new()
        };

        all.retain(|r| r.repository != repository);
        all.extend_from_slice(rows);

        write_records(&path, &USER_HEADERS, &all)
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_records<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(headers)?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write a row to {}", path.display()))?;
    }
    writer.flush()?;

    Ok(())
}
