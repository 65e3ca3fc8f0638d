use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Items requested per page when listing pull requests.
pub const PER_PAGE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct License {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Account,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<License>,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Entry of the pull request list endpoint. Counters are only on the detail.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestDetail {
    #[serde(default)]
    pub title: String,
    pub number: u64,
    pub body: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub user: Option<Account>,
    #[serde(default)]
    pub author_association: String,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
}

#[derive(Clone)]
pub struct GithubClient {
    base_url: Arc<String>,
    token: Option<Arc<String>>,
    http: Arc<Client>,
}

impl GithubClient {
    /// Create a REST client; requests are anonymous when `token` is `None`.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: Arc::new(base_url.trim_end_matches('/').to_string()),
            token: token.filter(|t| !t.is_empty()).map(Arc::new),
            http: Arc::new(Client::new()),
        }
    }

    /// Low-level GET with basic retry/backoff on rate limits and server errors.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        const MAX_RETRIES: usize = 4;
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            tracing::debug!(%url, attempt, authenticated = self.token.is_some(), "GET");

            let mut req = self
                .http
                .get(&url)
                .header(USER_AGENT, "gh-data-analysis")
                .header(ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                req = req.bearer_auth(token.as_str());
            }

            let resp = req
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("Network error requesting {url}: {e}"))?;

            let status = resp.status();
            let headers = resp.headers().clone();

            if status.is_success() {
                return resp
                    .json::<T>()
                    .await
                    .with_context(|| format!("Failed to parse JSON from {url}"));
            }

            if status.as_u16() == 429 {
                if attempt >= MAX_RETRIES {
                    return Err(anyhow::anyhow!(
                        "GitHub API returned 429 (rate-limited) for {url} and retries exhausted"
                    ));
                }
                let wait_secs = headers
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(2);
                tracing::warn!(%url, wait_secs, "rate limited, waiting");
                sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            if status.is_server_error() && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(250u64.saturating_mul(1 << (attempt - 1)));
                tracing::warn!(%url, status = status.as_u16(), ?backoff, "server error, retrying");
                sleep(backoff).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "GitHub API returned HTTP {} for {url}: {body}",
                status.as_u16()
            ));
        }
    }

    /// Repository metadata.
    pub async fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.get_json(&format!("/repos/{owner}/{repo}"))
            .await
            .with_context(|| format!("Failed to fetch repository {owner}/{repo}"))
    }

    /// List open and closed pull requests, newest first, up to `max_pages` pages.
    pub async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        max_pages: u32,
    ) -> Result<Vec<PullRequestSummary>> {
        let mut out = Vec::new();

        for page in 1..=max_pages.max(1) {
            let batch: Vec<PullRequestSummary> = self
                .get_json(&format!(
                    "/repos/{owner}/{repo}/pulls?state=all&per_page={PER_PAGE}&page={page}"
                ))
                .await
                .with_context(|| format!("Failed to list pull requests of {owner}/{repo}"))?;

            let short_page = batch.len() < PER_PAGE;
            out.extend(batch);
            if short_page {
                break;
            }
        }

        Ok(out)
    }

    /// Full pull request, including commit and line counters.
    pub async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestDetail> {
        self.get_json(&format!("/repos/{owner}/{repo}/pulls/{number}"))
            .await
            .with_context(|| format!("Failed to fetch pull request #{number} of {owner}/{repo}"))
    }

    pub async fn user(&self, login: &str) -> Result<UserProfile> {
        self.get_json(&format!("/users/{login}"))
            .await
            .with_context(|| format!("Failed to fetch user {login}"))
    }
}
