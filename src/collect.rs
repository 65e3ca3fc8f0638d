//! Fetches one repository's pull requests and contributors and writes them to
//! the CSV store.

use crate::github::{GithubClient, PullRequestDetail, Repository};
use crate::store::{DataStore, PullRequestRecord, RepositoryRecord, UserRecord};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionReport {
    pub pull_requests: usize,
    pub users: usize,
}

/// Runs the whole collection for `owner/repo`.
///
/// Returns `Ok(None)` when the repository itself cannot be fetched; the
/// reason is logged and a notice is written to `out`.
pub async fn collect_repository<W: Write>(
    client: &GithubClient,
    store: &DataStore,
    max_pages: u32,
    owner: &str,
    repo: &str,
    out: &mut W,
) -> Result<Option<CollectionReport>> {
    let info = match client.repository(owner, repo).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("{e:#}");
            writeln!(
                out,
                "Failed to fetch repository data. The repository may not exist or there was an API error."
            )?;
            return Ok(None);
        }
    };

    // Files are keyed on the API's spelling; the typed names may differ in case.
    let owner = info.owner.login.as_str();
    let repo = info.name.as_str();
    let repository = format!("{owner}/{repo}");

    let pull_requests = fetch_pull_requests(client, max_pages, owner, repo).await?;
    store.write_pull_requests(owner, repo, &pull_requests)?;
    tracing::info!(owner, repo, count = pull_requests.len(), "pull requests saved");

    let usernames = extract_usernames(store, owner, repo)?;
    writeln!(out, "Usernames extracted: {usernames:?}")?;

    let rows = if usernames.is_empty() {
        writeln!(out, "No user data to fetch.")?;
        Vec::new()
    } else {
        let contributions = contributions_by_user(&pull_requests);
        fetch_users(client, &repository, &usernames, &contributions).await
    };
    store.save_users(&repository, &rows)?;
    let users = rows.len();

    store.save_repository(repository_record(&info))?;
    writeln!(out, "Repository data collected and saved successfully.")?;

    Ok(Some(CollectionReport {
        pull_requests: pull_requests.len(),
        users,
    }))
}

async fn fetch_pull_requests(
    client: &GithubClient,
    max_pages: u32,
    owner: &str,
    repo: &str,
) -> Result<Vec<PullRequestRecord>> {
    let listed = client.pull_requests(owner, repo, max_pages).await?;
    let mut records = Vec::with_capacity(listed.len());

    for summary in listed {
        match client.pull_request(owner, repo, summary.number).await {
            Ok(detail) => records.push(pull_request_record(detail)),
            // don't fail the whole run for one PR; log and continue.
            Err(e) => tracing::warn!("Skipping pull request #{}: {e:#}", summary.number),
        }
    }

    Ok(records)
}

async fn fetch_users(
    client: &GithubClient,
    repository: &str,
    usernames: &[String],
    contributions: &BTreeMap<&str, u64>,
) -> Vec<UserRecord> {
    let mut rows = Vec::with_capacity(usernames.len());

    for username in usernames {
        match client.user(username).await {
            Ok(profile) => rows.push(UserRecord {
                repository: repository.to_string(),
                username: username.clone(),
                repositories: profile.public_repos,
                followers: profile.followers,
                following: profile.following,
                contributions: contributions.get(username.as_str()).copied().unwrap_or(0),
            }),
            Err(e) => tracing::warn!("Skipping user {username}: {e:#}"),
        }
    }

    rows
}

/// Distinct, sorted PR authors read back from the saved PR file.
pub fn extract_usernames(store: &DataStore, owner: &str, repo: &str) -> Result<Vec<String>> {
    let names: BTreeSet<String> = store
        .load_pull_requests(owner, repo)?
        .into_iter()
        .map(|pr| pr.user)
        .filter(|user| !user.is_empty())
        .collect();

    Ok(names.into_iter().collect())
}

fn contributions_by_user(pull_requests: &[PullRequestRecord]) -> BTreeMap<&str, u64> {
    let mut counts = BTreeMap::new();
    for pr in pull_requests {
        *counts.entry(pr.user.as_str()).or_insert(0) += 1;
    }
    counts
}

fn pull_request_record(pr: PullRequestDetail) -> PullRequestRecord {
    PullRequestRecord {
        title: pr.title,
        number: pr.number,
        body: pr.body.unwrap_or_default(),
        state: pr.state,
        created_at: pr.created_at,
        closed_at: pr.closed_at,
        user: pr.user.map(|u| u.login).unwrap_or_default(),
        author_association: pr.author_association,
        commits: pr.commits,
        additions: pr.additions,
        deletions: pr.deletions,
        changed_files: pr.changed_files,
    }
}

fn repository_record(info: &Repository) -> RepositoryRecord {
    RepositoryRecord {
        name: info.name.clone(),
        owner: info.owner.login.clone(),
        description: info
            .description
            .clone()
            .unwrap_or_else(|| "No description".to_string()),
        homepage: info
            .homepage
            .clone()
            .unwrap_or_else(|| "No homepage".to_string()),
        license: info
            .license
            .as_ref()
            .and_then(|l| l.name.clone())
            .unwrap_or_else(|| "No license".to_string()),
        forks: info.forks_count,
        watchers: info.watchers_count,
        date_of_collection: info
            .updated_at
            .map(|d| d.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "No date".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_json(server: &MockServer, route: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    fn detail(number: u64, state: &str, login: &str) -> serde_json::Value {
        serde_json::json!({
            "title": format!("PR {number}"),
            "number": number,
            "body": "Body",
            "state": state,
            "created_at": "2024-01-02T03:04:05Z",
            "closed_at": null,
            "user": { "login": login },
            "author_association": "CONTRIBUTOR",
            "commits": 2,
            "additions": 10,
            "deletions": 4,
            "changed_files": 1
        })
    }

    fn profile(login: &str) -> serde_json::Value {
        serde_json::json!({ "login": login, "public_repos": 5, "followers": 7, "following": 1 })
    }

    #[tokio::test]
    async fn collects_pull_requests_users_and_repository() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/octo/hello",
            200,
            serde_json::json!({
                "name": "hello",
                "owner": { "login": "octo" },
                "description": "Greets",
                "homepage": null,
                "license": null,
                "forks_count": 3,
                "watchers_count": 11,
                "updated_at": "2024-03-01T10:00:00Z"
            }),
        )
        .await;
        mount_json(
            &server,
            "/repos/octo/hello/pulls",
            200,
            serde_json::json!([{ "number": 1 }, { "number": 2 }, { "number": 3 }]),
        )
        .await;
        mount_json(&server, "/repos/octo/hello/pulls/1", 200, detail(1, "open", "bob")).await;
        mount_json(&server, "/repos/octo/hello/pulls/2", 200, detail(2, "closed", "alice")).await;
        mount_json(&server, "/repos/octo/hello/pulls/3", 200, detail(3, "closed", "bob")).await;
        mount_json(&server, "/users/alice", 200, profile("alice")).await;
        mount_json(&server, "/users/bob", 200, profile("bob")).await;

        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let client = GithubClient::new(&server.uri(), None);
        let mut out = Vec::new();

        let report = collect_repository(&client, &store, 1, "octo", "hello", &mut out)
            .await
            .unwrap()
            .expect("repository should be collected");

        assert_eq!(report, CollectionReport { pull_requests: 3, users: 2 });

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#"Usernames extracted: ["alice", "bob"]"#), "{text}");
        assert!(text.contains("Repository data collected and saved successfully."));

        let repos = store.load_repositories().unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].description, "Greets");
        assert_eq!(repos[0].homepage, "No homepage");
        assert_eq!(repos[0].license, "No license");
        assert_eq!(repos[0].date_of_collection, "2024-03-01T10:00:00Z");

        let users = store.load_users().unwrap();
        let bob = users.iter().find(|u| u.username == "bob").unwrap();
        assert_eq!(bob.repository, "octo/hello");
        assert_eq!(bob.contributions, 2);
        assert_eq!(bob.followers, 7);
    }

    #[tokio::test]
    async fn failed_pull_request_detail_is_skipped() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/octo/hello",
            200,
            serde_json::json!({ "name": "hello", "owner": { "login": "octo" } }),
        )
        .await;
        mount_json(
            &server,
            "/repos/octo/hello/pulls",
            200,
            serde_json::json!([{ "number": 1 }, { "number": 2 }]),
        )
        .await;
        mount_json(&server, "/repos/octo/hello/pulls/1", 200, detail(1, "open", "bob")).await;
        mount_json(
            &server,
            "/repos/octo/hello/pulls/2",
            404,
            serde_json::json!({ "message": "Not Found" }),
        )
        .await;
        mount_json(&server, "/users/bob", 200, profile("bob")).await;

        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let client = GithubClient::new(&server.uri(), None);

        let report = collect_repository(&client, &store, 1, "octo", "hello", &mut Vec::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.pull_requests, 1);
        assert_eq!(store.load_pull_requests("octo", "hello").unwrap()[0].number, 1);
    }

    #[tokio::test]
    async fn repository_without_pull_requests_fetches_no_users() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/octo/quiet",
            200,
            serde_json::json!({ "name": "quiet", "owner": { "login": "octo" } }),
        )
        .await;
        mount_json(&server, "/repos/octo/quiet/pulls", 200, serde_json::json!([])).await;

        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let client = GithubClient::new(&server.uri(), None);
        let mut out = Vec::new();

        let report = collect_repository(&client, &store, 1, "octo", "quiet", &mut out)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.users, 0);
        assert!(String::from_utf8(out).unwrap().contains("No user data to fetch."));
        assert!(store.load_users().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recollecting_without_authors_clears_that_repositorys_users() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/octo/quiet",
            200,
            serde_json::json!({ "name": "quiet", "owner": { "login": "octo" } }),
        )
        .await;
        mount_json(&server, "/repos/octo/quiet/pulls", 200, serde_json::json!([])).await;

        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let user = |repository: &str, username: &str| UserRecord {
            repository: repository.to_string(),
            username: username.to_string(),
            repositories: 1,
            followers: 1,
            following: 1,
            contributions: 1,
        };
        store.save_users("octo/quiet", &[user("octo/quiet", "gone")]).unwrap();
        store.save_users("octo/other", &[user("octo/other", "kept")]).unwrap();
        let client = GithubClient::new(&server.uri(), None);

        collect_repository(&client, &store, 1, "octo", "quiet", &mut Vec::new())
            .await
            .unwrap()
            .unwrap();

        let users = store.load_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "kept");
    }

    #[tokio::test]
    async fn files_use_the_canonical_repository_name() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/Octo/Hello",
            200,
            serde_json::json!({ "name": "hello", "owner": { "login": "octo" } }),
        )
        .await;
        mount_json(
            &server,
            "/repos/octo/hello/pulls",
            200,
            serde_json::json!([{ "number": 1 }]),
        )
        .await;
        mount_json(&server, "/repos/octo/hello/pulls/1", 200, detail(1, "open", "bob")).await;
        mount_json(&server, "/users/bob", 200, profile("bob")).await;

        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let client = GithubClient::new(&server.uri(), None);

        collect_repository(&client, &store, 1, "Octo", "Hello", &mut Vec::new())
            .await
            .unwrap()
            .unwrap();

        let listed = &store.load_repositories().unwrap()[0];
        assert_eq!((listed.owner.as_str(), listed.name.as_str()), ("octo", "hello"));
        let prs = store.load_pull_requests(&listed.owner, &listed.name).unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(store.load_users().unwrap()[0].repository, "octo/hello");
    }

    #[tokio::test]
    async fn missing_repository_stops_before_writing() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/octo/missing",
            404,
            serde_json::json!({ "message": "Not Found" }),
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let client = GithubClient::new(&server.uri(), None);
        let mut out = Vec::new();

        let report = collect_repository(&client, &store, 1, "octo", "missing", &mut out)
            .await
            .unwrap();

        assert!(report.is_none());
        assert!(String::from_utf8(out).unwrap().starts_with("Failed to fetch repository data."));
        assert!(!store.repositories_path().exists());
        assert!(!store.pull_requests_path("octo", "missing").exists());
    }
}
