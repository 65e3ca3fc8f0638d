use crate::elapsed::CalendarSpan;
use crate::store::PullRequestRecord;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySummary {
    pub open: usize,
    pub closed: usize,
    pub users: usize,
    pub oldest: Option<NaiveDate>,
}

pub fn summarize(pull_requests: &[PullRequestRecord]) -> RepositorySummary {
    let users: HashSet<&str> = pull_requests.iter().map(|pr| pr.user.as_str()).collect();

    RepositorySummary {
        open: pull_requests.iter().filter(|pr| pr.is_open()).count(),
        closed: pull_requests.iter().filter(|pr| pr.is_closed()).count(),
        users: users.len(),
        oldest: pull_requests
            .iter()
            .map(|pr| pr.created_at.date_naive())
            .min(),
    }
}

impl RepositorySummary {
    /// One-line report; the age of the oldest PR is measured up to `today`.
    pub fn describe(&self, today: NaiveDate) -> String {
        let oldest = match self.oldest {
            Some(date) => format!(
                "{} ({} ago)",
                date.format("%Y-%m-%d"),
                CalendarSpan::between(date, today.max(date))
            ),
            None => "n/a".to_string(),
        };

        format!(
            "Open PRs: {}, Closed PRs: {}, Users: {}, Oldest PR Date: {oldest}",
            self.open, self.closed, self.users
        )
    }
}
