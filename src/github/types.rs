use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `owner/name` identity of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(RepoId::new(owner, name.trim_end_matches(".git")))
            }
            _ => Err(format!(
                "Invalid repository '{}', expected the form 'owner/repo'",
                s
            )),
        }
    }
}

/// A commit as seen through a pull request's commit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// `None` when GitHub could not map the commit to an account.
    pub author_login: Option<String>,
    pub parent_count: usize,
    pub message: String,
}

impl Commit {
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestMeta {
    pub number: u64,
    pub title: String,
    pub creator_login: String,
    pub base_branch: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged_by_login: Option<String>,
    pub labels: Vec<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRef {
    pub reviewer_login: String,
}

// Wire shapes of the REST responses. Only the fields the report needs are
// declared; serde ignores the rest.

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommit {
    pub sha: String,
    pub author: Option<ApiUser>,
    #[serde(default)]
    pub parents: Vec<IgnoredAny>,
    pub commit: ApiCommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommitDetail {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiBranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub number: u64,
    pub title: Option<String>,
    pub user: Option<ApiUser>,
    pub base: ApiBranchRef,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged_by: Option<ApiUser>,
    #[serde(default)]
    pub labels: Vec<ApiLabel>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiReview {
    pub user: Option<ApiUser>,
}

/// Body GitHub sends with most error statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRateLimit {
    pub rate: ApiRate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRate {
    /// Epoch seconds at which the quota resets.
    pub reset: i64,
}

/// Login GitHub shows for deleted accounts.
const GHOST_LOGIN: &str = "ghost";

impl From<ApiCommit> for Commit {
    fn from(commit: ApiCommit) -> Self {
        Commit {
            sha: commit.sha,
            author_login: commit.author.map(|a| a.login),
            parent_count: commit.parents.len(),
            message: commit.commit.message,
        }
    }
}

impl From<ApiPullRequest> for PullRequestMeta {
    fn from(pr: ApiPullRequest) -> Self {
        let mut labels: Vec<String> = Vec::with_capacity(pr.labels.len());
        for label in pr.labels {
            if !labels.contains(&label.name) {
                labels.push(label.name);
            }
        }

        PullRequestMeta {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            creator_login: pr
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| GHOST_LOGIN.to_string()),
            base_branch: pr.base.ref_name,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            merged_by_login: pr.merged_by.map(|u| u.login),
            labels,
            body: pr.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_owner_and_name() {
        let repo: RepoId = "acme/widgets".parse().unwrap();
        assert_eq!(repo, RepoId::new("acme", "widgets"));
        assert_eq!(repo.to_string(), "acme/widgets");
    }

    #[test]
    fn rejects_malformed_repo_ids() {
        assert!("widgets".parse::<RepoId>().is_err());
        assert!("/widgets".parse::<RepoId>().is_err());
        assert!("acme/".parse::<RepoId>().is_err());
        assert!("acme/widgets/extra".parse::<RepoId>().is_err());
    }

    #[test]
    fn converts_wire_commit() {
        let raw = r#"{
            "sha": "abc123",
            "author": { "login": "alice", "id": 1 },
            "parents": [{ "sha": "p1" }, { "sha": "p2" }],
            "commit": { "message": "Merge branch 'master' into feature" }
        }"#;
        let commit: Commit = serde_json::from_str::<ApiCommit>(raw).unwrap().into();

        assert_eq!(commit.author_login.as_deref(), Some("alice"));
        assert_eq!(commit.parent_count, 2);
        assert!(commit.is_merge());
    }

    #[test]
    fn commit_without_mapped_author() {
        let raw = r#"{
            "sha": "abc123",
            "author": null,
            "parents": [{ "sha": "p1" }],
            "commit": { "message": "fix typo" }
        }"#;
        let commit: Commit = serde_json::from_str::<ApiCommit>(raw).unwrap().into();

        assert_eq!(commit.author_login, None);
        assert!(!commit.is_merge());
    }

    #[test]
    fn converts_wire_pull_request() {
        let raw = r#"{
            "number": 45,
            "title": "Add widget cache",
            "user": { "login": "bob" },
            "base": { "ref": "staging", "sha": "def" },
            "created_at": "2024-03-01T10:00:00Z",
            "merged_at": null,
            "merged_by": null,
            "labels": [{ "name": "feature" }, { "name": "feature" }, { "name": "backend" }],
            "body": null
        }"#;
        let pr: PullRequestMeta = serde_json::from_str::<ApiPullRequest>(raw).unwrap().into();

        assert_eq!(pr.number, 45);
        assert_eq!(pr.creator_login, "bob");
        assert_eq!(pr.base_branch, "staging");
        assert_eq!(pr.merged_at, None);
        assert_eq!(pr.labels, vec!["feature".to_string(), "backend".to_string()]);
    }
}
