use chrono::{DateTime, Utc};
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use super::commit_fetcher::PaginatedCommitFetcher;
use super::contributor_classifier::{ContributorClassification, ContributorClassifier};
use super::reference_extractor::{extract_pr_numbers, ReferenceError};
use super::retry::RetryPolicy;
use crate::github::{PullRequestMeta, PullRequestSource, RemoteError, RepoId, ReviewRef};

pub const NO_DESCRIPTION: &str = "No description provided";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("release pull request #{0} was not found")]
    ReleasePrNotFound(u64),

    #[error("failed to fetch {what} of pull request #{number}")]
    Remote {
        number: u64,
        what: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Everything one report run needs to know, resolved up front.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub repo: RepoId,
    pub release_pr: u64,
    /// Sub-PRs whose base branch differs are left out.
    pub base_branch: Option<String>,
}

/// Attribution for one sub-PR. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttributionRecord {
    pub number: u64,
    pub title: String,
    pub creator: String,
    pub base_branch: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub description: String,
    pub body: Option<String>,
    pub major_contributors: Vec<String>,
    pub minor_contributors: Vec<String>,
    pub reviewer: Option<String>,
    pub merger: Option<String>,
    pub merge_commit_only_contributors: Vec<String>,
}

impl AttributionRecord {
    fn assemble(
        pr: PullRequestMeta,
        classification: ContributorClassification,
        reviews: &[ReviewRef],
    ) -> Self {
        AttributionRecord {
            number: pr.number,
            description: extract_description(pr.body.as_deref()),
            title: pr.title,
            creator: pr.creator_login,
            base_branch: pr.base_branch,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            labels: pr.labels,
            body: pr.body,
            major_contributors: classification.major_contributors,
            minor_contributors: classification.minor_contributors,
            reviewer: first_reviewer(reviews),
            merger: pr.merged_by_login,
            merge_commit_only_contributors: classification.merge_commit_only_contributors,
        }
    }
}

/// Sub-PR number to attribution, in the order the sub-PRs were first referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    entries: Vec<(u64, AttributionRecord)>,
}

impl ReleaseReport {
    pub(crate) fn insert(&mut self, record: AttributionRecord) {
        let number = record.number;
        match self.entries.iter_mut().find(|(n, _)| *n == number) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((number, record)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, number: u64) -> Option<&AttributionRecord> {
        self.entries
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, record)| record)
    }

    pub fn numbers(&self) -> Vec<u64> {
        self.entries.iter().map(|(n, _)| *n).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &AttributionRecord> {
        self.entries.iter().map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for ReleaseReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (number, record) in &self.entries {
            map.serialize_entry(&number.to_string(), record)?;
        }
        map.end()
    }
}

fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?ims)^[ \t]*(?:#{1,6}[ \t]*|\*\*)?description(?:\*\*)?[ \t]*(?::(?:\*\*)?|\r?$)(.*?)^[ \t]*(?:#{1,6}[ \t]*|\*\*)?task[ \t]+links?\b",
        )
        .expect("valid description pattern")
    })
}

/// Text of the `Description` section (up to the `Task Link` marker), else
/// the whole body, else [`NO_DESCRIPTION`]. Markers may be headings, bold
/// text or plain `Description:` lines.
pub fn extract_description(body: Option<&str>) -> String {
    let Some(body) = body else {
        return NO_DESCRIPTION.to_string();
    };

    if let Some(section) = description_pattern()
        .captures(body)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| !text.is_empty())
    {
        return section.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        trimmed.to_string()
    }
}

/// First distinct reviewer in review order.
fn first_reviewer(reviews: &[ReviewRef]) -> Option<String> {
    reviews.first().map(|review| review.reviewer_login.clone())
}

pub struct ReleaseReportBuilder<S> {
    source: S,
    retry: RetryPolicy,
}

impl<S: PullRequestSource> ReleaseReportBuilder<S> {
    pub fn new(source: S, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Sub-PR numbers referenced by the release PR's commit messages.
    pub async fn referenced_pull_requests(
        &self,
        repo: &RepoId,
        release_pr: u64,
    ) -> Result<Vec<u64>, ReportError> {
        let commits = PaginatedCommitFetcher::new(&self.source, &self.retry)
            .fetch_all_commits(repo, release_pr)
            .await
            .map_err(|e| match e {
                RemoteError::NotFound(_) => ReportError::ReleasePrNotFound(release_pr),
                source => ReportError::Remote {
                    number: release_pr,
                    what: "commits",
                    source,
                },
            })?;
        info!(
            "Release PR #{} has {} commits",
            release_pr,
            commits.len()
        );

        Ok(extract_pr_numbers(commits.iter().map(|c| c.message.as_str()))?)
    }

    pub async fn build(&self, request: &ReportRequest) -> Result<ReleaseReport, ReportError> {
        let sub_prs = self
            .referenced_pull_requests(&request.repo, request.release_pr)
            .await?;
        info!(
            "Release PR #{} references {} pull requests",
            request.release_pr,
            sub_prs.len()
        );

        let mut report = ReleaseReport::default();
        for number in sub_prs {
            if let Some(record) = self.attribute(request, number).await? {
                report.insert(record);
            }
        }

        info!("Attributed {} pull requests", report.len());
        Ok(report)
    }

    /// `Ok(None)` when the sub-PR is gone or outside the base-branch filter.
    async fn attribute(
        &self,
        request: &ReportRequest,
        number: u64,
    ) -> Result<Option<AttributionRecord>, ReportError> {
        let repo = &request.repo;
        let source = &self.source;

        let pr = match self
            .retry
            .execute(&format!("pull request #{}", number), move || {
                source.pull_request(repo, number)
            })
            .await
        {
            Ok(pr) => pr,
            Err(e) if e.is_not_found() => {
                info!("Pull request #{} not found, skipping", number);
                return Ok(None);
            }
            Err(source) => {
                return Err(ReportError::Remote {
                    number,
                    what: "details",
                    source,
                })
            }
        };

        if let Some(base) = &request.base_branch {
            if &pr.base_branch != base {
                info!(
                    "Pull request #{} targets '{}' instead of '{}', skipping",
                    number, pr.base_branch, base
                );
                return Ok(None);
            }
        }

        let commits = match PaginatedCommitFetcher::new(source, &self.retry)
            .fetch_all_commits(repo, number)
            .await
        {
            Ok(commits) => commits,
            Err(e) if e.is_not_found() => {
                info!("Commits of pull request #{} not found, skipping", number);
                return Ok(None);
            }
            Err(source) => {
                return Err(ReportError::Remote {
                    number,
                    what: "commits",
                    source,
                })
            }
        };

        let reviews = match self
            .retry
            .execute(&format!("reviews of #{}", number), move || {
                source.pull_request_reviews(repo, number)
            })
            .await
        {
            Ok(reviews) => reviews,
            Err(e) if e.is_not_found() => {
                info!("Reviews of pull request #{} not found, skipping", number);
                return Ok(None);
            }
            Err(source) => {
                return Err(ReportError::Remote {
                    number,
                    what: "reviews",
                    source,
                })
            }
        };

        let classification = ContributorClassifier::classify(&commits);
        Ok(Some(AttributionRecord::assemble(pr, classification, &reviews)))
    }
}
