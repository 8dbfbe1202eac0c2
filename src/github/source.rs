use async_trait::async_trait;

use super::error::RemoteError;
use super::types::{Commit, PullRequestMeta, RepoId, ReviewRef};

/// Read access to pull requests on a code host.
///
/// Each call is a single remote request; retrying and pagination are the
/// caller's business.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// One page (1-based) of a pull request's commits, oldest first.
    async fn pull_request_commits(
        &self,
        repo: &RepoId,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<Commit>, RemoteError>;

    async fn pull_request(&self, repo: &RepoId, number: u64)
        -> Result<PullRequestMeta, RemoteError>;

    async fn pull_request_reviews(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<ReviewRef>, RemoteError>;
}
