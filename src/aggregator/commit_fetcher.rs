use tracing::debug;

use super::retry::RetryPolicy;
use crate::github::{Commit, PullRequestSource, RemoteError, RepoId};

pub const COMMITS_PER_PAGE: u8 = 100;

/// Walks every page of a pull request's commit list.
pub struct PaginatedCommitFetcher<'a, S> {
    source: &'a S,
    retry: &'a RetryPolicy,
}

impl<'a, S: PullRequestSource> PaginatedCommitFetcher<'a, S> {
    pub fn new(source: &'a S, retry: &'a RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// All commits of `number`, in the order the pages list them.
    ///
    /// Pages are requested one at a time. An empty page or one shorter than
    /// [`COMMITS_PER_PAGE`] ends the walk.
    pub async fn fetch_all_commits(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<Commit>, RemoteError> {
        let mut commits = Vec::new();
        let mut page: u32 = 1;

        loop {
            let source = self.source;
            let label = format!("commits of #{} (page {})", number, page);
            let batch = self
                .retry
                .execute(&label, move || {
                    source.pull_request_commits(repo, number, page, COMMITS_PER_PAGE)
                })
                .await?;

            let received = batch.len();
            debug!("Fetched {} commits for #{} on page {}", received, number, page);
            commits.extend(batch);

            if received < COMMITS_PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        Ok(commits)
    }
}
