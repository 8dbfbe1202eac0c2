pub mod client;
pub mod error;
pub mod source;
pub mod types;

pub use client::GitHubClient;
pub use error::RemoteError;
pub use source::PullRequestSource;
pub use types::{Commit, PullRequestMeta, RepoId, ReviewRef};
