use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{classify_status, describe_error, is_transport_failure, RemoteError, StatusClass};
use super::source::PullRequestSource;
use super::types::{
    ApiCommit, ApiErrorBody, ApiPullRequest, ApiRateLimit, ApiReview, Commit, PullRequestMeta,
    RepoId, ReviewRef,
};

/// Wait assumed when GitHub signals a rate limit but the reset time cannot be read.
const RATE_LIMIT_FALLBACK_SECS: i64 = 60;

const REVIEWS_PER_PAGE: u8 = 100;

/// Longest slice of a non-JSON error body kept in an error message.
const ERROR_BODY_EXCERPT: usize = 200;

pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    pub async fn new(token: String, base_uri: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        // Retries belong to RetryPolicy, which counts every attempt.
        builder.add_retry_config(RetryConfig::None);
        let mut builder = builder.personal_token(token);
        if let Some(uri) = base_uri {
            builder = builder.base_uri(uri)?;
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Issues a GET and classifies the status before looking at the body, so
    /// a 5xx with an HTML or empty body is still a transient failure.
    async fn fetch<T: DeserializeOwned>(&self, route: String) -> Result<T, RemoteError> {
        debug!(route = %route, "GET");
        let response = self
            .client
            ._get(route.as_str())
            .await
            .map_err(|e| transport_error(&route, &e))?;

        let status = response.status();
        let (reset_header, remaining) = {
            let header = |name: &str| -> Option<i64> {
                response.headers().get(name)?.to_str().ok()?.trim().parse().ok()
            };
            (header("x-ratelimit-reset"), header("x-ratelimit-remaining"))
        };

        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|e| transport_error(&route, &e))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                RemoteError::Fatal(format!("unexpected response body from {}: {}", route, e))
            });
        }

        let code = status.as_u16();
        let message = error_message(&body);
        let class = if code == 403 && remaining == Some(0) {
            StatusClass::RateLimited
        } else {
            classify_status(code, &message)
        };

        Err(match class {
            StatusClass::NotFound => RemoteError::NotFound(route),
            StatusClass::RateLimited => RemoteError::RateLimited {
                reset_at: match reset_header.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
                    Some(reset_at) => reset_at,
                    None => self.rate_limit_reset().await,
                },
            },
            StatusClass::Transient => {
                RemoteError::Transient(format!("HTTP {} on {}: {}", code, route, message))
            }
            StatusClass::Fatal => {
                RemoteError::Fatal(format!("HTTP {} on {}: {}", code, route, message))
            }
        })
    }

    async fn rate_limit_reset(&self) -> DateTime<Utc> {
        let fallback = Utc::now() + Duration::seconds(RATE_LIMIT_FALLBACK_SECS);

        match self.fetch_rate_limit().await {
            Ok(limit) => Utc
                .timestamp_opt(limit.rate.reset, 0)
                .single()
                .unwrap_or(fallback),
            Err(e) => {
                warn!("Could not read rate limit reset time: {}", e);
                fallback
            }
        }
    }

    // Not routed through `fetch`: a rate-limited answer here would recurse.
    async fn fetch_rate_limit(&self) -> Result<ApiRateLimit, RemoteError> {
        let route = "/rate_limit";
        let response = self
            .client
            ._get(route)
            .await
            .map_err(|e| transport_error(route, &e))?;
        let status = response.status();
        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|e| transport_error(route, &e))?;

        if !status.is_success() {
            return Err(RemoteError::Fatal(format!(
                "HTTP {} on {}: {}",
                status.as_u16(),
                route,
                error_message(&body)
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Fatal(format!("unexpected response body from {}: {}", route, e)))
    }
}

fn transport_error(route: &str, err: &octocrab::Error) -> RemoteError {
    let message = format!("{} on {}", describe_error(err), route);
    if is_transport_failure(err) {
        RemoteError::Transient(message)
    } else {
        RemoteError::Fatal(message)
    }
}

/// GitHub's `message` field when the body is its JSON error shape, otherwise
/// the start of the raw body.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(ERROR_BODY_EXCERPT).collect()
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn pull_request_commits(
        &self,
        repo: &RepoId,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<Commit>, RemoteError> {
        let route = format!("/repos/{}/{}/pulls/{}/commits", repo.owner, repo.name, number);
        let commits: Vec<ApiCommit> = self
            .fetch(format!("{}?page={}&per_page={}", route, page, per_page))
            .await?;

        Ok(commits.into_iter().map(Commit::from).collect())
    }

    async fn pull_request(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<PullRequestMeta, RemoteError> {
        let route = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number);
        let pr: ApiPullRequest = self.fetch(route).await?;

        Ok(pr.into())
    }

    async fn pull_request_reviews(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<ReviewRef>, RemoteError> {
        let route = format!("/repos/{}/{}/pulls/{}/reviews", repo.owner, repo.name, number);
        let reviews: Vec<ApiReview> = self
            .fetch(format!("{}?page=1&per_page={}", route, REVIEWS_PER_PAGE))
            .await?;

        Ok(reviews
            .into_iter()
            .filter_map(|review| review.user)
            .map(|user| ReviewRef {
                reviewer_login: user.login,
            })
            .collect())
    }
}
