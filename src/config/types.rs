use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub retry: RetryConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// `owner/repo`
    pub repository: Option<String>,
    /// API root for GitHub Enterprise installations.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    pub rate_limit_padding_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Only sub-PRs targeting this branch are reported.
    pub base_branch: Option<String>,
    pub output: String,
    pub format: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 5,
            delay_secs: 2,
            rate_limit_padding_secs: 1,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            base_branch: None,
            output: "contributors.json".to_string(),
            format: "json".to_string(),
        }
    }
}
