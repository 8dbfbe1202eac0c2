use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};

mod aggregator;
mod config;
mod github;

use aggregator::{OutputFormat, ReleaseReportBuilder, ReportRenderer, ReportRequest, RetryPolicy};
use config::{Config, DEFAULT_CONFIG_FILE};
use github::{GitHubClient, RepoId};

#[derive(Parser)]
#[command(name = "release-attribution")]
#[command(about = "Report who contributed to the pull requests shipped in a release PR")]
struct Cli {
    /// GitHub token (can also be set via GITHUB_TOKEN env var)
    #[arg(long, env = "GITHUB_TOKEN")]
    token: String,

    /// Repository as owner/repo (overrides the config file)
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// Path to the TOML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the contributor report for a release PR
    Report {
        /// Release pull request number
        #[arg(short, long)]
        pr: u64,

        /// Only include sub-PRs targeting this base branch
        #[arg(short, long)]
        base: Option<String>,

        /// JSON file the report is written to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Format printed after the report is built
        #[arg(short = 'f', long)]
        format: Option<OutputFormat>,

        /// Custom handlebars template for markdown/html output
        #[arg(long)]
        template: Option<PathBuf>,

        /// Write the rendered report here instead of stdout
        #[arg(long)]
        render_to: Option<PathBuf>,
    },

    /// List the pull requests referenced by a release PR's commits
    Refs {
        #[arg(short, long)]
        pr: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let repo: RepoId = cli
        .repo
        .clone()
        .or_else(|| config.github.repository.clone())
        .context("No repository given, pass --repo or set [github] repository in the config")?
        .parse()
        .map_err(anyhow::Error::msg)?;

    let github_client = GitHubClient::new(cli.token.clone(), config.github.api_url.as_deref())
        .await
        .context("Failed to create GitHub client")?;
    let retry = RetryPolicy::from(&config.retry);
    info!(
        "Fetching from {} with up to {} attempts per request",
        repo,
        retry.max_attempts()
    );
    let builder = ReleaseReportBuilder::new(github_client, retry);

    match cli.command {
        Commands::Report {
            pr,
            base,
            output,
            format,
            template,
            render_to,
        } => {
            let request = ReportRequest {
                repo,
                release_pr: pr,
                base_branch: base.or(config.report.base_branch.clone()),
            };

            let report = builder
                .build(&request)
                .await
                .with_context(|| format!("Failed to build report for release PR #{}", pr))?;

            if report.is_empty() {
                warn!("No pull requests were attributed for release PR #{}", pr);
            } else {
                debug!("Attributed pull requests: {:?}", report.numbers());
            }

            let output = output.unwrap_or_else(|| PathBuf::from(&config.report.output));
            std::fs::write(&output, report.to_pretty_json()?)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Report for {} pull requests written to {}", report.len(), output.display());

            let format = match format {
                Some(format) => format,
                None => config
                    .report
                    .format
                    .parse::<OutputFormat>()
                    .map_err(anyhow::Error::msg)?,
            };
            let renderer = ReportRenderer::new(format, template)?;
            let content = renderer.render(&request, &report)?;

            if let Some(path) = render_to {
                std::fs::write(&path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Rendered report written to {}", path.display());
            } else {
                println!("{}", content);
            }
        }
        Commands::Refs { pr } => {
            let numbers = builder.referenced_pull_requests(&repo, pr).await?;

            if numbers.is_empty() {
                println!("No pull requests referenced by #{}", pr);
            } else {
                println!("Pull requests referenced by #{}:", pr);
                for number in numbers {
                    println!("  - #{}", number);
                }
            }
        }
    }

    Ok(())
}
