use anyhow::Result;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

use super::report_builder::{ReleaseReport, ReportRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
    Html,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Joins a list of logins, optionally prefixing each with `@`.
fn list_helper(prefix: &'static str) -> impl handlebars::HelperDef + Send + Sync + 'static {
    move |h: &handlebars::Helper,
          _: &Handlebars,
          _: &handlebars::Context,
          _: &mut handlebars::RenderContext,
          out: &mut dyn handlebars::Output|
          -> handlebars::HelperResult {
        let items: Vec<String> = h
            .param(0)
            .and_then(|v| v.value().as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| format!("{}{}", prefix, s))
                    .collect()
            })
            .unwrap_or_default();

        if items.is_empty() {
            out.write("none")?;
        } else {
            out.write(&items.join(", "))?;
        }
        Ok(())
    }
}

pub struct ReportRenderer {
    template_engine: Handlebars<'static>,
    format: OutputFormat,
}

impl ReportRenderer {
    pub fn new(format: OutputFormat, template_path: Option<PathBuf>) -> Result<Self> {
        let mut template_engine = Handlebars::new();
        template_engine.register_escape_fn(handlebars::no_escape);
        template_engine.register_helper("mentions", Box::new(list_helper("@")));
        template_engine.register_helper("join", Box::new(list_helper("")));

        match template_path {
            Some(path) => {
                let template_content = std::fs::read_to_string(&path)?;
                template_engine.register_template_string("report", &template_content)?;
            }
            None => {
                let default_template = include_str!("../../templates/report.md.hbs");
                template_engine.register_template_string("report", default_template)?;
            }
        }

        Ok(Self {
            template_engine,
            format,
        })
    }

    pub fn render(&self, request: &ReportRequest, report: &ReleaseReport) -> Result<String> {
        match self.format {
            OutputFormat::Markdown => self.render_markdown(request, report),
            OutputFormat::Json => Ok(report.to_pretty_json()?),
            OutputFormat::Html => self.render_html(request, report),
        }
    }

    fn render_markdown(&self, request: &ReportRequest, report: &ReleaseReport) -> Result<String> {
        let pull_requests: Vec<serde_json::Value> = report
            .records()
            .map(|record| {
                json!({
                    "number": record.number,
                    "title": record.title,
                    "creator": record.creator,
                    "base_branch": record.base_branch,
                    "created_at": record.created_at.format("%Y-%m-%d").to_string(),
                    "merged_at": record.merged_at.map(|d| d.format("%Y-%m-%d").to_string()),
                    "labels": record.labels,
                    "description": record.description,
                    "major_contributors": record.major_contributors,
                    "minor_contributors": record.minor_contributors,
                    "reviewer": record.reviewer,
                    "merger": record.merger,
                    "merge_commit_only_contributors": record.merge_commit_only_contributors,
                })
            })
            .collect();

        let data = json!({
            "repository": request.repo.to_string(),
            "release_pr": request.release_pr,
            "total": report.len(),
            "pull_requests": pull_requests,
        });

        Ok(self.template_engine.render("report", &data)?)
    }

    fn render_html(&self, request: &ReportRequest, report: &ReleaseReport) -> Result<String> {
        let markdown = self.render_markdown(request, report)?;
        let parser = pulldown_cmark::Parser::new(&markdown);
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, parser);

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Release PR #{} contributors</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif; max-width: 900px; margin: 0 auto; padding: 20px; }}
        h1, h2 {{ border-bottom: 1px solid #e1e4e8; padding-bottom: 0.3em; }}
        code {{ background: #f6f8fa; padding: 2px 4px; border-radius: 3px; }}
    </style>
</head>
<body>
    {}
</body>
</html>"#,
            request.release_pr, html
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::report_builder::AttributionRecord;
    use crate::github::RepoId;
    use chrono::{TimeZone, Utc};

    fn request() -> ReportRequest {
        ReportRequest {
            repo: RepoId::new("acme", "widgets"),
            release_pr: 100,
            base_branch: None,
        }
    }

    fn report() -> ReleaseReport {
        let record = AttributionRecord {
            number: 12,
            title: "Cache widgets & gadgets".to_string(),
            creator: "alice".to_string(),
            base_branch: "staging".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            merged_at: Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap()),
            labels: vec!["feature".to_string(), "backend".to_string()],
            description: "Adds a widget cache.".to_string(),
            body: None,
            major_contributors: vec!["alice".to_string(), "bob".to_string()],
            minor_contributors: vec![],
            reviewer: Some("frank".to_string()),
            merger: Some("carol".to_string()),
            merge_commit_only_contributors: vec!["dave".to_string()],
        };
        let mut report = ReleaseReport::default();
        report.insert(record);
        report
    }

    #[test]
    fn parses_output_formats() {
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("html".parse::<OutputFormat>(), Ok(OutputFormat::Html));
        assert!("slack".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn markdown_lists_contributors() {
        let renderer = ReportRenderer::new(OutputFormat::Markdown, None).unwrap();
        let output = renderer.render(&request(), &report()).unwrap();

        assert!(output.contains("# Release PR #100 contributors"));
        assert!(output.contains("## #12 Cache widgets & gadgets"));
        assert!(output.contains("**Major contributors:** @alice, @bob"));
        assert!(output.contains("**Minor contributors:** none"));
        assert!(output.contains("**Merge commits only:** @dave"));
        assert!(output.contains("**Merged:** 2024-03-02 by @carol"));
        assert!(output.contains("**Reviewer:** @frank"));
        assert!(output.contains("**Labels:** feature, backend"));
        assert!(output.contains("Adds a widget cache."));
    }

    #[test]
    fn json_matches_report_serialization() {
        let renderer = ReportRenderer::new(OutputFormat::Json, None).unwrap();
        let output = renderer.render(&request(), &report()).unwrap();

        assert_eq!(output, report().to_pretty_json().unwrap());
    }

    #[test]
    fn html_wraps_rendered_markdown() {
        let renderer = ReportRenderer::new(OutputFormat::Html, None).unwrap();
        let output = renderer.render(&request(), &report()).unwrap();

        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("<title>Release PR #100 contributors</title>"));
        assert!(output.contains("<h2>#12 Cache widgets &amp; gadgets</h2>"));
    }
}
