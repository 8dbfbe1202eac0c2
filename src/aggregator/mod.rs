pub mod commit_fetcher;
pub mod contributor_classifier;
pub mod reference_extractor;
pub mod report_builder;
pub mod report_renderer;
pub mod retry;

pub use report_builder::{ReleaseReportBuilder, ReportRequest};
pub use report_renderer::{OutputFormat, ReportRenderer};
pub use retry::RetryPolicy;
