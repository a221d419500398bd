//! Visual test orchestration
//!
//! Probes each configured critical route in order, runs the responsive
//! sampling pass, and aggregates the accumulated results into the run's
//! `VisualReport` artifact.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::baseline::BaselineStore;
use crate::browser::{Browser, BrowserConfig};
use crate::config::RunConfig;
use crate::error::VisualResult;
use crate::probe::{self, PageResult, PageStatus};
use crate::responsive;

pub const VISUAL_REPORT_FILE: &str = "VIGIL_VISUAL_REPORT.json";

/// Aggregate over all page results for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualReport {
    pub timestamp: DateTime<Utc>,
    pub total_pages: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<PageResult>,
}

impl VisualReport {
    /// Pure aggregation over an accumulated result list.
    pub fn from_results(results: Vec<PageResult>) -> Self {
        let passed = results
            .iter()
            .filter(|r| r.status == PageStatus::Passed)
            .count();
        let failed = results.len() - passed;

        Self {
            timestamp: Utc::now(),
            total_pages: results.len(),
            passed,
            failed,
            results,
        }
    }
}

pub struct VisualRunner {
    config: RunConfig,
    project_path: PathBuf,
    store: BaselineStore,
    browser: Browser,
}

impl VisualRunner {
    /// Prepare a run: verify Playwright, open the screenshot store.
    pub fn new(project_path: &Path, config: RunConfig) -> VisualResult<Self> {
        Browser::check_playwright_installed()?;

        let store = BaselineStore::new(project_path)?;
        let browser = Browser::new(BrowserConfig::from_run_config(&config));

        Ok(Self {
            config,
            project_path: project_path.to_path_buf(),
            store,
            browser,
        })
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Probe every critical route, sample responsive viewports, and persist
    /// the report artifact.
    ///
    /// Per-route failures land in their `PageResult`; only setup errors (the
    /// artifact write) propagate.
    pub async fn run(&self, base_url: &str) -> VisualResult<VisualReport> {
        info!("Visual testing {} route(s) at {}", self.config.routes.len(), base_url);

        // Diff images reflect this run only
        self.store.clean_diffs()?;

        let mut results = Vec::with_capacity(self.config.routes.len());
        for route in &self.config.routes {
            let result = probe::probe_page(
                &self.browser,
                &self.store,
                base_url,
                route,
                self.config.diff_threshold,
            )
            .await;
            results.push(result);
        }

        responsive::sample(&self.browser, &self.store, base_url, &self.config.viewports).await;

        let report = VisualReport::from_results(results);
        self.write_report(&report)?;

        info!(
            "Visual testing done: {}/{} passed",
            report.passed, report.total_pages
        );
        Ok(report)
    }

    fn write_report(&self, report: &VisualReport) -> VisualResult<PathBuf> {
        let path = self.project_path.join(VISUAL_REPORT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::PageResult;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn page(route: &str, status: PageStatus) -> PageResult {
        PageResult {
            page: route.to_string(),
            status,
            timestamp: Utc::now(),
            url: None,
            screenshot: None,
            checks: BTreeMap::new(),
            broken_images: Vec::new(),
            console_errors: Vec::new(),
            layout_issues: Vec::new(),
            visual_diff: None,
            baseline_created: false,
            error: None,
        }
    }

    #[test]
    fn aggregation_counts_statuses() {
        let report = VisualReport::from_results(vec![
            page("/", PageStatus::Passed),
            page("/missing", PageStatus::Failed),
            page("/login", PageStatus::Passed),
        ]);

        assert_eq!(report.total_pages, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn empty_run_aggregates_to_zero() {
        let report = VisualReport::from_results(Vec::new());
        assert_eq!(report.total_pages, 0);
        assert_eq!(report.passed, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = VisualReport::from_results(vec![page("/", PageStatus::Passed)]);
        let json = serde_json::to_string(&report).unwrap();
        let back: VisualReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_pages, 1);
        assert_eq!(back.results[0].page, "/");
    }
}
