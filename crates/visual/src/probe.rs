//! Per-route page probing
//!
//! One probe visits one route, captures its screenshot, and folds the
//! browser's health signals plus the baseline comparison into a `PageResult`.
//! Failures are captured into the result record; nothing here raises past the
//! probe boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::baseline::{BaselineOutcome, BaselineStore};
use crate::browser::{Browser, ElementCheck, ProbeOutput};
use crate::diff;

pub const HORIZONTAL_OVERFLOW_ISSUE: &str = "horizontal_scrollbar_detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Passed,
    Failed,
}

/// Record of one route-visit attempt.
///
/// `status` is `Failed` only for navigation errors and HTTP >= 400. Diff
/// scores, console errors, broken images, and layout issues are advisory and
/// never fail a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub page: String,
    pub status: PageStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, ElementCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broken_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layout_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_diff: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub baseline_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    fn failure(route: &str, url: Option<String>, error: String) -> Self {
        Self {
            page: route.to_string(),
            status: PageStatus::Failed,
            timestamp: Utc::now(),
            url,
            screenshot: None,
            checks: BTreeMap::new(),
            broken_images: Vec::new(),
            console_errors: Vec::new(),
            layout_issues: Vec::new(),
            visual_diff: None,
            baseline_created: false,
            error: Some(error),
        }
    }
}

/// Map a route to its screenshot identifier: separators stripped at the
/// edges, internal ones flattened, the root path becoming `home`.
pub fn page_id(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        "home".to_string()
    } else {
        trimmed.replace('/', "_")
    }
}

/// Probe one route and build its result record.
pub async fn probe_page(
    browser: &Browser,
    store: &BaselineStore,
    base_url: &str,
    route: &str,
    diff_threshold: f64,
) -> PageResult {
    let url = format!("{base_url}{route}");
    let id = page_id(route);
    let screenshot_path = store.current_path(&id);

    info!("Probing {}", route);

    let output = match browser.probe(&url, &screenshot_path).await {
        Ok(output) => output,
        Err(e) => {
            warn!("Navigation failed for '{}': {}", route, e);
            return PageResult::failure(route, Some(url), e.to_string());
        }
    };

    assemble_result(store, route, &url, &id, output, diff_threshold)
}

/// Fold a probe's raw output plus the baseline comparison into a result.
fn assemble_result(
    store: &BaselineStore,
    route: &str,
    url: &str,
    id: &str,
    output: ProbeOutput,
    diff_threshold: f64,
) -> PageResult {
    if output.status >= 400 {
        warn!("HTTP {} for '{}'", output.status, route);
        return PageResult::failure(route, Some(url.to_string()), format!("HTTP {}", output.status));
    }

    let mut layout_issues = Vec::new();
    if output.horizontal_overflow {
        layout_issues.push(HORIZONTAL_OVERFLOW_ISSUE.to_string());
    }

    let screenshot_path = store.current_path(id);
    let mut visual_diff = None;
    let mut baseline_created = false;

    match store.get_or_create(id, &screenshot_path) {
        Ok(BaselineOutcome::Existing(baseline)) => {
            match diff::diff_files(&baseline, &screenshot_path, &store.diff_path(id)) {
                Ok(score) => {
                    if score > diff_threshold {
                        warn!("Visual difference on '{}': {:.1}%", route, score * 100.0);
                    } else {
                        info!("Visual match on '{}' (diff: {:.1}%)", route, score * 100.0);
                    }
                    visual_diff = Some(score);
                }
                Err(e) => {
                    // Comparison tooling failure reads as "no evidence of
                    // difference"; see DESIGN.md for the open question.
                    warn!("Screenshot comparison failed for '{}': {}", id, e);
                    visual_diff = Some(0.0);
                }
            }
        }
        Ok(BaselineOutcome::Created) => {
            baseline_created = true;
        }
        Err(e) => {
            warn!("Baseline store error for '{}': {}", id, e);
        }
    }

    if !output.broken_images.is_empty() {
        warn!("{} broken image(s) on '{}'", output.broken_images.len(), route);
    }
    if !output.console_errors.is_empty() {
        warn!("{} console error(s) on '{}'", output.console_errors.len(), route);
    }

    PageResult {
        page: route.to_string(),
        status: PageStatus::Passed,
        timestamp: Utc::now(),
        url: Some(url.to_string()),
        screenshot: Some(screenshot_path.to_string_lossy().to_string()),
        checks: output.checks,
        broken_images: output.broken_images,
        console_errors: output.console_errors,
        layout_issues,
        visual_diff,
        baseline_created,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn store() -> (tempfile::TempDir, BaselineStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn capture(store: &BaselineStore, id: &str, rgb: [u8; 3]) {
        image::RgbImage::from_pixel(4, 4, image::Rgb(rgb))
            .save(store.current_path(id))
            .unwrap();
    }

    #[test_case("/", "home"; "slash_route")]
    #[test_case("", "home"; "empty_route")]
    #[test_case("/login", "login")]
    #[test_case("/dashboard/", "dashboard")]
    #[test_case("/account/settings", "account_settings")]
    fn page_ids_are_sanitized(route: &str, expected: &str) {
        assert_eq!(page_id(route), expected);
    }

    #[test]
    fn http_error_status_fails_the_page() {
        let (_dir, store) = store();
        let output = ProbeOutput { status: 500, ..Default::default() };

        let result = assemble_result(&store, "/login", "http://x/login", "login", output, 0.05);
        assert_eq!(result.status, PageStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
        assert!(result.checks.is_empty());
    }

    #[test]
    fn warnings_do_not_fail_a_page() {
        let (_dir, store) = store();
        capture(&store, "home", [1, 1, 1]);
        let output = ProbeOutput {
            status: 200,
            broken_images: vec!["/logo.png".to_string()],
            console_errors: vec!["TypeError".to_string()],
            horizontal_overflow: true,
            ..Default::default()
        };

        let result = assemble_result(&store, "/", "http://x/", "home", output, 0.05);
        assert_eq!(result.status, PageStatus::Passed);
        assert_eq!(result.layout_issues, vec![HORIZONTAL_OVERFLOW_ISSUE]);
        assert_eq!(result.broken_images, vec!["/logo.png"]);
        assert!(result.baseline_created);
        assert!(result.visual_diff.is_none());
    }

    #[test]
    fn second_run_populates_diff_score() {
        let (_dir, store) = store();

        capture(&store, "home", [10, 10, 10]);
        let first = assemble_result(
            &store,
            "/",
            "http://x/",
            "home",
            ProbeOutput { status: 200, ..Default::default() },
            0.05,
        );
        assert!(first.baseline_created);

        capture(&store, "home", [10, 10, 10]);
        let second = assemble_result(
            &store,
            "/",
            "http://x/",
            "home",
            ProbeOutput { status: 200, ..Default::default() },
            0.05,
        );
        assert!(!second.baseline_created);
        assert_eq!(second.visual_diff, Some(0.0));
    }

    #[test]
    fn comparison_failure_degrades_to_zero_score() {
        let (_dir, store) = store();

        capture(&store, "home", [10, 10, 10]);
        assemble_result(
            &store,
            "/",
            "http://x/",
            "home",
            ProbeOutput { status: 200, ..Default::default() },
            0.05,
        );

        // Second capture is an undecodable file
        std::fs::write(store.current_path("home"), b"not a png").unwrap();
        let result = assemble_result(
            &store,
            "/",
            "http://x/",
            "home",
            ProbeOutput { status: 200, ..Default::default() },
            0.05,
        );
        assert_eq!(result.status, PageStatus::Passed);
        assert_eq!(result.visual_diff, Some(0.0));
    }

    #[test]
    fn missing_route_scenario() {
        let (_dir, store) = store();

        capture(&store, "home", [1, 1, 1]);
        let home = assemble_result(
            &store,
            "/",
            "http://x/",
            "home",
            ProbeOutput { status: 200, ..Default::default() },
            0.05,
        );
        let missing = assemble_result(
            &store,
            "/missing",
            "http://x/missing",
            "missing",
            ProbeOutput { status: 404, ..Default::default() },
            0.05,
        );

        assert!(home.baseline_created);
        assert!(store.baseline_path("home").exists());

        let report = crate::runner::VisualReport::from_results(vec![home, missing]);
        assert_eq!(report.total_pages, 2);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);

        let verdict = crate::report::verdict(&report, None);
        assert_eq!(crate::report::exit_code(verdict), 1);
    }

    #[test]
    fn serialized_result_omits_empty_fields() {
        let result = PageResult::failure("/missing", None, "HTTP 404".to_string());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "HTTP 404");
        assert!(json.get("checks").is_none());
        assert!(json.get("visual_diff").is_none());
        assert!(json.get("baseline_created").is_none());
    }
}
