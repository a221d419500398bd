//! Combined report composition
//!
//! Merges the automated visual report and the optional critique report into
//! one markdown document and one verdict. The verdict is derived, never
//! stored: automated failures dominate, then critical critique issues.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::critique::{CritiqueOutcome, CritiqueReport};
use crate::error::VisualResult;
use crate::probe::PageStatus;
use crate::runner::VisualReport;

pub const HYBRID_REPORT_FILE: &str = "VIGIL_HYBRID_VISUAL_REPORT.md";

/// Advisory diff threshold used for report emphasis only.
const ADVISORY_DIFF_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Passed,
    Failed,
    NeedsAttention,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed => "FAILED",
            Verdict::NeedsAttention => "NEEDS ATTENTION",
        }
    }
}

/// Combined verdict: FAILED on any automated failure, NEEDS_ATTENTION when
/// automation is clean but the critique found critical issues.
pub fn verdict(visual: &VisualReport, critique: Option<&CritiqueReport>) -> Verdict {
    if visual.failed > 0 {
        return Verdict::Failed;
    }
    match critique {
        Some(report) if report.summary.critical_issues > 0 => Verdict::NeedsAttention,
        _ => Verdict::Passed,
    }
}

pub fn exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Passed => 0,
        Verdict::Failed | Verdict::NeedsAttention => 1,
    }
}

/// Render the merged human-readable document.
pub fn compose(visual: &VisualReport, critique: Option<&CritiqueReport>) -> String {
    let mut doc = String::new();

    doc.push_str("# VIGIL HYBRID VISUAL TESTING REPORT\n\n");
    doc.push_str(&format!(
        "**Date:** {}\n\n---\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    ));

    doc.push_str("## Automated Visual Testing\n\n");
    doc.push_str(&format!("- **Total Pages:** {}\n", visual.total_pages));
    doc.push_str(&format!("- **Passed:** {}\n", visual.passed));
    doc.push_str(&format!("- **Failed:** {}\n\n", visual.failed));

    if visual.failed > 0 {
        doc.push_str("### Failed Pages\n\n");
        for result in &visual.results {
            if result.status == PageStatus::Failed {
                doc.push_str(&format!(
                    "- **{}**: {}\n",
                    result.page,
                    result.error.as_deref().unwrap_or("Unknown error")
                ));
            }
        }
        doc.push('\n');
    }

    doc.push_str("### Visual Regression Results\n\n");
    for result in &visual.results {
        if let Some(diff) = result.visual_diff {
            let marker = if diff < ADVISORY_DIFF_THRESHOLD { "OK" } else { "DRIFT" };
            doc.push_str(&format!(
                "- **{}**: [{}] {:.1}% difference\n",
                result.page,
                marker,
                diff * 100.0
            ));
        } else if result.baseline_created {
            doc.push_str(&format!("- **{}**: baseline created\n", result.page));
        }
    }
    doc.push('\n');

    if let Some(critique) = critique {
        compose_critique(&mut doc, critique);
    }

    let verdict = verdict(visual, critique);
    doc.push_str("## Overall Verdict\n\n");
    doc.push_str(&format!("### {}\n\n", verdict.as_str()));
    match verdict {
        Verdict::Passed => {
            doc.push_str("Visual testing passed with no critical issues.\n");
        }
        Verdict::Failed => {
            doc.push_str(&format!(
                "**Reason:** {} page(s) failed automated testing.\n",
                visual.failed
            ));
        }
        Verdict::NeedsAttention => {
            let count = critique.map(|c| c.summary.critical_issues).unwrap_or(0);
            doc.push_str(&format!(
                "**Reason:** {count} critical UX issue(s) detected.\n"
            ));
        }
    }

    if let Some(critique) = critique {
        doc.push_str(&format!("\n{}\n", critique.overall_recommendation.describe()));
    }

    doc
}

fn compose_critique(doc: &mut String, critique: &CritiqueReport) {
    doc.push_str("---\n\n## AI Visual Analysis\n\n");
    doc.push_str(&format!(
        "- **Average Quality:** {:.1}/10\n",
        critique.summary.average_visual_quality
    ));
    doc.push_str(&format!(
        "- **Total UX Issues:** {}\n",
        critique.summary.total_ux_issues
    ));
    doc.push_str(&format!(
        "- **Critical Issues:** {}\n",
        critique.summary.critical_issues
    ));
    doc.push_str(&format!(
        "- **Estimated Cost:** ${:.2}\n\n",
        critique.summary.estimated_cost
    ));

    if !critique.critical_issues.is_empty() {
        doc.push_str("### Critical Issues\n\n");
        for item in &critique.critical_issues {
            doc.push_str(&format!("**{}**\n", item.page.to_uppercase()));
            doc.push_str(&format!("- **Severity:** {:?}\n", item.issue.severity));
            doc.push_str(&format!("- **Issue:** {}\n", item.issue.issue));
            doc.push_str(&format!(
                "- **Location:** {}\n\n",
                item.issue.location.as_deref().unwrap_or("N/A")
            ));
        }
    }

    doc.push_str("### Page-by-Page Analysis\n\n");
    for result in &critique.detailed_analyses {
        let analysis = match &result.outcome {
            CritiqueOutcome::Structured(analysis) => analysis,
            // Raw-text and failed records are excluded from the document
            _ => continue,
        };

        doc.push_str(&format!("#### {}\n\n", result.page.to_uppercase()));
        doc.push_str(&format!(
            "**Visual Quality:** {}/10\n\n",
            analysis
                .visual_quality_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ));

        if !analysis.ux_issues.is_empty() {
            doc.push_str("**UX Issues:**\n");
            for issue in &analysis.ux_issues {
                doc.push_str(&format!(
                    "- [{:?}] {}\n",
                    issue.severity, issue.issue
                ));
            }
            doc.push('\n');
        }

        if !analysis.recommendations.is_empty() {
            doc.push_str("**Top Recommendations:**\n");
            for (i, rec) in analysis.recommendations.iter().take(3).enumerate() {
                doc.push_str(&format!("{}. {}\n", i + 1, rec));
            }
            doc.push('\n');
        }

        doc.push_str("---\n\n");
    }
}

/// Persist the merged document at the project root.
pub fn write_report(project_path: &Path, document: &str) -> VisualResult<PathBuf> {
    let path = project_path.join(HYBRID_REPORT_FILE);
    std::fs::write(&path, document)?;
    info!("Hybrid report written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critique::{self, CritiqueAnalysis, CritiqueResult, Severity, UxIssue};
    use crate::probe::PageResult;
    use crate::runner::VisualReport;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn page(route: &str, status: PageStatus, diff: Option<f64>) -> PageResult {
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
            visual_diff: diff,
            baseline_created: diff.is_none(),
            error: (status == PageStatus::Failed).then(|| "HTTP 404".to_string()),
        }
    }

    fn critique_with(severities: &[Severity]) -> CritiqueReport {
        let issues: Vec<UxIssue> = severities
            .iter()
            .map(|&severity| UxIssue {
                severity,
                issue: "issue".to_string(),
                location: Some("header".to_string()),
            })
            .collect();
        critique::aggregate(vec![CritiqueResult {
            page: "home".to_string(),
            outcome: crate::critique::CritiqueOutcome::Structured(CritiqueAnalysis {
                visual_quality_score: Some(7),
                ux_issues: issues,
                design_flaws: Vec::new(),
                accessibility: None,
                recommendations: vec!["fix spacing".to_string()],
                overall_impression: None,
                human_verdict: None,
                cost_estimate: 0.007,
                model: None,
            }),
        }])
    }

    #[test]
    fn verdict_truth_table() {
        let clean = VisualReport::from_results(vec![page("/", PageStatus::Passed, Some(0.0))]);
        let broken = VisualReport::from_results(vec![page("/x", PageStatus::Failed, None)]);
        let calm = critique_with(&[Severity::Low]);
        let alarmed = critique_with(&[Severity::Critical]);

        assert_eq!(verdict(&clean, None), Verdict::Passed);
        assert_eq!(verdict(&clean, Some(&calm)), Verdict::Passed);
        assert_eq!(verdict(&clean, Some(&alarmed)), Verdict::NeedsAttention);
        assert_eq!(verdict(&broken, None), Verdict::Failed);
        // Automated failures dominate critique findings
        assert_eq!(verdict(&broken, Some(&alarmed)), Verdict::Failed);
    }

    #[test]
    fn exit_codes_follow_verdicts() {
        assert_eq!(exit_code(Verdict::Passed), 0);
        assert_eq!(exit_code(Verdict::Failed), 1);
        assert_eq!(exit_code(Verdict::NeedsAttention), 1);
    }

    #[test]
    fn failed_run_document_lists_failures() {
        let visual = VisualReport::from_results(vec![
            page("/", PageStatus::Passed, Some(0.02)),
            page("/missing", PageStatus::Failed, None),
        ]);

        let doc = compose(&visual, None);
        assert!(doc.contains("### Failed Pages"));
        assert!(doc.contains("**/missing**: HTTP 404"));
        assert!(doc.contains("### FAILED"));
        assert!(doc.contains("1 page(s) failed automated testing"));
    }

    #[test]
    fn diff_percentages_use_advisory_threshold() {
        let visual = VisualReport::from_results(vec![
            page("/", PageStatus::Passed, Some(0.02)),
            page("/login", PageStatus::Passed, Some(0.12)),
        ]);

        let doc = compose(&visual, None);
        assert!(doc.contains("**/**: [OK] 2.0% difference"));
        assert!(doc.contains("**/login**: [DRIFT] 12.0% difference"));
    }

    #[test]
    fn clean_run_with_critical_critique_needs_attention() {
        let visual = VisualReport::from_results(vec![page("/", PageStatus::Passed, Some(0.0))]);
        let critique = critique_with(&[Severity::Critical]);

        let doc = compose(&visual, Some(&critique));
        assert!(doc.contains("### NEEDS ATTENTION"));
        assert!(doc.contains("1 critical UX issue(s) detected"));
        assert!(doc.contains("### Critical Issues"));
        assert!(doc.contains("**HOME**"));
        assert!(doc.contains("**Top Recommendations:**"));
    }

    #[test]
    fn baseline_creation_is_reported() {
        let visual = VisualReport::from_results(vec![page("/", PageStatus::Passed, None)]);
        let doc = compose(&visual, None);
        assert!(doc.contains("**/**: baseline created"));
    }

    #[test]
    fn document_is_written_to_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let visual = VisualReport::from_results(Vec::new());
        let doc = compose(&visual, None);

        let path = write_report(dir.path(), &doc).unwrap();
        assert_eq!(path.file_name().unwrap(), HYBRID_REPORT_FILE);
        assert!(std::fs::read_to_string(path).unwrap().contains("VIGIL"));
    }
}
