//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use vigil_visual::critique::CritiqueReport;
use vigil_visual::probe::{PageResult, PageStatus};
use vigil_visual::report::Verdict;
use vigil_visual::runner::VisualReport;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Page result display wrapper
#[derive(Serialize)]
pub struct PageRow {
    pub page: String,
    pub status: String,
    pub diff: Option<f64>,
    pub warnings: usize,
    pub error: Option<String>,
}

impl From<&PageResult> for PageRow {
    fn from(result: &PageResult) -> Self {
        Self {
            page: result.page.clone(),
            status: match result.status {
                PageStatus::Passed => "passed".to_string(),
                PageStatus::Failed => "failed".to_string(),
            },
            diff: result.visual_diff,
            warnings: result.broken_images.len()
                + result.console_errors.len()
                + result.layout_issues.len(),
            error: result.error.clone(),
        }
    }
}

impl TableDisplay for PageRow {
    fn headers() -> Vec<&'static str> {
        vec!["Route", "Status", "Diff", "Warnings", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.page.clone(),
            self.status.clone(),
            self.diff
                .map(|d| format!("{:.1}%", d * 100.0))
                .unwrap_or_else(|| "-".to_string()),
            self.warnings.to_string(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

/// Baseline listing display wrapper
#[derive(Serialize)]
pub struct BaselineRow {
    pub page: String,
}

impl TableDisplay for BaselineRow {
    fn headers() -> Vec<&'static str> {
        vec!["Page"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.page.clone()]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// Print the per-page results of a visual run
pub fn print_page_results(report: &VisualReport, format: OutputFormat) {
    let rows: Vec<PageRow> = report.results.iter().map(PageRow::from).collect();
    print_list(&rows, format);
    println!(
        "Pages: {} total, {} passed, {} failed",
        report.total_pages, report.passed, report.failed
    );
}

/// Print the critique summary
pub fn print_critique_summary(report: &CritiqueReport) {
    println!(
        "AI analysis: {} page(s), avg quality {:.1}/10, {} issue(s), {} critical, est. ${:.2}",
        report.summary.total_pages_analyzed,
        report.summary.average_visual_quality,
        report.summary.total_ux_issues,
        report.summary.critical_issues,
        report.summary.estimated_cost,
    );
    println!(
        "Recommendation: {}",
        report.overall_recommendation.describe()
    );
}

/// Print the final colored verdict line
pub fn print_verdict(verdict: Verdict) {
    let label = match verdict {
        Verdict::Passed => "PASSED".green().bold(),
        Verdict::Failed => "FAILED".red().bold(),
        Verdict::NeedsAttention => "NEEDS ATTENTION".yellow().bold(),
    };
    println!("\nOverall verdict: {label}");
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
