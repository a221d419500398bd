//! Vision-model UX critique
//!
//! Sends captured screenshots to a vision-capable chat-completions API and
//! normalizes the response into a tagged outcome: a structured critique, the
//! raw text when the model's JSON does not parse, or the transport error.
//! Per-page failures never propagate; they are carried in the result record
//! and excluded from numeric aggregates.

use std::path::{Path, PathBuf};

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CandidatePage;
use crate::error::{VisualError, VisualResult};

pub const AI_REPORT_FILE: &str = "VIGIL_AI_VISUAL_REPORT.json";

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Flat per-call price estimate, not measured usage.
const COST_PER_CALL: f64 = 0.007;

const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Severities that count against the run's verdict.
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UxIssue {
    pub severity: Severity,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accessibility {
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// The structured critique the model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueAnalysis {
    #[serde(default)]
    pub visual_quality_score: Option<u8>,
    #[serde(default)]
    pub ux_issues: Vec<UxIssue>,
    #[serde(default)]
    pub design_flaws: Vec<String>,
    #[serde(default)]
    pub accessibility: Option<Accessibility>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub overall_impression: Option<String>,
    #[serde(default)]
    pub human_verdict: Option<String>,
    #[serde(default)]
    pub cost_estimate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Exactly one of these is populated per analyzed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CritiqueOutcome {
    /// The model's JSON did not parse; the text is kept for human review and
    /// excluded from numeric aggregates.
    RawText { raw_analysis: String },
    /// Transport or model failure.
    Failed { error: String },
    /// Parsed critique.
    Structured(CritiqueAnalysis),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueResult {
    pub page: String,
    #[serde(flatten)]
    pub outcome: CritiqueOutcome,
}

impl CritiqueResult {
    pub fn analysis(&self) -> Option<&CritiqueAnalysis> {
        match &self.outcome {
            CritiqueOutcome::Structured(analysis) => Some(analysis),
            _ => None,
        }
    }
}

/// A critical/high issue associated with its page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageIssue {
    pub page: String,
    pub issue: UxIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Ready,
    MinorImprovements,
    NeedsImprovement,
}

impl Recommendation {
    /// Tier thresholds over mean quality and total issue count.
    pub fn derive(average_quality: f64, total_issues: usize) -> Self {
        if average_quality >= 8.0 && total_issues < 5 {
            Recommendation::Ready
        } else if average_quality >= 6.0 && total_issues < 10 {
            Recommendation::MinorImprovements
        } else {
            Recommendation::NeedsImprovement
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Recommendation::Ready => "Excellent UX - Ready for production",
            Recommendation::MinorImprovements => "Good UX - Minor improvements recommended",
            Recommendation::NeedsImprovement => {
                "UX needs improvement - Address critical issues before launch"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueSummary {
    pub total_pages_analyzed: usize,
    pub average_visual_quality: f64,
    pub total_ux_issues: usize,
    pub critical_issues: usize,
    pub estimated_cost: f64,
}

/// Aggregate over all critique results for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueReport {
    pub summary: CritiqueSummary,
    pub critical_issues: Vec<PageIssue>,
    pub detailed_analyses: Vec<CritiqueResult>,
    pub overall_recommendation: Recommendation,
}

/// Client for the vision-capable chat-completions API.
pub struct VisionClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl VisionClient {
    /// Construct from the process environment. A missing credential is fatal
    /// to the critique phase, and only to it.
    pub fn from_env(model: &str) -> VisualResult<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| VisualError::MissingCredential(API_KEY_VAR))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
        })
    }

    /// Analyze one screenshot. Failures are folded into the outcome.
    pub async fn analyze_screenshot(
        &self,
        screenshot_path: &Path,
        page: &str,
        context: &str,
    ) -> CritiqueResult {
        info!("Analyzing '{}' with {}", page, self.model);

        let outcome = match self.request_analysis(screenshot_path, page, context).await {
            Ok(text) => match parse_critique(&text) {
                CritiqueOutcome::Structured(mut analysis) => {
                    analysis.cost_estimate = COST_PER_CALL;
                    analysis.model = Some(self.model.clone());
                    info!(
                        "'{}' quality {}/10, {} issue(s)",
                        page,
                        analysis
                            .visual_quality_score
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "?".to_string()),
                        analysis.ux_issues.len()
                    );
                    CritiqueOutcome::Structured(analysis)
                }
                other => {
                    warn!("Unparseable critique for '{}', keeping raw text", page);
                    other
                }
            },
            Err(e) => {
                warn!("Analysis failed for '{}': {}", page, e);
                CritiqueOutcome::Failed { error: e.to_string() }
            }
        };

        CritiqueResult { page: page.to_string(), outcome }
    }

    /// Analyze every candidate page with a screenshot on disk, in order.
    pub async fn critique_pages(
        &self,
        screenshot_dir: &Path,
        pages: &[CandidatePage],
    ) -> Vec<CritiqueResult> {
        info!("Analyzing {} candidate page(s)", pages.len());

        let mut results = Vec::new();
        for page in pages {
            let screenshot = screenshot_dir.join(format!("{}.png", page.name));
            if !screenshot.exists() {
                warn!("Screenshot not found for '{}', skipping", page.name);
                continue;
            }

            results.push(
                self.analyze_screenshot(&screenshot, &page.name, &page.context)
                    .await,
            );
        }

        results
    }

    async fn request_analysis(
        &self,
        screenshot_path: &Path,
        page: &str,
        context: &str,
    ) -> VisualResult<String> {
        let bytes = std::fs::read(screenshot_path)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: critique_prompt(page, context),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{encoded}"),
                            detail: "high".to_string(),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisualError::Model(format!("HTTP {status}: {body}")));
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| VisualError::Model("response contained no choices".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

fn critique_prompt(page: &str, context: &str) -> String {
    format!(
        r#"You are an expert UX/UI reviewer analyzing a webpage screenshot.

Page: {page}
Context: {context}

Please analyze this screenshot and provide:

1. **Visual Quality** (1-10):
   - Layout & spacing
   - Color scheme
   - Typography
   - Image quality

2. **UX Issues** (Critical/High/Medium/Low):
   - Navigation clarity
   - Call-to-action visibility
   - Form usability
   - Error handling
   - Mobile responsiveness indicators

3. **Design Flaws**:
   - Overlapping elements
   - Poor contrast
   - Inconsistent styling
   - Broken layouts

4. **Accessibility Concerns**:
   - Text readability
   - Button sizes
   - Color contrast
   - Visual hierarchy

5. **Recommendations** (top 3 priorities)

Format your response as JSON:
{{
  "visual_quality_score": 8,
  "ux_issues": [
    {{"severity": "high", "issue": "Login button hard to find", "location": "top right"}}
  ],
  "design_flaws": ["text overlapping image", "poor color contrast"],
  "accessibility": {{"score": 7, "issues": ["small text size"]}},
  "recommendations": ["Make CTA more prominent", "Improve contrast", "Fix spacing"],
  "overall_impression": "Professional but needs UX improvements",
  "human_verdict": "Would a first-time user be confused? Yes/No and why"
}}

Be honest and critical. Focus on real user experience."#
    )
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
fn extract_json(text: &str) -> String {
    if let Ok(re) = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```") {
        if let Some(m) = re.captures(text).and_then(|caps| caps.get(1)) {
            return m.as_str().to_string();
        }
    }
    text.trim().to_string()
}

/// Normalize free-form model output into a tagged outcome.
pub fn parse_critique(text: &str) -> CritiqueOutcome {
    match serde_json::from_str::<CritiqueAnalysis>(&extract_json(text)) {
        Ok(analysis) => CritiqueOutcome::Structured(analysis),
        Err(_) => CritiqueOutcome::RawText {
            raw_analysis: text.to_string(),
        },
    }
}

/// Build the aggregate report from accumulated per-page results.
pub fn aggregate(results: Vec<CritiqueResult>) -> CritiqueReport {
    let scored: Vec<u8> = results
        .iter()
        .filter_map(|r| r.analysis().and_then(|a| a.visual_quality_score))
        .collect();

    // Mean over pages with a score; zero pages yield 0, not a division error
    let average_visual_quality = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|&s| s as f64).sum::<f64>() / scored.len() as f64
    };

    let total_ux_issues: usize = results
        .iter()
        .filter_map(|r| r.analysis())
        .map(|a| a.ux_issues.len())
        .sum();

    let critical_issues: Vec<PageIssue> = results
        .iter()
        .filter_map(|r| r.analysis().map(|a| (r.page.clone(), a)))
        .flat_map(|(page, analysis)| {
            analysis
                .ux_issues
                .iter()
                .filter(|issue| issue.severity.is_critical())
                .map(move |issue| PageIssue {
                    page: page.clone(),
                    issue: issue.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let estimated_cost = results.len() as f64 * COST_PER_CALL;
    let overall_recommendation = Recommendation::derive(average_visual_quality, total_ux_issues);

    CritiqueReport {
        summary: CritiqueSummary {
            total_pages_analyzed: results.len(),
            average_visual_quality,
            total_ux_issues,
            critical_issues: critical_issues.len(),
            estimated_cost: (estimated_cost * 100.0).round() / 100.0,
        },
        critical_issues,
        detailed_analyses: results,
        overall_recommendation,
    }
}

/// Persist the critique report artifact at the project root.
pub fn write_report(project_path: &Path, report: &CritiqueReport) -> VisualResult<PathBuf> {
    let path = project_path.join(AI_REPORT_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    info!("Critique report written to {}", path.display());
    Ok(path)
}
