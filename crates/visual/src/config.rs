//! Run configuration
//!
//! Every policy knob the pipeline consults lives here with a serde default
//! matching the built-in behavior, so a bare `RunConfig::default()` reproduces
//! the standard run and a YAML file can override any subset of options.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::VisualResult;

/// Complete configuration for one visual testing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Critical routes probed on every run, in order.
    #[serde(default = "default_routes")]
    pub routes: Vec<String>,

    /// Pages sent to the vision model, with reviewer context.
    #[serde(default = "default_candidate_pages")]
    pub candidate_pages: Vec<CandidatePage>,

    /// Viewport profiles for the responsive sampling pass.
    #[serde(default = "default_viewports")]
    pub viewports: Vec<ViewportProfile>,

    /// Viewport for the critical-route pass.
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Advisory visual diff threshold in [0.0, 1.0]. Differences above it are
    /// reported prominently but never fail a page.
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f64,

    /// Navigation timeout in milliseconds.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Settle delay after domcontentloaded, letting animations and async
    /// content resolve before the screenshot.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// User agent presented by the browser context.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Vision model used for the critique phase.
    #[serde(default = "default_model")]
    pub model: String,
}

/// A page the critique phase should review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePage {
    /// Page identifier; matches the screenshot file stem.
    pub name: String,

    /// Reviewer context handed to the model alongside the screenshot.
    #[serde(default)]
    pub context: String,
}

/// A named viewport for the responsive pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

fn default_routes() -> Vec<String> {
    ["/", "/login", "/register", "/dashboard", "/invest"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_candidate_pages() -> Vec<CandidatePage> {
    [
        ("home", "Main landing page - first impression"),
        ("login", "User login page - security & trust"),
        ("register", "Registration flow - conversion critical"),
        ("dashboard", "User dashboard - main interface"),
        ("invest", "Investment page - revenue critical"),
    ]
    .into_iter()
    .map(|(name, context)| CandidatePage {
        name: name.to_string(),
        context: context.to_string(),
    })
    .collect()
}

fn default_viewports() -> Vec<ViewportProfile> {
    vec![
        ViewportProfile { name: "mobile".to_string(), width: 375, height: 667 },
        ViewportProfile { name: "tablet".to_string(), width: 768, height: 1024 },
        ViewportProfile { name: "desktop".to_string(), width: 1920, height: 1080 },
    ]
}

fn default_viewport() -> Viewport {
    Viewport { width: 1920, height: 1080 }
}

fn default_diff_threshold() -> f64 {
    0.05 // 5% advisory threshold
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Vigil/0.1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            routes: default_routes(),
            candidate_pages: default_candidate_pages(),
            viewports: default_viewports(),
            viewport: default_viewport(),
            diff_threshold: default_diff_threshold(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            user_agent: default_user_agent(),
            model: default_model(),
        }
    }
}

impl RunConfig {
    /// Parse a run configuration from YAML.
    pub fn from_yaml(yaml: &str) -> VisualResult<Self> {
        serde_yaml::from_str(yaml).map_err(crate::error::VisualError::from)
    }

    /// Load a run configuration from a YAML file.
    pub fn from_file(path: &Path) -> VisualResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_run() {
        let config = RunConfig::default();
        assert_eq!(config.routes.len(), 5);
        assert_eq!(config.routes[0], "/");
        assert_eq!(config.diff_threshold, 0.05);
        assert_eq!(config.navigation_timeout_ms, 30_000);
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.viewports.len(), 3);
        assert_eq!(config.viewports[0].name, "mobile");
        assert_eq!(config.viewports[0].width, 375);
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn partial_yaml_overrides_keep_defaults() {
        let yaml = r#"
routes:
  - /
  - /pricing
diff_threshold: 0.1
"#;
        let config = RunConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.routes, vec!["/", "/pricing"]);
        assert_eq!(config.diff_threshold, 0.1);
        // Untouched options keep their documented defaults
        assert_eq!(config.navigation_timeout_ms, 30_000);
        assert_eq!(config.candidate_pages.len(), 5);
    }

    #[test]
    fn candidate_page_context_defaults_to_empty() {
        let yaml = r#"
candidate_pages:
  - name: home
"#;
        let config = RunConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.candidate_pages[0].name, "home");
        assert!(config.candidate_pages[0].context.is_empty());
    }
}
