//! Playwright browser automation
//!
//! The browser capability is driven the same way for every capture: Rust
//! generates a self-contained Node script, runs it with `node` from a temp
//! directory, and parses a single JSON object from the script's stdout.
//! Navigation failures surface as a JSON error object on stderr with a
//! non-zero exit.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::config::{RunConfig, Viewport};
use crate::error::{VisualError, VisualResult};

/// Structural elements every probed page is checked for.
const STRUCTURAL_CHECKS: [(&str, &str); 4] = [
    ("title", "title"),
    ("body", "body"),
    ("header", r#"header, nav, [role="banner"]"#),
    ("footer", r#"footer, [role="contentinfo"]"#),
];

/// One structural-presence check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementCheck {
    pub exists: bool,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub text_length: u64,
}

/// Everything the probe script reports for one page load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeOutput {
    /// HTTP status of the navigation response (0 if none was received).
    pub status: u16,
    #[serde(default)]
    pub checks: BTreeMap<String, ElementCheck>,
    #[serde(default)]
    pub broken_images: Vec<String>,
    #[serde(default)]
    pub console_errors: Vec<String>,
    #[serde(default)]
    pub horizontal_overflow: bool,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub viewport: Viewport,
    pub user_agent: String,
    pub headless: bool,
    pub navigation_timeout_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            viewport: run.viewport,
            user_agent: run.user_agent,
            headless: true,
            navigation_timeout_ms: run.navigation_timeout_ms,
            settle_delay_ms: run.settle_delay_ms,
        }
    }
}

impl BrowserConfig {
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            viewport: config.viewport,
            user_agent: config.user_agent.clone(),
            headless: true,
            navigation_timeout_ms: config.navigation_timeout_ms,
            settle_delay_ms: config.settle_delay_ms,
        }
    }
}

/// Handle for launching headless page captures.
pub struct Browser {
    config: BrowserConfig,
}

impl Browser {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Check that Playwright is available before committing to a run.
    pub fn check_playwright_installed() -> VisualResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(VisualError::PlaywrightNotFound),
        }
    }

    /// Load a page, capture a full-page screenshot, and collect health
    /// signals. HTTP >= 400 short-circuits: only `status` is populated.
    pub async fn probe(&self, url: &str, screenshot_path: &Path) -> VisualResult<ProbeOutput> {
        let script = self.probe_script(url, screenshot_path);
        let stdout = self.run_script(&script).await?;
        parse_probe_output(&stdout)
    }

    /// Capture a viewport-sized screenshot of `url` from a fresh context.
    pub async fn capture_viewport(
        &self,
        url: &str,
        screenshot_path: &Path,
        width: u32,
        height: u32,
    ) -> VisualResult<()> {
        let script = self.viewport_script(url, screenshot_path, width, height);
        self.run_script(&script).await?;
        Ok(())
    }

    /// Build the probe script for one route.
    fn probe_script(&self, url: &str, screenshot_path: &Path) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium }} = require('playwright');

(async () => {{
  const browser = await chromium.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }},
    userAgent: '{user_agent}'
  }});
  const page = await context.newPage();
  const consoleErrors = [];
  page.on('console', msg => {{
    if (msg.type() === 'error') consoleErrors.push(msg.text());
  }});
  try {{
    const response = await page.goto('{url}', {{ waitUntil: 'networkidle', timeout: {timeout} }});
    const status = response ? response.status() : 0;
    if (status >= 400) {{
      console.log(JSON.stringify({{ status }}));
      return;
    }}
    await page.waitForLoadState('domcontentloaded');
    await page.waitForTimeout({settle});
    await page.screenshot({{ path: '{screenshot}', fullPage: true }});
"#,
            headless = self.config.headless,
            width = self.config.viewport.width,
            height = self.config.viewport.height,
            user_agent = js_escape(&self.config.user_agent),
            url = js_escape(url),
            timeout = self.config.navigation_timeout_ms,
            settle = self.config.settle_delay_ms,
            screenshot = js_escape(&screenshot_path.to_string_lossy()),
        ));

        script.push_str("    const selectors = {\n");
        for (name, selector) in STRUCTURAL_CHECKS {
            script.push_str(&format!("      {name}: '{}',\n", js_escape(selector)));
        }
        script.push_str("    };\n");

        script.push_str(
            r#"    const checks = {};
    for (const [name, selector] of Object.entries(selectors)) {
      try {
        const el = await page.$(selector);
        if (el) {
          const text = await el.textContent();
          checks[name] = {
            exists: true,
            visible: await el.isVisible(),
            text_length: (text || '').length
          };
        } else {
          checks[name] = { exists: false };
        }
      } catch (e) {
        checks[name] = { exists: false };
      }
    }
    const brokenImages = await page.$$eval('img', imgs =>
      imgs.filter(img => img.getAttribute('src') && img.naturalWidth === 0)
          .map(img => img.getAttribute('src')));
    const horizontalOverflow = await page.evaluate(() =>
      document.documentElement.scrollWidth > window.innerWidth);
    console.log(JSON.stringify({
      status,
      checks,
      broken_images: brokenImages,
      console_errors: consoleErrors,
      horizontal_overflow: horizontalOverflow
    }));
  } catch (error) {
    console.error(JSON.stringify({ error: error.message }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// Build the single-viewport capture script for the responsive pass.
    fn viewport_script(&self, url: &str, screenshot_path: &Path, width: u32, height: u32) -> String {
        format!(
            r#"const {{ chromium }} = require('playwright');

(async () => {{
  const browser = await chromium.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  try {{
    await page.goto('{url}', {{ waitUntil: 'networkidle', timeout: {timeout} }});
    await page.screenshot({{ path: '{screenshot}' }});
    console.log(JSON.stringify({{ captured: true }}));
  }} catch (error) {{
    console.error(JSON.stringify({{ error: error.message }}));
    process.exitCode = 1;
  }} finally {{
    await context.close();
    await browser.close();
  }}
}})();
"#,
            headless = self.config.headless,
            url = js_escape(url),
            timeout = self.config.navigation_timeout_ms,
            screenshot = js_escape(&screenshot_path.to_string_lossy()),
        )
    }

    /// Run a generated script with node, returning its stdout.
    async fn run_script(&self, script: &str) -> VisualResult<String> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("capture.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(match script_error(&stderr) {
                Some(message) => VisualError::Navigation(message),
                None => VisualError::Browser(format!(
                    "script failed:\nstdout: {stdout}\nstderr: {stderr}"
                )),
            });
        }

        Ok(stdout)
    }
}

/// Escape a value for embedding inside a single-quoted JS string literal.
fn js_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Parse the probe JSON from the script's stdout (last non-empty line; the
/// page itself may have logged above it).
fn parse_probe_output(stdout: &str) -> VisualResult<ProbeOutput> {
    let line = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| VisualError::Browser("probe produced no output".to_string()))?;

    serde_json::from_str(line.trim())
        .map_err(|e| VisualError::Browser(format!("unparseable probe output: {e}: {line}")))
}

/// Extract the error message from a failed script's stderr, if it emitted one.
fn script_error(stderr: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ScriptError {
        error: String,
    }

    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str::<ScriptError>(line.trim()).ok())
        .map(|e| e.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn probe_output_parses_full_payload() {
        let stdout = r#"{"status":200,"checks":{"title":{"exists":true,"visible":false,"text_length":12},"footer":{"exists":false}},"broken_images":["/img/a.png"],"console_errors":["ReferenceError: x"],"horizontal_overflow":true}"#;
        let output = parse_probe_output(stdout).unwrap();

        assert_eq!(output.status, 200);
        assert!(output.checks["title"].exists);
        assert_eq!(output.checks["title"].text_length, 12);
        assert!(!output.checks["footer"].exists);
        assert!(!output.checks["footer"].visible);
        assert_eq!(output.broken_images, vec!["/img/a.png"]);
        assert!(output.horizontal_overflow);
    }

    #[test]
    fn probe_output_parses_error_status_shortform() {
        let output = parse_probe_output("{\"status\":404}\n").unwrap();
        assert_eq!(output.status, 404);
        assert!(output.checks.is_empty());
        assert!(output.broken_images.is_empty());
    }

    #[test]
    fn probe_output_skips_page_noise() {
        let stdout = "some page log\n\n{\"status\":200}\n";
        assert_eq!(parse_probe_output(stdout).unwrap().status, 200);
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(parse_probe_output("  \n").is_err());
    }

    #[test]
    fn script_error_extracts_message() {
        let stderr = "{\"error\":\"net::ERR_CONNECTION_REFUSED\"}\n";
        assert_eq!(
            script_error(stderr).as_deref(),
            Some("net::ERR_CONNECTION_REFUSED")
        );
        assert_eq!(script_error("garbage"), None);
    }

    #[test]
    fn probe_script_embeds_policy() {
        let browser = Browser::new(BrowserConfig::default());
        let script = browser.probe_script(
            "http://localhost:3000/login",
            &PathBuf::from("/tmp/shots/login.png"),
        );

        assert!(script.contains("waitUntil: 'networkidle'"));
        assert!(script.contains("timeout: 30000"));
        assert!(script.contains("fullPage: true"));
        assert!(script.contains("waitForTimeout(1000)"));
        assert!(script.contains(r#"header, nav, [role="banner"]"#));
        assert!(script.contains("naturalWidth === 0"));
        assert!(script.contains("scrollWidth > window.innerWidth"));
    }

    #[test]
    fn js_escape_handles_quotes() {
        assert_eq!(js_escape("it's"), "it\\'s");
        assert_eq!(js_escape(r"C:\shots"), r"C:\\shots");
    }
}
