//! Baseline screenshot store
//!
//! Owns the `.vigil_screenshots/{baseline,current,diff}` tree under the
//! project path. Baselines are created lazily: the first capture for a page
//! is promoted (moved, not copied) into the baseline directory, and from then
//! on it is only replaced by an explicit operator action.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{VisualError, VisualResult};

pub const SCREENSHOTS_DIR: &str = ".vigil_screenshots";

/// Outcome of a baseline lookup for one page.
#[derive(Debug)]
pub enum BaselineOutcome {
    /// A baseline exists; compare the current capture against it.
    Existing(PathBuf),
    /// No baseline existed; the current capture was promoted in place.
    Created,
}

pub struct BaselineStore {
    baseline_dir: PathBuf,
    current_dir: PathBuf,
    diff_dir: PathBuf,
}

impl BaselineStore {
    /// Open (creating if needed) the screenshot tree under `project_path`.
    pub fn new(project_path: &Path) -> VisualResult<Self> {
        let root = project_path.join(SCREENSHOTS_DIR);
        let store = Self {
            baseline_dir: root.join("baseline"),
            current_dir: root.join("current"),
            diff_dir: root.join("diff"),
        };

        std::fs::create_dir_all(&store.baseline_dir)?;
        std::fs::create_dir_all(&store.current_dir)?;
        std::fs::create_dir_all(&store.diff_dir)?;

        Ok(store)
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn current_path(&self, page_id: &str) -> PathBuf {
        self.current_dir.join(format!("{page_id}.png"))
    }

    pub fn baseline_path(&self, page_id: &str) -> PathBuf {
        self.baseline_dir.join(format!("{page_id}.png"))
    }

    pub fn diff_path(&self, page_id: &str) -> PathBuf {
        self.diff_dir.join(format!("{page_id}_diff.png"))
    }

    /// Return the baseline for `page_id`, or promote the current capture into
    /// one if none exists yet.
    pub fn get_or_create(&self, page_id: &str, current: &Path) -> VisualResult<BaselineOutcome> {
        let baseline = self.baseline_path(page_id);

        if baseline.exists() {
            return Ok(BaselineOutcome::Existing(baseline));
        }

        std::fs::rename(current, &baseline)?;
        info!("Baseline created for '{}'", page_id);
        Ok(BaselineOutcome::Created)
    }

    /// Replace the baseline for `page_id` with its current capture.
    ///
    /// Operator action; nothing in the pipeline calls this automatically.
    pub fn update_baseline(&self, page_id: &str) -> VisualResult<()> {
        let current = self.current_path(page_id);
        if !current.exists() {
            return Err(VisualError::ScreenshotNotFound(
                current.to_string_lossy().to_string(),
            ));
        }

        std::fs::copy(&current, self.baseline_path(page_id))?;
        info!("Updated baseline for '{}'", page_id);
        Ok(())
    }

    /// List the page identifiers that have a stored baseline.
    pub fn list_baselines(&self) -> VisualResult<Vec<String>> {
        let mut baselines: Vec<String> = walkdir::WalkDir::new(&self.baseline_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "png")
                    .unwrap_or(false)
            })
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
            })
            .collect();

        baselines.sort();
        Ok(baselines)
    }

    /// Remove stale diff images from previous runs.
    pub fn clean_diffs(&self) -> VisualResult<()> {
        for entry in std::fs::read_dir(&self.diff_dir)? {
            let entry = entry?;
            std::fs::remove_file(entry.path())?;
        }
        Ok(())
    }
}
