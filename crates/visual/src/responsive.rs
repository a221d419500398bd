//! Responsive viewport sampling
//!
//! Supplementary screenshots of the site root across a set of viewport
//! profiles. Purely side-effecting: per-profile failures are logged and
//! skipped, and nothing here affects the run's verdict.

use tracing::{info, warn};

use crate::baseline::BaselineStore;
use crate::browser::Browser;
use crate::config::ViewportProfile;

pub async fn sample(
    browser: &Browser,
    store: &BaselineStore,
    base_url: &str,
    profiles: &[ViewportProfile],
) {
    info!("Sampling {} responsive viewport(s)", profiles.len());

    for profile in profiles {
        let screenshot_path = store.current_path(&format!("home_{}", profile.name));

        match browser
            .capture_viewport(base_url, &screenshot_path, profile.width, profile.height)
            .await
        {
            Ok(()) => info!(
                "Captured {} ({}x{})",
                profile.name, profile.width, profile.height
            ),
            Err(e) => warn!("Viewport '{}' capture failed: {}", profile.name, e),
        }
    }
}
