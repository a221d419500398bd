//! Error types for the visual pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisualError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Screenshot not found: {0}")]
    ScreenshotNotFound(String),

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Missing API credential: set {0}")]
    MissingCredential(&'static str),

    #[error("Vision model error: {0}")]
    Model(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type VisualResult<T> = Result<T, VisualError>;
