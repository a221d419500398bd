//! Vigil visual regression pipeline
//!
//! Hybrid visual testing for a web application: a Playwright-driven probe
//! pass over the critical routes, pixel diffing against stored baselines,
//! and an optional vision-model critique of the captured screenshots, merged
//! into a single report and exit-code verdict.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Report Composer                         │
//! │   compose(visual, critique?) -> (markdown, exit code)        │
//! ├────────────────────────────┬─────────────────────────────────┤
//! │      VisualRunner          │       Critique                  │
//! │  run(base_url) ->          │  critique_pages(dir, pages) ->  │
//! │    VisualReport            │    Vec<CritiqueResult>          │
//! │    ├── probe_page() per    │  aggregate() ->                 │
//! │    │   critical route      │    CritiqueReport               │
//! │    └── responsive::sample()│                                 │
//! ├────────────┬───────────────┼─────────────────────────────────┤
//! │  Browser   │ BaselineStore │  VisionClient                   │
//! │  (node +   │ + diff RMS    │  (chat completions w/ images)   │
//! │  playwright│ scoring       │                                 │
//! │  scripts)  │               │                                 │
//! └────────────┴───────────────┴─────────────────────────────────┘
//! ```

pub mod baseline;
pub mod browser;
pub mod config;
pub mod critique;
pub mod diff;
pub mod error;
pub mod probe;
pub mod report;
pub mod responsive;
pub mod runner;

pub use baseline::{BaselineOutcome, BaselineStore};
pub use config::RunConfig;
pub use critique::{CritiqueReport, CritiqueResult, VisionClient};
pub use error::{VisualError, VisualResult};
pub use probe::{PageResult, PageStatus};
pub use report::Verdict;
pub use runner::{VisualReport, VisualRunner};
