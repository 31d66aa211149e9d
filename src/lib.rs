//! siftclick finds prioritized reference images on the screen with SIFT feature matching
//! and clicks the highest priority one it sees.
//!
//! The matching core (`catalog`, `features`, `matcher`, `aggregate`, `engine`) is pure and
//! runs on any platform. Screen capture and pointer control live behind the `desktop`
//! feature.

pub mod aggregate;
pub mod automation;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod features;
pub mod imgtools;
pub mod matcher;

#[cfg(feature = "desktop")]
pub mod core;
#[cfg(feature = "desktop")]
pub mod desktop;

pub use aggregate::{aggregate, ClickPoint};
pub use automation::{AutoClicker, CycleOutcome, Pacer, PointerController, RandomPacer, ScreenCapturer};
pub use catalog::{Catalog, Template, TemplateId};
pub use config::{Command, RunConfig};
pub use engine::{Detection, MatchEngine};
pub use errors::{AutoClickError, CatalogError, ConfigError, FeatureMatchError};
pub use features::{Descriptor, FeatureExtractor, Keypoint, Sift};
pub use matcher::{match_points, MatchPolicy};
