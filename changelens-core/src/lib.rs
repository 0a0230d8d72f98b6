//! Changelens core library: segmentation, snapshot indexing, doc
//! resolution, change detection and scoring.
//!
//! The main entry point is [`pipeline::analyze`], which turns a
//! [`pipeline::ChangeSet`] into an immutable [`report::ImpactReport`].

pub mod config;
pub mod detect;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod segment;
pub mod types;
pub mod version;

pub use config::ChangelensConfig;
pub use error::{AnalysisError, ErrorCode};
pub use pipeline::{ChangeSet, analyze};
pub use report::ImpactReport;
