//! Reporting and artifact export pipeline.

pub mod artifacts;
pub mod report;

pub use artifacts::{write_json, write_signals_csv, ArtifactManager, ArtifactPaths};
pub use report::{MtfReport, SCHEMA_VERSION};
