//! Runtime: the per-document runner and batch execution.
//!
//! [`Runner::run_doc`] sequences the pipeline stages under one deadline and
//! classifies the outcome; [`run_dataset`] and [`run_dataset_to_file`] drive
//! it over a whole dataset after a gazetteer preflight.

pub mod dataset;
pub mod orchestrator;
pub mod types;

pub use dataset::{preflight, run_dataset, run_dataset_to_file, PREFLIGHT_QUERY};
pub use orchestrator::Runner;
pub use types::*;
