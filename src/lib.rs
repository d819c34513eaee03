//! Dataset cleaning, DVC publishing and model serving.
//!
//! The preprocessing run is strictly linear: sync inputs from the DVC remote,
//! clean each raw CSV, then register, commit and push every output. At most
//! one run should target a given remote at a time.

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod shell;
pub mod versioning;

pub use error::PipelineError;
