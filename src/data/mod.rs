//! Tabular data loading, cleaning and feature synthesis.

pub mod clean;
pub mod features;
pub mod table;
