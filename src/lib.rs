//! Harsel: feature selection and multi-model cross-validation
//!
//! Reduces a labeled table to a clean, normalized feature set, partitions it
//! into stratified train/test/validation subsets, trains several classifier
//! strategies on the same rows, and predicts unlabeled cases with the one that
//! scores best on the test subset.

pub mod classifier;
pub mod cli;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{PipelineError, Result};
