//! Shared utilities

pub mod preprocessing;

pub use preprocessing::{LetterboxGeometry, TensorPreprocessor};
