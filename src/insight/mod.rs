//! Structured insight extraction over a parsed notebook.
//!
//! Markdown cells become an outline of sections, execution output is
//! scanned by independent pattern extractors and a per-model evaluation
//! parser, and the aggregator folds everything into one
//! [`AnalysisContext`].

mod aggregate;
mod bullets;
mod catalog;
mod evaluation;
mod outline;
mod patterns;
#[cfg(test)]
mod tests;

pub use aggregate::{AnalysisContext, DEFAULT_TARGET_COLUMN, ExtractOptions, InsightExtractor};
