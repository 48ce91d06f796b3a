use std::cmp::Ordering;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const NO_MISSING_VALUES_NOTE: &str = "No missing values were detected in any column.";

const SKEW_DISPLAY_LIMIT: usize = 5;
const CORRELATION_THRESHOLD: f64 = 0.05;
const TOP_POSITIVE: usize = 4;
const TOP_NEGATIVE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewnessSummary {
    pub count: usize,
    pub features: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub target: String,
    pub positive: Vec<(String, f64)>,
    pub negative: Vec<(String, f64)>,
    pub sentences: Vec<String>,
}

/// Compiled recognizers for the stateless extractors.
///
/// Each extractor returns `None` when its trigger is absent or its numbers
/// do not parse.
#[derive(Debug)]
pub struct PatternSet {
    dataset_shape: Regex,
    feature_count: Regex,
    correlation_line: Regex,
    url: Regex,
}

impl PatternSet {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dataset_shape: Regex::new(r"\((\d{2,}),\s*(\d+)\)")
                .context("failed to compile dataset shape regex")?,
            feature_count: Regex::new(r"(?i)total\s+(\d+)\s+columns")
                .context("failed to compile feature count regex")?,
            correlation_line: Regex::new(r"^(\S+)\s+(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)$")
                .context("failed to compile correlation line regex")?,
            url: Regex::new(r"https?://\S+").context("failed to compile url regex")?,
        })
    }

    /// `(rows, columns)` from the first `(N, M)` pair whose first number has
    /// at least two digits.
    pub fn dataset_shape<S: AsRef<str>>(&self, blocks: &[S]) -> Option<(u64, u64)> {
        let captures = blocks
            .iter()
            .find_map(|block| self.dataset_shape.captures(block.as_ref()))?;

        let rows = captures.get(1)?.as_str().parse::<u64>().ok()?;
        let columns = captures.get(2)?.as_str().parse::<u64>().ok()?;
        Some((rows, columns))
    }

    pub fn feature_count<S: AsRef<str>>(&self, blocks: &[S]) -> Option<u64> {
        let captures = blocks
            .iter()
            .find_map(|block| self.feature_count.captures(block.as_ref()))?;

        captures.get(1)?.as_str().parse::<u64>().ok()
    }

    /// Fixed note for a per-column null-count listing where every count is
    /// zero. Only fires on a block that names `target_column`, so it is tied
    /// to one dataset's layout and is not general missing-value detection.
    pub fn missing_values_note<S: AsRef<str>>(
        &self,
        blocks: &[S],
        target_column: &str,
    ) -> Option<String> {
        blocks
            .iter()
            .map(AsRef::as_ref)
            .filter(|block| block.contains("dtype") && block.contains(target_column))
            .find(|block| all_counts_are_zero(block))
            .map(|_| NO_MISSING_VALUES_NOTE.to_string())
    }

    pub fn skewness<S: AsRef<str>>(&self, blocks: &[S]) -> Option<SkewnessSummary> {
        let features = blocks
            .iter()
            .flat_map(|block| block.as_ref().lines())
            .filter(|line| line.to_lowercase().contains("skewed"))
            .filter_map(|line| line.split_once(" is "))
            .map(|(name, _)| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<String>>();

        if features.is_empty() {
            return None;
        }

        let count = features.len();
        let mut listed = features
            .iter()
            .take(SKEW_DISPLAY_LIMIT)
            .map(String::as_str)
            .collect::<Vec<&str>>();
        if count > SKEW_DISPLAY_LIMIT {
            listed.push("...");
        }

        let noun = if count == 1 { "variable" } else { "variables" };
        let summary = format!(
            "Skewness checks flagged {count} {noun} as skewed: {}.",
            listed.join(", ")
        );

        Some(SkewnessSummary {
            count,
            features,
            summary,
        })
    }

    /// Correlations against `target_column`, read from the first block that
    /// prints the target series (`Name: <target>`) and carries coefficients
    /// in `[-1, 1]`. Other series with the same marker, such as class
    /// counts, are skipped.
    pub fn correlation<S: AsRef<str>>(
        &self,
        blocks: &[S],
        target_column: &str,
    ) -> Option<CorrelationSummary> {
        let marker = format!("Name: {target_column}");
        let pairs = blocks
            .iter()
            .map(AsRef::as_ref)
            .filter(|block| block.contains(&marker))
            .map(|block| self.coefficient_pairs(block))
            .find(|pairs| !pairs.is_empty())?;

        let mut positive = pairs
            .iter()
            .filter(|(name, value)| *value > CORRELATION_THRESHOLD && name != target_column)
            .cloned()
            .collect::<Vec<(String, f64)>>();
        positive.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
        positive.truncate(TOP_POSITIVE);

        let mut negative = pairs
            .iter()
            .filter(|(_, value)| *value < -CORRELATION_THRESHOLD)
            .cloned()
            .collect::<Vec<(String, f64)>>();
        negative.sort_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal));
        negative.truncate(TOP_NEGATIVE);

        if positive.is_empty() && negative.is_empty() {
            return None;
        }

        let mut sentences = Vec::<String>::new();
        if !positive.is_empty() {
            sentences.push(format!(
                "The strongest positive correlations with {target_column} are {}.",
                format_contributors(&positive)
            ));
        }
        if !negative.is_empty() {
            sentences.push(format!(
                "The strongest negative correlations with {target_column} are {}.",
                format_contributors(&negative)
            ));
        }

        Some(CorrelationSummary {
            target: target_column.to_string(),
            positive,
            negative,
            sentences,
        })
    }

    fn coefficient_pairs(&self, block: &str) -> Vec<(String, f64)> {
        block
            .lines()
            .filter_map(|line| {
                let captures = self.correlation_line.captures(line.trim())?;
                let name = captures.get(1)?.as_str().to_string();
                let value = captures.get(2)?.as_str().parse::<f64>().ok()?;
                (-1.0..=1.0).contains(&value).then_some((name, value))
            })
            .collect()
    }

    pub fn first_url<S: AsRef<str>>(&self, blocks: &[S]) -> Option<String> {
        let found = blocks
            .iter()
            .find_map(|block| self.url.find(block.as_ref()))?
            .as_str();

        let trimmed = found.strip_suffix(')').unwrap_or(found);
        Some(trimmed.to_string())
    }
}

fn all_counts_are_zero(block: &str) -> bool {
    let counts = block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("dtype"))
        .filter(|line| {
            line.split_whitespace()
                .next_back()
                .map(|token| token.chars().all(|ch| ch.is_ascii_digit()))
                .unwrap_or(false)
        })
        .collect::<Vec<&str>>();

    !counts.is_empty() && counts.iter().all(|line| line.ends_with('0'))
}

fn format_contributors(pairs: &[(String, f64)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name} ({value:.3})"))
        .collect::<Vec<String>>()
        .join(", ")
}
