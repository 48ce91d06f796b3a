use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

const MODEL_MARKER: &str = "Model:";
const CONFUSION_MARKER: &str = "Confusion Matrix";
const ROC_AUC_MARKER: &str = "ROC AUC Score";

pub const ACCURACY_KEY: &str = "accuracy";
pub const ROC_AUC_KEY: &str = "roc_auc";
pub const CONFUSION_MATRIX_KEY: &str = "confusion_matrix";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Matrix(Vec<Vec<i64>>),
    Raw(String),
}

/// Metrics printed for one `Model:` block of execution output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub name: String,
    pub metrics: BTreeMap<String, MetricValue>,
}

impl EvaluationRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.metrics.get(key) {
            Some(MetricValue::Number(value)) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct EvaluationPatterns {
    class_report_row: Regex,
}

impl EvaluationPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            class_report_row: Regex::new(
                r"^(?P<label>[01])\s+(?P<precision>\d*\.?\d+)\s+(?P<recall>\d*\.?\d+)\s+(?P<f1>\d*\.?\d+)",
            )
            .context("failed to compile classification report row regex")?,
        })
    }

    /// Splits concatenated output text into one record per `Model:` line,
    /// in the order the markers appear. Repeated names stay separate.
    pub fn parse(&self, text: &str) -> Vec<EvaluationRecord> {
        let mut scanner = EvaluationScanner {
            patterns: self,
            records: Vec::new(),
            state: ScanState::Idle,
        };

        for line in text.lines() {
            scanner.step(line.trim());
        }

        scanner.finish()
    }
}

#[derive(Debug)]
enum ScanState {
    Idle,
    InRecord(EvaluationRecord),
    InConfusion {
        record: EvaluationRecord,
        rows: Vec<Vec<i64>>,
    },
}

struct EvaluationScanner<'a> {
    patterns: &'a EvaluationPatterns,
    records: Vec<EvaluationRecord>,
    state: ScanState,
}

impl EvaluationScanner<'_> {
    fn step(&mut self, line: &str) {
        self.state = match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Idle => self.from_idle(line),
            ScanState::InRecord(record) => self.from_record(record, line),
            ScanState::InConfusion { record, rows } => self.from_confusion(record, rows, line),
        };
    }

    fn from_idle(&mut self, line: &str) -> ScanState {
        match model_name(line) {
            Some(name) => ScanState::InRecord(EvaluationRecord::new(name)),
            None => ScanState::Idle,
        }
    }

    fn from_record(&mut self, mut record: EvaluationRecord, line: &str) -> ScanState {
        if let Some(name) = model_name(line) {
            self.records.push(record);
            return ScanState::InRecord(EvaluationRecord::new(name));
        }

        if line.starts_with(CONFUSION_MARKER) {
            return ScanState::InConfusion {
                record,
                rows: Vec::new(),
            };
        }

        if line.starts_with(ROC_AUC_MARKER) {
            record
                .metrics
                .insert(ROC_AUC_KEY.to_string(), parse_roc_auc(line));
        } else if line.to_lowercase().starts_with(ACCURACY_KEY) {
            if let Some(value) = parse_accuracy(line) {
                record
                    .metrics
                    .insert(ACCURACY_KEY.to_string(), MetricValue::Number(value));
            }
        } else {
            self.apply_class_report_row(&mut record, line);
        }

        ScanState::InRecord(record)
    }

    fn from_confusion(
        &mut self,
        mut record: EvaluationRecord,
        mut rows: Vec<Vec<i64>>,
        line: &str,
    ) -> ScanState {
        if line.is_empty() {
            attach_matrix(&mut record, rows);
            return ScanState::InRecord(record);
        }

        let values = integer_tokens(line);
        if model_name(line).is_some() || (values.is_empty() && !rows.is_empty()) {
            attach_matrix(&mut record, rows);
            return self.from_record(record, line);
        }

        if !values.is_empty() {
            rows.push(values);
        }

        if rows.len() >= 2 && line.ends_with(']') {
            attach_matrix(&mut record, rows);
            return ScanState::InRecord(record);
        }

        ScanState::InConfusion { record, rows }
    }

    fn apply_class_report_row(&self, record: &mut EvaluationRecord, line: &str) {
        let Some(captures) = self.patterns.class_report_row.captures(line) else {
            return;
        };
        let Some(label) = captures.name("label").map(|value| value.as_str()) else {
            return;
        };

        for (group, prefix) in [
            ("precision", "precision_class_"),
            ("recall", "recall_class_"),
            ("f1", "f1_class_"),
        ] {
            let value = captures
                .name(group)
                .and_then(|value| value.as_str().parse::<f64>().ok());
            if let Some(value) = value {
                record
                    .metrics
                    .insert(format!("{prefix}{label}"), MetricValue::Number(value));
            }
        }
    }

    fn finish(mut self) -> Vec<EvaluationRecord> {
        match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Idle => {}
            ScanState::InRecord(record) => self.records.push(record),
            ScanState::InConfusion { mut record, rows } => {
                attach_matrix(&mut record, rows);
                self.records.push(record);
            }
        }

        self.records
    }
}

fn model_name(line: &str) -> Option<&str> {
    line.strip_prefix(MODEL_MARKER).map(str::trim)
}

fn attach_matrix(record: &mut EvaluationRecord, rows: Vec<Vec<i64>>) {
    if rows.is_empty() {
        return;
    }

    record
        .metrics
        .insert(CONFUSION_MATRIX_KEY.to_string(), MetricValue::Matrix(rows));
}

/// Bracket- or whitespace-delimited integers; `0.7` is not an integer.
fn integer_tokens(line: &str) -> Vec<i64> {
    line.split(|ch: char| ch.is_whitespace() || matches!(ch, '[' | ']' | ','))
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<i64>().ok())
        .collect()
}

fn parse_roc_auc(line: &str) -> MetricValue {
    let raw = line
        .split_once(':')
        .map(|(_, value)| value)
        .unwrap_or_else(|| &line[ROC_AUC_MARKER.len()..])
        .trim();

    match raw.parse::<f64>() {
        Ok(value) => MetricValue::Number(value),
        Err(_) => MetricValue::Raw(raw.to_string()),
    }
}

/// Second token as a float, else the last token with a decimal point that
/// parses.
fn parse_accuracy(line: &str) -> Option<f64> {
    let tokens = line.split_whitespace().collect::<Vec<&str>>();

    if let Some(value) = tokens.get(1).and_then(|token| token.parse::<f64>().ok()) {
        return Some(value);
    }

    tokens
        .iter()
        .rev()
        .filter(|token| token.contains('.'))
        .find_map(|token| token.parse::<f64>().ok())
}
