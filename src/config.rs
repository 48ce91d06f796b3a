use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::cli::{AnalyzeArgs, ReportType};
use crate::insight::{DEFAULT_TARGET_COLUMN, ExtractOptions};

/// Optional YAML file layered under the command-line flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub report_type: Option<ReportType>,
    pub target_column: Option<String>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub options: ExtractOptions,
    pub output_dir: PathBuf,
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

pub fn resolve_analyze_config(args: &AnalyzeArgs) -> Result<AnalyzeConfig> {
    let file = match args.config.as_deref() {
        Some(path) => {
            let file = load_file_config(path)?;
            info!(path = %path.display(), "loaded config file");
            file
        }
        None => FileConfig::default(),
    };

    Ok(merge(args, file))
}

fn merge(args: &AnalyzeArgs, file: FileConfig) -> AnalyzeConfig {
    let report_type = args.report_type.or(file.report_type).unwrap_or_default();
    let target_column = args
        .target_column
        .clone()
        .or(file.target_column)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET_COLUMN.to_string());
    let output_dir = args
        .output_dir
        .clone()
        .or(file.output_dir)
        .unwrap_or_else(|| args.cache_root.join("contexts"));

    AnalyzeConfig {
        options: ExtractOptions {
            report_type,
            target_column,
        },
        output_dir,
    }
}
