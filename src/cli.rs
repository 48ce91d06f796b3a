use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "nbinsight",
    version,
    about = "Extract structured analysis context from exploratory notebooks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Analyze(AnalyzeArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "notebooks")]
    pub notebook_root: PathBuf,

    #[arg(long, default_value = ".cache/nbinsight")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Notebook file, parsed-notebook JSON file, or directory of notebooks.
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    #[arg(long, default_value = ".cache/nbinsight")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long = "report-type", visible_alias = "type", value_enum)]
    pub report_type: Option<ReportType>,

    #[arg(long)]
    pub target_column: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/nbinsight")]
    pub cache_root: PathBuf,
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Academic,
    Internship,
    Industry,
    Research,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Internship => "internship",
            Self::Industry => "industry",
            Self::Research => "research",
        }
    }
}
