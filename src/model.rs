use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookEntry {
    pub filename: String,
    pub cell_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub notebook_count: usize,
    pub notebooks: Vec<NotebookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzePaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeCounts {
    pub notebook_count: usize,
    pub analyzed_count: usize,
    pub failed_count: usize,
    pub sections_total: usize,
    pub evaluation_records_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedNotebook {
    pub source: String,
    pub sha256: String,
    pub context_path: String,
    pub section_count: usize,
    pub evaluation_record_count: usize,
    pub complexity_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub report_type: String,
    pub target_column: String,
    pub paths: AnalyzePaths,
    pub counts: AnalyzeCounts,
    pub notebooks: Vec<AnalyzedNotebook>,
    pub warnings: Vec<String>,
}
