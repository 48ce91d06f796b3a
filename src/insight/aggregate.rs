use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::ReportType;
use crate::notebook::{ParsedNotebook, source_line_count};

use super::bullets::BulletParser;
use super::catalog::{CodeScanner, canonical_library, library_citation, model_label};
use super::evaluation::{ACCURACY_KEY, EvaluationPatterns, EvaluationRecord};
use super::outline::{CONTEXT_TITLE, Section, build_outline, find_section, find_sections};
use super::patterns::PatternSet;

/// Target column of the credit-default dataset the missing-value and
/// correlation heuristics were written against.
pub const DEFAULT_TARGET_COLUMN: &str = "default.payment.next.month";

const MAX_OUTLINE_SECTIONS: usize = 12;
const MAX_OBJECTIVES: usize = 6;
const MAX_SUMMARY_POINTS: usize = 8;
const MAX_EDA_INSIGHTS: usize = 10;
const MAX_PREPROCESSING_STEPS: usize = 8;
const MAX_MODELS: usize = 8;
const MAX_MODEL_NOTES: usize = 8;
const MAX_EVALUATION_RECORDS: usize = 12;
const MAX_TUNING_NOTES: usize = 6;
const MAX_KEY_METRICS: usize = 10;
const MAX_EXCERPT_CHARS: usize = 800;

const HIGH_COMPLEXITY_LINES: usize = 500;
const HIGH_COMPLEXITY_FUNCTIONS: usize = 10;
const MEDIUM_COMPLEXITY_LINES: usize = 200;
const MEDIUM_COMPLEXITY_FUNCTIONS: usize = 5;

const DESCRIPTION_KEYWORDS: &[&str] = &["project", "overview", "description", "goal"];
const OBJECTIVE_KEYWORDS: &[&str] = &["objective", "aim", "purpose"];
const OBJECTIVE_TITLES: &[&str] = &["objective", "goal", "aim", "purpose", "problem statement"];
const DATASET_TITLES: &[&str] = &["dataset", "data set"];
const DATA_TITLES: &[&str] = &["data"];
const EDA_TITLES: &[&str] = &["exploratory", "eda", "visuali", "analysis"];
const PREPROCESSING_TITLES: &[&str] = &[
    "preprocess",
    "cleaning",
    "preparation",
    "feature engineering",
];
const MODELING_TITLES: &[&str] = &["model", "training", "algorithm"];
const NON_MODELING_TITLES: &[&str] = &["evaluat", "tuning", "hyperparameter"];
const TUNING_TITLES: &[&str] = &["tuning", "hyperparameter", "optimiz", "grid search"];
const METRIC_KEYWORDS: &[&str] = &[
    "accuracy",
    "precision",
    "recall",
    "f1",
    "score",
    "mse",
    "mae",
    "r2",
];
const PROCESSING_KEYWORDS: &[&str] = &["load", "read", "process", "transform", "clean"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub report_type: ReportType,
    pub target_column: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            report_type: ReportType::default(),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn assess(total_code_lines: usize, function_count: usize) -> Self {
        if total_code_lines > HIGH_COMPLEXITY_LINES || function_count > HIGH_COMPLEXITY_FUNCTIONS {
            ComplexityLevel::High
        } else if total_code_lines > MEDIUM_COMPLEXITY_LINES
            || function_count > MEDIUM_COMPLEXITY_FUNCTIONS
        {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComplexityLevel::Low => "Low",
            ComplexityLevel::Medium => "Medium",
            ComplexityLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    pub title: String,
    pub description: String,
    pub objectives: Vec<String>,
    pub libraries_used: Vec<String>,
    pub library_references: Vec<String>,
    pub kernel: String,
    pub language: String,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalAnalysis {
    pub total_code_lines: usize,
    pub function_count: usize,
    pub code_cells_count: usize,
    pub algorithms_identified: Vec<String>,
    pub data_processing_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAnalysis {
    pub data_sources: Vec<String>,
    pub transformations: Vec<String>,
    pub estimated_dataset_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsSummary {
    pub total_outputs: usize,
    pub text_outputs: usize,
    pub visualizations: usize,
    pub tables: usize,
    pub errors: usize,
    pub key_metrics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInsight {
    pub title: String,
    pub summary_points: Vec<String>,
    pub shape: Option<(u64, u64)>,
    pub feature_count: Option<u64>,
    pub missing_values_note: Option<String>,
    pub source_url: Option<String>,
    pub raw_excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelingDetails {
    pub models: Vec<String>,
    pub notes: Vec<String>,
    pub best_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningSummary {
    pub performed: bool,
    pub notes: Vec<String>,
    pub best_params: Option<String>,
    pub best_score: Option<f64>,
}

/// Everything downstream report stages receive about one notebook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisContext {
    pub project_info: ProjectInfo,
    pub technical_analysis: TechnicalAnalysis,
    pub data_analysis: DataAnalysis,
    pub results_summary: ResultsSummary,
    pub section_outline: Vec<Section>,
    pub objective_points: Vec<String>,
    pub dataset_insights: DatasetInsight,
    pub eda_insights: Vec<String>,
    pub preprocessing_steps: Vec<String>,
    pub modeling_details: ModelingDetails,
    pub evaluation_metrics: Vec<EvaluationRecord>,
    pub tuning_summary: TuningSummary,
    pub complexity_level: ComplexityLevel,
    pub key_findings: Vec<String>,
    pub report_type: ReportType,
}

/// Builds an [`AnalysisContext`] from a parsed notebook.
///
/// Construction compiles the recognizers once; [`InsightExtractor::extract`]
/// itself never fails and keeps no state between calls.
#[derive(Debug)]
pub struct InsightExtractor {
    patterns: PatternSet,
    evaluation: EvaluationPatterns,
    bullets: BulletParser,
    code: CodeScanner,
    options: ExtractOptions,
}

impl InsightExtractor {
    pub fn new(options: ExtractOptions) -> Result<Self> {
        Ok(Self {
            patterns: PatternSet::new()?,
            evaluation: EvaluationPatterns::new()?,
            bullets: BulletParser::new()?,
            code: CodeScanner::new()?,
            options,
        })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn extract(&self, notebook: &ParsedNotebook) -> AnalysisContext {
        let markdown = notebook.markdown_sources();
        let sections = build_outline(&markdown);
        let text_outputs = notebook.outputs.text.as_slice();
        let code = notebook
            .code_cells
            .iter()
            .map(|cell| cell.source.as_str())
            .collect::<Vec<&str>>()
            .join("\n");

        let project_info = project_info(notebook, &sections);
        let technical_analysis = self.technical_analysis(notebook, &code);
        let dataset_insights = self.dataset_insights(&sections, &markdown, text_outputs);
        let data_analysis = data_analysis(notebook, &code, dataset_insights.shape);
        let results_summary = results_summary(notebook);

        let mut evaluation_metrics = self.evaluation.parse(&text_outputs.join("\n"));
        evaluation_metrics.truncate(MAX_EVALUATION_RECORDS);

        let complexity_level = ComplexityLevel::assess(
            technical_analysis.total_code_lines,
            technical_analysis.function_count,
        );
        let key_findings = key_findings(&results_summary, &evaluation_metrics);

        let context = AnalysisContext {
            objective_points: self.objective_points(&sections),
            eda_insights: self.eda_insights(&sections, text_outputs),
            preprocessing_steps: self.preprocessing_steps(&sections, &code),
            modeling_details: self.modeling_details(&sections, &code, &evaluation_metrics),
            tuning_summary: self.tuning_summary(&sections, &code, text_outputs),
            section_outline: sections.into_iter().take(MAX_OUTLINE_SECTIONS).collect(),
            project_info,
            technical_analysis,
            data_analysis,
            results_summary,
            dataset_insights,
            evaluation_metrics,
            complexity_level,
            key_findings,
            report_type: self.options.report_type,
        };

        debug!(
            sections = context.section_outline.len(),
            evaluation_records = context.evaluation_metrics.len(),
            eda_insights = context.eda_insights.len(),
            complexity = context.complexity_level.as_str(),
            "extracted analysis context"
        );

        context
    }

    fn dataset_insights(
        &self,
        sections: &[Section],
        markdown: &[&str],
        text_outputs: &[String],
    ) -> DatasetInsight {
        let section =
            find_section(sections, DATASET_TITLES).or_else(|| find_section(sections, DATA_TITLES));

        let mut summary_points = section
            .map(|section| self.bullets.statements_or_lines(&section.content))
            .unwrap_or_default();
        summary_points.truncate(MAX_SUMMARY_POINTS);

        DatasetInsight {
            title: section
                .map(|section| section.title.clone())
                .unwrap_or_else(|| "Dataset".to_string()),
            summary_points,
            shape: self.patterns.dataset_shape(text_outputs),
            feature_count: self.patterns.feature_count(text_outputs),
            missing_values_note: self
                .patterns
                .missing_values_note(text_outputs, &self.options.target_column),
            source_url: self.patterns.first_url(markdown),
            raw_excerpt: section
                .map(|section| truncate_chars(&section.content, MAX_EXCERPT_CHARS))
                .unwrap_or_default(),
        }
    }

    fn eda_insights(&self, sections: &[Section], text_outputs: &[String]) -> Vec<String> {
        let mut insights = Vec::<String>::new();

        if let Some(skewness) = self.patterns.skewness(text_outputs) {
            insights.push(skewness.summary);
        }
        if let Some(correlation) = self
            .patterns
            .correlation(text_outputs, &self.options.target_column)
        {
            insights.extend(correlation.sentences);
        }
        for section in find_sections(sections, EDA_TITLES) {
            insights.extend(self.bullets.statements_or_lines(&section.content));
        }

        dedup_capped(insights, MAX_EDA_INSIGHTS)
    }

    fn technical_analysis(&self, notebook: &ParsedNotebook, code: &str) -> TechnicalAnalysis {
        let mut algorithms_identified = self
            .code
            .detect_models(code)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<String>>();
        algorithms_identified.truncate(MAX_MODELS);

        TechnicalAnalysis {
            total_code_lines: notebook
                .code_cells
                .iter()
                .map(|cell| source_line_count(&cell.source))
                .sum(),
            function_count: notebook.functions.len(),
            code_cells_count: notebook.code_cells.len(),
            algorithms_identified,
            data_processing_steps: notebook
                .code_cells
                .iter()
                .filter(|cell| {
                    let source = cell.source.to_lowercase();
                    PROCESSING_KEYWORDS
                        .iter()
                        .any(|keyword| source.contains(keyword))
                })
                .count(),
        }
    }

    fn objective_points(&self, sections: &[Section]) -> Vec<String> {
        let mut points = find_section(sections, OBJECTIVE_TITLES)
            .map(|section| self.bullets.statements_or_lines(&section.content))
            .unwrap_or_default();
        points.truncate(MAX_OBJECTIVES);
        points
    }

    fn preprocessing_steps(&self, sections: &[Section], code: &str) -> Vec<String> {
        let mut steps = find_sections(sections, PREPROCESSING_TITLES)
            .into_iter()
            .flat_map(|section| self.bullets.statements_or_lines(&section.content))
            .collect::<Vec<String>>();
        steps.extend(
            self.code
                .detect_preprocessing(code)
                .into_iter()
                .map(ToOwned::to_owned),
        );

        dedup_capped(steps, MAX_PREPROCESSING_STEPS)
    }

    fn modeling_details(
        &self,
        sections: &[Section],
        code: &str,
        records: &[EvaluationRecord],
    ) -> ModelingDetails {
        let mut models = records
            .iter()
            .map(|record| {
                model_label(&record.name)
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| record.name.clone())
            })
            .filter(|name| !name.is_empty())
            .collect::<Vec<String>>();
        models.extend(
            self.code
                .detect_models(code)
                .into_iter()
                .map(ToOwned::to_owned),
        );

        let notes = find_sections(sections, MODELING_TITLES)
            .into_iter()
            .filter(|section| {
                let title = section.title.to_lowercase();
                !NON_MODELING_TITLES
                    .iter()
                    .any(|keyword| title.contains(keyword))
            })
            .flat_map(|section| self.bullets.statements_or_lines(&section.content))
            .collect::<Vec<String>>();

        let best_model = records
            .iter()
            .filter_map(|record| record.number(ACCURACY_KEY).map(|value| (record, value)))
            .fold(None::<(&EvaluationRecord, f64)>, |best, candidate| match best {
                Some((_, best_value)) if best_value >= candidate.1 => best,
                _ => Some(candidate),
            })
            .map(|(record, value)| format!("{} (accuracy {value:.3})", record.name));

        ModelingDetails {
            models: dedup_capped(models, MAX_MODELS),
            notes: dedup_capped(notes, MAX_MODEL_NOTES),
            best_model,
        }
    }

    fn tuning_summary(
        &self,
        sections: &[Section],
        code: &str,
        text_outputs: &[String],
    ) -> TuningSummary {
        let section = find_section(sections, TUNING_TITLES);
        let mut notes = section
            .map(|section| self.bullets.statements_or_lines(&section.content))
            .unwrap_or_default();
        notes.truncate(MAX_TUNING_NOTES);

        let lines = move || text_outputs.iter().flat_map(|output| output.lines());
        let best_params = lines()
            .find_map(|line| labelled_value(line, &["best param"]))
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        let best_score = lines()
            .filter_map(|line| {
                labelled_value(line, &["best score", "best cross-validation score"])
            })
            .find_map(|value| value.parse::<f64>().ok());

        TuningSummary {
            performed: section.is_some() || self.code.detect_tuning(code) || best_params.is_some(),
            notes,
            best_params,
            best_score,
        }
    }
}

fn project_info(notebook: &ParsedNotebook, sections: &[Section]) -> ProjectInfo {
    let title = sections
        .iter()
        .find(|section| section.level == 1 && section.title != CONTEXT_TITLE)
        .map(|section| section.title.clone())
        .or_else(|| Some(notebook.metadata.title.clone()).filter(|title| !title.is_empty()))
        .unwrap_or_else(|| "Untitled Notebook".to_string());

    let description = sections
        .iter()
        .find(|section| section_mentions(section, DESCRIPTION_KEYWORDS))
        .map(|section| section.content.clone())
        .unwrap_or_default();

    let objectives = sections
        .iter()
        .filter(|section| section_mentions(section, OBJECTIVE_KEYWORDS))
        .map(|section| section.content.clone())
        .filter(|content| !content.is_empty())
        .take(MAX_OBJECTIVES)
        .collect();

    let libraries_used = notebook
        .imports
        .iter()
        .filter_map(|import| canonical_library(import))
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect::<Vec<String>>();
    let library_references = libraries_used
        .iter()
        .filter_map(|library| library_citation(library))
        .map(|citation| citation.reference())
        .collect();

    ProjectInfo {
        title,
        description,
        objectives,
        libraries_used,
        library_references,
        kernel: notebook.metadata.kernel.clone(),
        language: notebook.metadata.language.clone(),
        authors: notebook.metadata.authors.clone(),
    }
}


fn data_analysis(notebook: &ParsedNotebook, code: &str, shape: Option<(u64, u64)>) -> DataAnalysis {
    let code = code.to_lowercase();
    let mut data_sources = BTreeSet::<&str>::new();
    if code.contains("pd.read_csv") || code.contains("pd.read_excel") {
        data_sources.insert("CSV/Excel file");
    }
    if code.contains("pd.read_sql") || code.contains("sql") {
        data_sources.insert("Database");
    }
    if code.contains("requests.get") || code.contains("urllib") {
        data_sources.insert("Web API");
    }

    let imports = notebook.imports.join("\n");
    let mut transformations = Vec::<String>::new();
    if imports.contains("sklearn") {
        transformations.push("Machine Learning preprocessing".to_string());
    }
    if imports.contains("pandas") {
        transformations.push("Data manipulation".to_string());
    }

    DataAnalysis {
        data_sources: data_sources.into_iter().map(ToOwned::to_owned).collect(),
        transformations,
        estimated_dataset_size: shape
            .map(|(rows, columns)| format!("{rows} rows x {columns} columns"))
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

fn results_summary(notebook: &ParsedNotebook) -> ResultsSummary {
    let outputs = &notebook.outputs;
    let key_metrics = outputs
        .text
        .iter()
        .filter(|output| {
            let lower = output.to_lowercase();
            METRIC_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .map(|output| truncate_chars(output.trim(), MAX_EXCERPT_CHARS))
        .filter(|output| !output.is_empty())
        .take(MAX_KEY_METRICS)
        .collect();

    ResultsSummary {
        total_outputs: outputs.text.len() + outputs.plots.len() + outputs.tables.len(),
        text_outputs: outputs.text.len(),
        visualizations: outputs.plots.len(),
        tables: outputs.tables.len(),
        errors: outputs.errors.len(),
        key_metrics,
    }
}





fn key_findings(results: &ResultsSummary, records: &[EvaluationRecord]) -> Vec<String> {
    let mut findings = Vec::<String>::new();

    if results.visualizations > 0 {
        findings.push(format!("Generated {} visualizations", results.visualizations));
    }
    if !results.key_metrics.is_empty() || !records.is_empty() {
        findings.push("Performance metrics calculated".to_string());
    }
    if results.errors > 0 {
        findings.push(format!(
            "Encountered {} errors during execution",
            results.errors
        ));
    }

    findings
}

/// Value after the first `:` of a line whose lowercase form starts with one
/// of `labels`.
fn labelled_value<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    let trimmed = line.trim();
    let lower = trimmed.to_lowercase();
    if !labels.iter().any(|label| lower.starts_with(label)) {
        return None;
    }

    trimmed.split_once(':').map(|(_, value)| value.trim())
}

fn section_mentions(section: &Section, keywords: &[&str]) -> bool {
    let title = section.title.to_lowercase();
    let content = section.content.to_lowercase();
    keywords
        .iter()
        .any(|keyword| title.contains(keyword) || content.contains(keyword))
}

fn dedup_capped(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = BTreeSet::<String>::new();
    items
        .into_iter()
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .take(cap)
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
