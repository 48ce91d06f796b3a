use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::AnalyzeArgs;
use crate::config::resolve_analyze_config;
use crate::insight::{AnalysisContext, InsightExtractor};
use crate::model::{AnalyzeCounts, AnalyzePaths, AnalyzeRunManifest, AnalyzedNotebook};
use crate::notebook::load_notebook;
use crate::util::{
    discover_notebooks, ensure_directory, file_stem_or, now_utc_string, utc_compact_string,
    write_json_pretty,
};

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let config = resolve_analyze_config(&args)?;
    let manifest_dir = args.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;
    ensure_directory(&config.output_dir)?;

    let inputs = resolve_inputs(&args.input)?;
    let extractor = InsightExtractor::new(config.options.clone())?;
    let options = extractor.options();

    info!(
        run_id = %run_id,
        input = %args.input.display(),
        notebooks = inputs.len(),
        report_type = options.report_type.as_str(),
        target_column = %options.target_column,
        "starting analyze"
    );

    let mut counts = AnalyzeCounts {
        notebook_count: inputs.len(),
        ..AnalyzeCounts::default()
    };
    let mut notebooks = Vec::with_capacity(inputs.len());
    let mut warnings = Vec::new();

    for path in &inputs {
        match analyze_notebook(&extractor, path, &config.output_dir) {
            Ok(entry) => {
                counts.analyzed_count += 1;
                counts.sections_total += entry.section_count;
                counts.evaluation_records_total += entry.evaluation_record_count;
                notebooks.push(entry);
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "notebook analysis failed"
                );
                counts.failed_count += 1;
                warnings.push(format!("{}: {err:#}", path.display()));
            }
        }
    }

    let status = if counts.analyzed_count == 0 {
        "failed"
    } else if counts.failed_count > 0 {
        "completed_with_warnings"
    } else {
        "completed"
    };

    let manifest_path = run_manifest_path(&manifest_dir, &utc_compact_string(started_ts));
    let manifest = AnalyzeRunManifest {
        manifest_version: 1,
        run_id,
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        report_type: options.report_type.as_str().to_string(),
        target_column: options.target_column.clone(),
        paths: AnalyzePaths {
            cache_root: args.cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            output_dir: config.output_dir.display().to_string(),
        },
        counts,
        notebooks,
        warnings,
    };

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote analyze run manifest");

    if manifest.counts.analyzed_count == 0 {
        bail!(
            "no notebooks could be analyzed from {}",
            args.input.display()
        );
    }

    info!(
        analyzed = manifest.counts.analyzed_count,
        failed = manifest.counts.failed_count,
        sections = manifest.counts.sections_total,
        evaluation_records = manifest.counts.evaluation_records_total,
        "analyze completed"
    );

    Ok(())
}

/// `analyze_run_<ts>.json`, or `analyze_run_<ts>_<n>.json` when an earlier
/// run in the same second already wrote that name.
fn run_manifest_path(manifest_dir: &Path, stamp: &str) -> PathBuf {
    let first = manifest_dir.join(format!("analyze_run_{stamp}.json"));
    if !first.exists() {
        return first;
    }

    (1..)
        .map(|attempt| manifest_dir.join(format!("analyze_run_{stamp}_{attempt}.json")))
        .find(|path| !path.exists())
        .unwrap_or(first)
}

/// A single file is analyzed as given; a directory contributes every
/// `.ipynb` directly inside it.
fn resolve_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let notebooks = discover_notebooks(input)?;
    if notebooks.is_empty() {
        bail!("no notebooks found in {}", input.display());
    }

    Ok(notebooks)
}

fn analyze_notebook(
    extractor: &InsightExtractor,
    path: &Path,
    output_dir: &Path,
) -> Result<AnalyzedNotebook> {
    let loaded = load_notebook(path)?;
    let stats = loaded.notebook.statistics();
    info!(
        path = %path.display(),
        format = loaded.format.as_str(),
        cells = stats.total_cells,
        code_lines = stats.total_code_lines,
        "loaded notebook"
    );

    let context = extractor.extract(&loaded.notebook);
    let context_path = output_dir.join(format!(
        "{}.context.json",
        file_stem_or(path, "notebook")
    ));
    write_json_pretty(&context_path, &context)?;

    let entry = summarize(path, &loaded.sha256, &context_path, &context);
    info!(
        path = %context_path.display(),
        sections = entry.section_count,
        evaluation_records = entry.evaluation_record_count,
        complexity = %entry.complexity_level,
        "wrote analysis context"
    );

    Ok(entry)
}

fn summarize(
    source: &Path,
    sha256: &str,
    context_path: &Path,
    context: &AnalysisContext,
) -> AnalyzedNotebook {
    AnalyzedNotebook {
        source: source.display().to_string(),
        sha256: sha256.to_string(),
        context_path: context_path.display().to_string(),
        section_count: context.section_outline.len(),
        evaluation_record_count: context.evaluation_metrics.len(),
        complexity_level: context.complexity_level.as_str().to_string(),
    }
}
