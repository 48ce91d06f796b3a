use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::inventory::INVENTORY_MANIFEST_NAME;
use crate::model::{AnalyzeRunManifest, NotebookInventoryManifest};
use crate::util::read_json;

const ANALYZE_MANIFEST_PREFIX: &str = "analyze_run_";

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let inventory_path = manifest_dir.join(INVENTORY_MANIFEST_NAME);

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: NotebookInventoryManifest = read_json(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            source = %inventory.source_directory,
            notebook_count = inventory.notebook_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_analyze_manifest(&manifest_dir)? {
        Some(path) => {
            let manifest: AnalyzeRunManifest = read_json(&path)?;
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                report_type = %manifest.report_type,
                analyzed = manifest.counts.analyzed_count,
                failed = manifest.counts.failed_count,
                output_dir = %manifest.paths.output_dir,
                "loaded analyze run manifest"
            );
            for warning in &manifest.warnings {
                warn!(warning = %warning, "analyze run warning");
            }
        }
        None => warn!(path = %manifest_dir.display(), "no analyze run manifest found"),
    }

    Ok(())
}

/// Run manifests carry a compact UTC timestamp, so the lexically greatest
/// name is the most recent run.
fn latest_analyze_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();

        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(ANALYZE_MANIFEST_PREFIX) && name.ends_with(".json"))
            .unwrap_or(false);

        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
