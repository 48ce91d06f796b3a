use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{NotebookEntry, NotebookInventoryManifest};
use crate::notebook::load_notebook;
use crate::util::{discover_notebooks, now_utc_string, write_json_pretty};

pub const INVENTORY_MANIFEST_NAME: &str = "notebook_inventory.json";

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.notebook_root)?;

    if args.dry_run {
        info!(
            notebook_count = manifest.notebook_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join(INVENTORY_MANIFEST_NAME)
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(notebook_count = manifest.notebook_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(notebook_root: &Path) -> Result<NotebookInventoryManifest> {
    let notebook_paths = discover_notebooks(notebook_root)?;

    if notebook_paths.is_empty() {
        bail!("no notebooks found in {}", notebook_root.display());
    }

    let mut notebooks = Vec::with_capacity(notebook_paths.len());
    for path in notebook_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let loaded = load_notebook(&path)?;

        notebooks.push(NotebookEntry {
            filename,
            cell_count: loaded.notebook.statistics().total_cells,
            sha256: loaded.sha256,
        });
    }

    notebooks.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(NotebookInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: notebook_root.display().to_string(),
        notebook_count: notebooks.len(),
        notebooks,
    })
}
