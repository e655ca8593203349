use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use survey_core::fv::{ExternalTreeSource, FirmwareImage, ManifestTreeSource, TreeSource};
use survey_core::layout::SurveyLayout;
use survey_core::model::sha256_hex;
use survey_core::report::write_scan_report;
use survey_core::scan::{ExtractConfig, ModuleScanner};

use crate::canonicalize_or_current;
use crate::commands::{load_scan_profile, resolve_target_types, ScanProfile};

/// Inputs of the `scan` subcommand.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub image: String,
    pub root: String,
    pub manifest: Option<String>,
    pub tool: Option<String>,
    pub profile: Option<String>,
    pub types: Option<String>,
    pub no_extract: bool,
    pub json: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanRunMetadata {
    pub image: String,
    pub image_hash: String,
    pub source: String,
    pub target_types: Vec<String>,
    pub extract: bool,
    pub module_count: usize,
    pub extracted_count: usize,
    pub duplicate_count: usize,
    pub started_at: String,
    pub finished_at: String,
}

/// Scan a firmware image for target-typed modules, extract their executable
/// sections, and write the scan report plus run metadata under the root.
pub fn scan_command(opts: &ScanOptions) -> Result<()> {
    let root_path = canonicalize_or_current(&opts.root)?;
    let layout = SurveyLayout::new(&root_path);

    let started_at = Utc::now().to_rfc3339();

    let image = FirmwareImage::load(Path::new(&opts.image))
        .with_context(|| format!("Failed to read firmware image {}", opts.image))?;

    // Load scan profile if given (CLI --types still wins over it).
    let profile: Option<ScanProfile> = match &opts.profile {
        Some(path) => Some(load_scan_profile(Path::new(path))?),
        None => None,
    };
    let targets = resolve_target_types(opts.types.as_deref(), profile.as_ref())?;
    let extract = !opts.no_extract && profile.as_ref().map(|p| p.extract).unwrap_or(true);

    // Ensure output directories exist.
    fs::create_dir_all(&layout.modules_dir).with_context(|| {
        format!("Failed to create modules dir: {}", layout.modules_dir.display())
    })?;

    let source: Box<dyn TreeSource> = match &opts.manifest {
        Some(manifest) => Box::new(ManifestTreeSource::new(manifest)),
        None => Box::new(ExternalTreeSource::new(opts.tool.as_ref().map(PathBuf::from))),
    };
    log::info!(
        "building module tree for {} via '{}' source",
        image.path.display(),
        source.name()
    );
    let tree = source
        .build_tree(&image)
        .with_context(|| format!("Failed to build module tree for {}", image.path.display()))?;

    let scanner =
        ModuleScanner::new(targets, ExtractConfig::new(&layout.modules_dir).with_enabled(extract));
    let summary = scanner.scan(&tree).context("Module scan failed")?;

    write_scan_report(&layout.scan_report_path, &summary.matches).with_context(|| {
        format!("Failed to write scan report at {}", layout.scan_report_path.display())
    })?;

    let metadata = ScanRunMetadata {
        image: image.path.display().to_string(),
        image_hash: sha256_hex(&image.bytes),
        source: source.name().to_string(),
        target_types: scanner.targets().types().iter().map(|t| t.label().to_string()).collect(),
        extract,
        module_count: summary.matches.len(),
        extracted_count: summary.extracted.len(),
        duplicate_count: summary.duplicates.len(),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
    };
    fs::write(&layout.run_metadata_path, serde_json::to_string_pretty(&metadata)?).with_context(
        || format!("Failed to write run metadata at {}", layout.run_metadata_path.display()),
    )?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary.matches)?);
        return Ok(());
    }

    println!(
        "Found {} management-mode modules in {}",
        summary.matches.len(),
        image.path.display()
    );
    println!("  Scan report: {}", layout.scan_report_path.display());
    if extract {
        println!(
            "  Extracted {} sections to {}",
            summary.extracted.len(),
            layout.modules_dir.display()
        );
    } else {
        println!("  Extraction disabled; no sections written");
    }
    if !summary.duplicates.is_empty() {
        println!("  Duplicate modules: {}", summary.duplicates.len());
    }

    Ok(())
}
