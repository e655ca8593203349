use std::path::PathBuf;

use anyhow::{Context, Result};

use survey_core::layout::SurveyLayout;
use survey_core::report::{
    read_scan_report, write_handler_report, Correlator, MissingPolicy,
};

use crate::canonicalize_or_current;

/// Join per-module analysis records onto a scan report and write the handler
/// report.
pub fn correlate_command(
    root: &str,
    analysis_dir: &str,
    scan_report: Option<&str>,
    out: Option<&str>,
    skip_missing: bool,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = SurveyLayout::new(&root_path);

    let report_path =
        scan_report.map(PathBuf::from).unwrap_or_else(|| layout.scan_report_path.clone());
    let out_path = out.map(PathBuf::from).unwrap_or_else(|| layout.handler_report_path.clone());

    let entries = read_scan_report(&report_path)
        .with_context(|| format!("Failed to read scan report at {}", report_path.display()))?;

    let policy = if skip_missing { MissingPolicy::Skip } else { MissingPolicy::Fail };
    let correlator = Correlator::new(analysis_dir).with_missing_policy(policy);
    let modules = correlator.correlate(&entries).context("Correlation failed")?;

    write_handler_report(&out_path, &modules).with_context(|| {
        format!("Failed to write handler report at {}", out_path.display())
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(());
    }

    println!("Correlated {} of {} modules", modules.len(), entries.len());
    for module in &modules {
        println!("  - {} {}: {} handler(s)", module.name, module.guid, module.handlers.len());
    }
    println!("Handler report: {}", out_path.display());

    Ok(())
}
