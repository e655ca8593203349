use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::ModuleHandlers;

use super::ScanEntry;

/// What to do when a scan entry has no analysis record on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Fail the whole correlation run.
    #[default]
    Fail,
    /// Log and drop the entry from the output.
    Skip,
}

#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("No analysis record for module '{name}' at {path}: {source}")]
    MissingAnalysis {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Joins scan entries with their per-module analysis records.
///
/// For each entry the record `{guid}_{name}.json` is looked up in the
/// analysis directory, using the entry's raw report fields so the derived
/// file name matches what the analysis tooling produced from the artifact
/// name.
pub struct Correlator {
    analysis_dir: PathBuf,
    missing: MissingPolicy,
}

impl Correlator {
    pub fn new(analysis_dir: impl Into<PathBuf>) -> Self {
        Self {
            analysis_dir: analysis_dir.into(),
            missing: MissingPolicy::Fail,
        }
    }

    pub fn with_missing_policy(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    pub fn analysis_dir(&self) -> &Path {
        &self.analysis_dir
    }

    /// Analysis-record file name for a scan entry: `{guid}_{name}.json`.
    pub fn analysis_file_name(entry: &ScanEntry) -> String {
        format!("{}_{}.json", entry.guid, entry.name)
    }

    /// Correlate entries in report order.
    ///
    /// Under [`MissingPolicy::Fail`] the first entry whose record is missing
    /// or unreadable aborts the run; under [`MissingPolicy::Skip`] such
    /// entries are logged and omitted from the output.
    pub fn correlate(&self, entries: &[ScanEntry]) -> Result<Vec<ModuleHandlers>, CorrelateError> {
        let mut modules = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = self.analysis_dir.join(Self::analysis_file_name(entry));
            let body = match fs::read_to_string(&path) {
                Ok(body) => body,
                Err(source) => match self.missing {
                    MissingPolicy::Fail => {
                        return Err(CorrelateError::MissingAnalysis {
                            name: entry.name.clone(),
                            path,
                            source,
                        })
                    }
                    MissingPolicy::Skip => {
                        log::warn!(
                            "skipping module '{}': no analysis record at {}",
                            entry.name,
                            path.display()
                        );
                        continue;
                    }
                },
            };
            modules.push(ModuleHandlers {
                name: entry.name.clone(),
                guid: entry.guid.clone(),
                type_label: entry.type_label.clone(),
                handlers: collect_handler_names(&body),
            });
        }
        Ok(modules)
    }
}

/// Pull handler names out of an analysis record body.
///
/// A line mentions a handler when it contains `handler` in any case. From
/// each such line the text before the first `:` (the whole line when there is
/// none) is taken with every `"` and `,` deleted; no other cleanup happens.
/// Order and repeats are preserved exactly as they appear in the record.
pub fn collect_handler_names(body: &str) -> Vec<String> {
    let mut handlers = Vec::new();
    for line in body.lines() {
        if !line.to_lowercase().contains("handler") {
            continue;
        }
        let lead = match line.split_once(':') {
            Some((lead, _)) => lead,
            None => line,
        };
        handlers.push(lead.replace('"', "").replace(',', ""));
    }
    handlers
}
