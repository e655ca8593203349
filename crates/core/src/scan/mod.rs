//! Classification of management-mode modules and extraction of their
//! executable sections.
//!
//! A [`ModuleScanner`] walks a module tree, records every File-kind node
//! whose type code is in the configured [`TargetTypes`], and extracts each
//! match's executable section as it is found, so a scan interrupted by an
//! extraction failure still leaves the artifacts of all earlier matches on
//! disk.

use std::path::PathBuf;

use crate::fv::{search_tree, NodeFilter};
use crate::model::{FileNode, MatchedModule, ModuleNode, ModuleType};

mod extract;

pub use extract::{artifact_file_name, ExtractConfig, ExtractError, SectionExtractor};

/// The set of module types a scan classifies.
#[derive(Debug, Clone)]
pub struct TargetTypes(Vec<ModuleType>);

impl TargetTypes {
    pub fn new(types: Vec<ModuleType>) -> Self {
        Self(types)
    }

    /// The management-mode family: standalone MM, combined MM/DXE, MM,
    /// MM core, and standalone MM core.
    pub fn default_mm() -> Self {
        Self(vec![
            ModuleType::MmStandalone,
            ModuleType::CombinedMmDxe,
            ModuleType::Mm,
            ModuleType::MmCore,
            ModuleType::MmCoreStandalone,
        ])
    }

    pub fn types(&self) -> &[ModuleType] {
        &self.0
    }

    /// The target matching a raw file type code, if any.
    pub fn match_code(&self, code: u8) -> Option<ModuleType> {
        self.0.iter().copied().find(|t| t.code() == code)
    }
}

/// Outcome of one scan, in tree order.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Every classified module, including repeats of the same identity.
    pub matches: Vec<MatchedModule>,
    /// Artifact paths written by extraction.
    pub extracted: Vec<PathBuf>,
    /// Second and later sightings of a (GUID, name) identity.
    pub duplicates: Vec<MatchedModule>,
}

/// Walks module trees and classifies management-mode modules.
pub struct ModuleScanner {
    targets: TargetTypes,
    extractor: SectionExtractor,
}

impl ModuleScanner {
    pub fn new(targets: TargetTypes, extract: ExtractConfig) -> Self {
        Self {
            targets,
            extractor: SectionExtractor::new(extract),
        }
    }

    pub fn targets(&self) -> &TargetTypes {
        &self.targets
    }

    /// Scan `roots` for target-typed files.
    ///
    /// Matches are recorded in pre-order, and when extraction is enabled each
    /// match's executable section is written before the walk moves on. Only
    /// File-kind nodes classify; a section whose type code collides with a
    /// file type code never matches.
    pub fn scan(&self, roots: &[ModuleNode]) -> Result<ScanSummary, ExtractError> {
        let mut summary = ScanSummary::default();
        search_tree(roots, NodeFilter::File, true, &mut |node| match node {
            ModuleNode::File(file) => self.record_match(file, &mut summary),
            ModuleNode::Section(_) => Ok(()),
        })?;
        Ok(summary)
    }

    fn record_match(&self, file: &FileNode, summary: &mut ScanSummary) -> Result<(), ExtractError> {
        let matched = match self.targets.match_code(file.file_type) {
            Some(matched) => matched,
            None => return Ok(()),
        };
        let record = MatchedModule {
            name: file.name.clone(),
            guid: file.guid,
            type_label: matched.label().to_string(),
            hash: file.hash.clone(),
        };
        log::debug!("matched {} {} as {}", record.name, record.guid, record.type_label);
        if summary
            .matches
            .iter()
            .any(|m| m.guid == record.guid && m.name == record.name)
        {
            log::warn!("duplicate module {} {} in image", record.name, record.guid);
            summary.duplicates.push(record.clone());
        }
        if self.extractor.is_enabled() {
            if let Some(path) = self.extractor.extract_module(file)? {
                summary.extracted.push(path);
            }
        }
        summary.matches.push(record);
        Ok(())
    }
}
