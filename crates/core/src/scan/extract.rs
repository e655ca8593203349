use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fv::{find_first, NodeFilter};
use crate::model::{FileNode, ModuleNode, SectionNode, SectionType};

/// Where (and whether) extracted sections are written.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub out_dir: PathBuf,
    pub enabled: bool,
}

impl ExtractConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to write extracted section to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing artifact name '{name}': contains a path separator or NUL")]
    UnsafeName { name: String },
}

/// Writes the executable section of classified modules to disk.
///
/// Output is deterministic: the artifact name is derived entirely from the
/// section's parent GUID and name, and the content from the section bytes, so
/// re-running a scan overwrites artifacts with identical content.
pub struct SectionExtractor {
    config: ExtractConfig,
}

impl SectionExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn out_dir(&self) -> &Path {
        &self.config.out_dir
    }

    /// Extract the first executable-code section found under `file`
    /// (pre-order), skipping its section header.
    ///
    /// Returns the path written, or `Ok(None)` when the file has no
    /// executable section. Callers decide whether extraction should run at
    /// all; this method always writes when it finds a section.
    pub fn extract_module(&self, file: &FileNode) -> Result<Option<PathBuf>, ExtractError> {
        let section = match find_first(&file.children, NodeFilter::ExecutableSection) {
            Some(ModuleNode::Section(section)) => section,
            _ => return Ok(None),
        };
        let artifact = artifact_file_name(section)?;
        let path = self.config.out_dir.join(&artifact);
        let body = section.data.get(section.header_size..).unwrap_or(&[]);
        fs::write(&path, body).map_err(|source| ExtractError::Io {
            path: path.clone(),
            source,
        })?;
        let kind = SectionType::from_code(section.section_type)
            .map(|t| t.label())
            .unwrap_or("section");
        log::debug!("wrote {} {} ({} bytes)", kind, path.display(), body.len());
        Ok(Some(path))
    }
}

/// Artifact file name for an extracted section: `{parentGuid}_{sectionName}`.
///
/// Names containing a path separator or NUL are refused rather than
/// sanitized, so an artifact on disk always corresponds byte-for-byte to its
/// section name.
pub fn artifact_file_name(section: &SectionNode) -> Result<String, ExtractError> {
    let name = format!("{}_{}", section.parent_guid, section.name);
    if name
        .bytes()
        .any(|b| b == b'/' || b == b'\\' || b == 0)
    {
        return Err(ExtractError::UnsafeName { name });
    }
    Ok(name)
}
