//! Firmware volume access: loading images, building module trees through a
//! pluggable source, and walking the trees.
//!
//! Decoding the volume format itself is out of scope for this crate. A
//! [`TreeSource`] produces the fully materialized [`ModuleNode`] tree, either
//! by shelling out to an external decoder ([`ExternalTreeSource`]) or by
//! reading a pre-dumped tree manifest ([`ManifestTreeSource`]). Both speak the
//! JSON manifest format defined in [`manifest`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{ModuleNode, SectionType};

pub mod external;
pub mod manifest;

pub use external::{ExternalTreeSource, FV_TOOL_ENV};
pub use manifest::ManifestTreeSource;

/// A firmware image held in memory alongside the path it came from.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl FirmwareImage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| TreeError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, bytes })
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed module tree manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Unknown node kind '{kind}' in module tree manifest")]
    UnknownKind { kind: String },

    #[error("File node '{name}' in module tree manifest has no GUID")]
    MissingFileGuid { name: String },

    #[error("Invalid GUID '{value}' in module tree manifest: {source}")]
    Guid {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("Node '{name}' lies outside the image: offset {offset} + size {size} > {image_len}")]
    OutOfBounds {
        name: String,
        offset: u64,
        size: u64,
        image_len: usize,
    },

    #[error("Module tree nested deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("No firmware volume decoder configured; pass a tool path or set {FV_TOOL_ENV}")]
    ToolUnavailable,

    #[error("Firmware volume decoder failed: {0}")]
    Tool(String),
}

/// Produces the module tree of a firmware image.
///
/// Implementations return root nodes in image order, fully populated with
/// payload bytes and content hashes.
pub trait TreeSource: Send + Sync {
    fn build_tree(&self, image: &FirmwareImage) -> Result<Vec<ModuleNode>, TreeError>;

    /// Short stable name, recorded in run metadata.
    fn name(&self) -> &'static str;
}

/// Which nodes a tree walk should hand to its visitor.
///
/// The filter gates the visitor only; descent into children is controlled by
/// the recursion flag alone, so a `File` filter still reaches files nested
/// under sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFilter {
    File,
    Section,
    ExecutableSection,
    Any,
}

impl NodeFilter {
    pub fn matches(self, node: &ModuleNode) -> bool {
        match (self, node) {
            (NodeFilter::Any, _) => true,
            (NodeFilter::File, ModuleNode::File(_)) => true,
            (NodeFilter::Section, ModuleNode::Section(_)) => true,
            (NodeFilter::ExecutableSection, ModuleNode::Section(section)) => {
                SectionType::from_code(section.section_type)
                    .map(SectionType::is_executable)
                    .unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// Walk `nodes` in pre-order, calling `visit` on every node the filter
/// accepts. A visitor error aborts the walk immediately.
pub fn search_tree<E, F>(
    nodes: &[ModuleNode],
    filter: NodeFilter,
    recursive: bool,
    visit: &mut F,
) -> Result<(), E>
where
    F: FnMut(&ModuleNode) -> Result<(), E>,
{
    for node in nodes {
        if filter.matches(node) {
            visit(node)?;
        }
        if recursive {
            search_tree(node.children(), filter, recursive, visit)?;
        }
    }
    Ok(())
}

/// First node (pre-order, always recursive) the filter accepts.
pub fn find_first<'a>(nodes: &'a [ModuleNode], filter: NodeFilter) -> Option<&'a ModuleNode> {
    for node in nodes {
        if filter.matches(node) {
            return Some(node);
        }
        if let Some(found) = find_first(node.children(), filter) {
            return Some(found);
        }
    }
    None
}
