//! JSON module-tree manifest: the wire format volume decoders emit.
//!
//! A manifest is an array of nodes. Each node names its kind (`file` or
//! `section`), its raw type code, and the `offset`/`size` of its content
//! within the image. Payload bytes are sliced out of the image here and
//! hashed locally; a manifest never carries hashes of its own.
//!
//! ```json
//! [
//!   {
//!     "kind": "file",
//!     "name": "MmCore",
//!     "guid": "8C8CE578-8A3D-4F1C-9935-896185C32DD3",
//!     "type": 13,
//!     "offset": 0,
//!     "size": 64,
//!     "children": [
//!       { "kind": "section", "name": "MmCore", "type": 16,
//!         "offset": 8, "size": 56, "header_size": 4 }
//!     ]
//!   }
//! ]
//! ```

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::model::{sha256_hex, FileNode, Guid, ModuleNode, SectionNode};

use super::{FirmwareImage, TreeError, TreeSource};

/// Depth bound on manifest nesting. Real volumes nest a handful of levels;
/// anything past this is a malformed or adversarial manifest.
pub const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct ManifestNode {
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(rename = "type")]
    pub type_code: u8,
    pub offset: u64,
    pub size: u64,
    #[serde(default)]
    pub header_size: u64,
    #[serde(default)]
    pub children: Vec<ManifestNode>,
}

pub fn parse_manifest(body: &str) -> Result<Vec<ManifestNode>, TreeError> {
    Ok(serde_json::from_str(body)?)
}

/// Materialize manifest nodes against the image bytes.
///
/// Slices every node's content out of `image` with bounds checking, computes
/// content hashes, and stamps each section with the GUID of its enclosing
/// file (nil for sections outside any file).
pub fn build_nodes(manifest: &[ManifestNode], image: &[u8]) -> Result<Vec<ModuleNode>, TreeError> {
    build_level(manifest, image, None, 0)
}

fn build_level(
    manifest: &[ManifestNode],
    image: &[u8],
    owner: Option<Guid>,
    depth: usize,
) -> Result<Vec<ModuleNode>, TreeError> {
    if depth > MAX_TREE_DEPTH {
        return Err(TreeError::TooDeep {
            max: MAX_TREE_DEPTH,
        });
    }
    let mut nodes = Vec::with_capacity(manifest.len());
    for entry in manifest {
        let data = slice_content(entry, image)?;
        match entry.kind.as_str() {
            "file" => {
                let raw = entry
                    .guid
                    .as_deref()
                    .ok_or_else(|| TreeError::MissingFileGuid {
                        name: entry.name.clone(),
                    })?;
                let guid = parse_guid(raw)?;
                let children = build_level(&entry.children, image, Some(guid), depth + 1)?;
                let file = FileNode::new(entry.name.clone(), guid, entry.type_code, data)
                    .with_children(children);
                nodes.push(ModuleNode::File(file));
            }
            "section" => {
                let guid = match entry.guid.as_deref() {
                    Some(raw) => parse_guid(raw)?,
                    None => Guid::nil(),
                };
                let children = build_level(&entry.children, image, owner, depth + 1)?;
                let header_size = usize::try_from(entry.header_size).unwrap_or(usize::MAX);
                nodes.push(ModuleNode::Section(SectionNode {
                    name: entry.name.clone(),
                    guid,
                    parent_guid: owner.unwrap_or_else(Guid::nil),
                    section_type: entry.type_code,
                    header_size,
                    hash: sha256_hex(&data),
                    data,
                    children,
                }));
            }
            other => {
                return Err(TreeError::UnknownKind {
                    kind: other.to_string(),
                })
            }
        }
    }
    Ok(nodes)
}

fn parse_guid(raw: &str) -> Result<Guid, TreeError> {
    raw.parse().map_err(|source| TreeError::Guid {
        value: raw.to_string(),
        source,
    })
}

fn slice_content(entry: &ManifestNode, image: &[u8]) -> Result<Vec<u8>, TreeError> {
    let oob = || TreeError::OutOfBounds {
        name: entry.name.clone(),
        offset: entry.offset,
        size: entry.size,
        image_len: image.len(),
    };
    let start = usize::try_from(entry.offset).map_err(|_| oob())?;
    let len = usize::try_from(entry.size).map_err(|_| oob())?;
    let end = start.checked_add(len).ok_or_else(oob)?;
    if end > image.len() {
        return Err(oob());
    }
    Ok(image[start..end].to_vec())
}

/// Tree source that reads a pre-dumped manifest file instead of running a
/// decoder. Useful when the decoder ran elsewhere, and for tests.
#[derive(Debug, Clone)]
pub struct ManifestTreeSource {
    manifest_path: PathBuf,
}

impl ManifestTreeSource {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
        }
    }
}

impl TreeSource for ManifestTreeSource {
    fn build_tree(&self, image: &FirmwareImage) -> Result<Vec<ModuleNode>, TreeError> {
        let body = fs::read_to_string(&self.manifest_path).map_err(|source| TreeError::Io {
            path: self.manifest_path.clone(),
            source,
        })?;
        let manifest = parse_manifest(&body)?;
        build_nodes(&manifest, &image.bytes)
    }

    fn name(&self) -> &'static str {
        "manifest"
    }
}
