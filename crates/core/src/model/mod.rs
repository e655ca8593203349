//! Core data model for firmware module trees and survey results.
//!
//! Everything downstream (classification, extraction, reporting) works on the
//! types in this module:
//! - [`Guid`] identity newtype shared by files and analysis records
//! - [`ModuleType`] / [`SectionType`] closed code tables from the PI spec
//! - [`ModuleNode`] tree nodes as produced by a
//!   [`TreeSource`](crate::fv::TreeSource)
//! - [`MatchedModule`] / [`ModuleHandlers`] survey output records

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Firmware file GUID.
///
/// Wraps [`uuid::Uuid`] so parsing accepts any case, while [`fmt::Display`]
/// always renders the uppercase hyphenated form used in scan reports and
/// artifact names. Serde goes through the same textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(Uuid);

impl Guid {
    pub const fn nil() -> Self {
        Guid(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Guid(value)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        f.write_str(self.0.hyphenated().encode_upper(&mut buf))
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Guid)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// Firmware file types from the PI specification.
///
/// The numeric codes are the on-image values; the labels are the conventional
/// `FV_*` names used in scan reports. Vendor-specific codes outside this table
/// stay as raw bytes on [`FileNode::file_type`] and simply never classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleType {
    Raw,
    Freeform,
    SecurityCore,
    PeiCore,
    DxeCore,
    Peim,
    Driver,
    CombinedPeimDriver,
    Application,
    Mm,
    FirmwareVolumeImage,
    CombinedMmDxe,
    MmCore,
    MmStandalone,
    MmCoreStandalone,
    Pad,
}

impl ModuleType {
    pub const ALL: [ModuleType; 16] = [
        ModuleType::Raw,
        ModuleType::Freeform,
        ModuleType::SecurityCore,
        ModuleType::PeiCore,
        ModuleType::DxeCore,
        ModuleType::Peim,
        ModuleType::Driver,
        ModuleType::CombinedPeimDriver,
        ModuleType::Application,
        ModuleType::Mm,
        ModuleType::FirmwareVolumeImage,
        ModuleType::CombinedMmDxe,
        ModuleType::MmCore,
        ModuleType::MmStandalone,
        ModuleType::MmCoreStandalone,
        ModuleType::Pad,
    ];

    pub fn code(self) -> u8 {
        match self {
            ModuleType::Raw => 0x01,
            ModuleType::Freeform => 0x02,
            ModuleType::SecurityCore => 0x03,
            ModuleType::PeiCore => 0x04,
            ModuleType::DxeCore => 0x05,
            ModuleType::Peim => 0x06,
            ModuleType::Driver => 0x07,
            ModuleType::CombinedPeimDriver => 0x08,
            ModuleType::Application => 0x09,
            ModuleType::Mm => 0x0A,
            ModuleType::FirmwareVolumeImage => 0x0B,
            ModuleType::CombinedMmDxe => 0x0C,
            ModuleType::MmCore => 0x0D,
            ModuleType::MmStandalone => 0x0E,
            ModuleType::MmCoreStandalone => 0x0F,
            ModuleType::Pad => 0xF0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModuleType::Raw => "FV_RAW",
            ModuleType::Freeform => "FV_FREEFORM",
            ModuleType::SecurityCore => "FV_SECURITY_CORE",
            ModuleType::PeiCore => "FV_PEI_CORE",
            ModuleType::DxeCore => "FV_DXE_CORE",
            ModuleType::Peim => "FV_PEIM",
            ModuleType::Driver => "FV_DRIVER",
            ModuleType::CombinedPeimDriver => "FV_COMBINED_PEIM_DRIVER",
            ModuleType::Application => "FV_APPLICATION",
            ModuleType::Mm => "FV_MM",
            ModuleType::FirmwareVolumeImage => "FV_FVIMAGE",
            ModuleType::CombinedMmDxe => "FV_COMBINED_MM_DXE",
            ModuleType::MmCore => "FV_MM_CORE",
            ModuleType::MmStandalone => "FV_MM_STANDALONE",
            ModuleType::MmCoreStandalone => "FV_MM_CORE_STANDALONE",
            ModuleType::Pad => "FV_FFS_PAD",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Parse a user-supplied type spec: a label (`FV_MM`, `MM`, any case) or a
    /// numeric code (`14`, `0x0E`).
    pub fn parse_spec(spec: &str) -> Option<Self> {
        let trimmed = spec.trim();
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u8::from_str_radix(hex, 16).ok().and_then(Self::from_code);
        }
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_code(code);
        }
        let upper = trimmed.to_ascii_uppercase();
        let bare = upper.strip_prefix("FV_").unwrap_or(&upper);
        Self::ALL.iter().copied().find(|t| {
            let label = t.label();
            upper == label || bare == label.strip_prefix("FV_").unwrap_or(label)
        })
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Firmware section types from the PI specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionType {
    Compression,
    GuidDefined,
    Disposable,
    Pe32,
    Pic,
    Te,
    DxeDepex,
    Version,
    UserInterface,
    Compatibility16,
    FirmwareVolumeImage,
    FreeformSubtypeGuid,
    Raw,
    PeiDepex,
    MmDepex,
}

impl SectionType {
    pub const ALL: [SectionType; 15] = [
        SectionType::Compression,
        SectionType::GuidDefined,
        SectionType::Disposable,
        SectionType::Pe32,
        SectionType::Pic,
        SectionType::Te,
        SectionType::DxeDepex,
        SectionType::Version,
        SectionType::UserInterface,
        SectionType::Compatibility16,
        SectionType::FirmwareVolumeImage,
        SectionType::FreeformSubtypeGuid,
        SectionType::Raw,
        SectionType::PeiDepex,
        SectionType::MmDepex,
    ];

    pub fn code(self) -> u8 {
        match self {
            SectionType::Compression => 0x01,
            SectionType::GuidDefined => 0x02,
            SectionType::Disposable => 0x03,
            SectionType::Pe32 => 0x10,
            SectionType::Pic => 0x11,
            SectionType::Te => 0x12,
            SectionType::DxeDepex => 0x13,
            SectionType::Version => 0x14,
            SectionType::UserInterface => 0x15,
            SectionType::Compatibility16 => 0x16,
            SectionType::FirmwareVolumeImage => 0x17,
            SectionType::FreeformSubtypeGuid => 0x18,
            SectionType::Raw => 0x19,
            SectionType::PeiDepex => 0x1B,
            SectionType::MmDepex => 0x1C,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SectionType::Compression => "S_COMPRESSION",
            SectionType::GuidDefined => "S_GUID_DEFINED",
            SectionType::Disposable => "S_DISPOSABLE",
            SectionType::Pe32 => "S_PE32",
            SectionType::Pic => "S_PIC",
            SectionType::Te => "S_TE",
            SectionType::DxeDepex => "S_DXE_DEPEX",
            SectionType::Version => "S_VERSION",
            SectionType::UserInterface => "S_USER_INTERFACE",
            SectionType::Compatibility16 => "S_COMPATIBILITY16",
            SectionType::FirmwareVolumeImage => "S_FV_IMAGE",
            SectionType::FreeformSubtypeGuid => "S_FREEFORM_SUBTYPE_GUID",
            SectionType::Raw => "S_RAW",
            SectionType::PeiDepex => "S_PEI_DEPEX",
            SectionType::MmDepex => "S_MM_DEPEX",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Executable-code sections: the payload kinds worth handing to an
    /// analysis tool.
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            SectionType::Pe32 | SectionType::Pic | SectionType::Te | SectionType::Compatibility16
        )
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One node of a firmware module tree.
///
/// Exactly two kinds exist. Type codes stay as raw bytes on the nodes so that
/// vendor-specific values survive the trip through the tree untouched;
/// [`ModuleType`]/[`SectionType`] are only consulted when classifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleNode {
    File(FileNode),
    Section(SectionNode),
}

impl ModuleNode {
    pub fn name(&self) -> &str {
        match self {
            ModuleNode::File(f) => &f.name,
            ModuleNode::Section(s) => &s.name,
        }
    }

    pub fn guid(&self) -> Guid {
        match self {
            ModuleNode::File(f) => f.guid,
            ModuleNode::Section(s) => s.guid,
        }
    }

    pub fn children(&self) -> &[ModuleNode] {
        match self {
            ModuleNode::File(f) => &f.children,
            ModuleNode::Section(s) => &s.children,
        }
    }
}

/// A firmware file: a GUID-identified leaf or container in a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Human-readable name, usually recovered from a UI section. May be empty.
    pub name: String,
    pub guid: Guid,
    /// Raw file type code from the image.
    pub file_type: u8,
    /// SHA-256 of `data`, lowercase hex.
    pub hash: String,
    /// Full file content as it appears in the image.
    pub data: Vec<u8>,
    pub children: Vec<ModuleNode>,
}

impl FileNode {
    pub fn new(name: impl Into<String>, guid: Guid, file_type: u8, data: Vec<u8>) -> Self {
        let hash = sha256_hex(&data);
        Self {
            name: name.into(),
            guid,
            file_type,
            hash,
            data,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ModuleNode>) -> Self {
        self.children = children;
        self
    }
}

/// A section inside a firmware file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNode {
    /// Section name; empty unless the decoder recovered one.
    pub name: String,
    /// Section-level GUID where one applies (GUID-defined sections); nil
    /// otherwise.
    pub guid: Guid,
    /// GUID of the enclosing file. Nil for sections outside any file.
    pub parent_guid: Guid,
    /// Raw section type code from the image.
    pub section_type: u8,
    /// Bytes of section header to skip when extracting the payload.
    pub header_size: usize,
    /// SHA-256 of `data`, lowercase hex.
    pub hash: String,
    /// Full section content, header included.
    pub data: Vec<u8>,
    pub children: Vec<ModuleNode>,
}

impl SectionNode {
    pub fn new(
        name: impl Into<String>,
        parent_guid: Guid,
        section_type: u8,
        header_size: usize,
        data: Vec<u8>,
    ) -> Self {
        let hash = sha256_hex(&data);
        Self {
            name: name.into(),
            guid: Guid::nil(),
            parent_guid,
            section_type,
            header_size,
            hash,
            data,
            children: Vec::new(),
        }
    }

    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = guid;
        self
    }

    pub fn with_children(mut self, children: Vec<ModuleNode>) -> Self {
        self.children = children;
        self
    }
}

/// One classified module, in the order the scan found it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedModule {
    pub name: String,
    pub guid: Guid,
    /// `FV_*` label of the matched type.
    pub type_label: String,
    /// SHA-256 of the whole file content, lowercase hex.
    pub hash: String,
}

/// A module joined with the handler names pulled from its analysis record.
///
/// `name` and `guid` are kept as the raw scan-report fields rather than parsed
/// identities: the analysis-record file name is derived from these exact
/// strings, and re-rendering them could break the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHandlers {
    pub name: String,
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    pub handlers: Vec<String>,
}

/// SHA-256 of a byte slice as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
