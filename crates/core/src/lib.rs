//! survey-core
//!
//! Core library for surveying management-mode (MM) modules in UEFI firmware
//! images: building module trees through pluggable sources, classifying and
//! extracting MM modules, and correlating external analysis results back onto
//! the scan.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, Python bindings, etc.).

pub mod fv;
pub mod layout;
pub mod model;
pub mod report;
pub mod scan;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
