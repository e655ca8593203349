use std::env;
use std::path::PathBuf;
use std::process::Command;

use crate::model::ModuleNode;

use super::{manifest, FirmwareImage, TreeError, TreeSource};

/// Environment variable naming the external volume decoder executable.
pub const FV_TOOL_ENV: &str = "MM_SURVEY_FV_TOOL";

/// Tree source that shells out to an external firmware volume decoder.
///
/// The decoder is invoked as `<tool> <image-path>` and must print a module
/// tree manifest (see [`manifest`]) on stdout. Tool resolution precedence:
/// an explicitly configured path, then [`FV_TOOL_ENV`].
#[derive(Debug, Clone, Default)]
pub struct ExternalTreeSource {
    tool: Option<PathBuf>,
}

impl ExternalTreeSource {
    pub fn new(tool: Option<PathBuf>) -> Self {
        Self { tool }
    }

    fn resolve_tool(&self) -> Result<PathBuf, TreeError> {
        if let Some(tool) = &self.tool {
            return Ok(tool.clone());
        }
        if let Some(tool) = env::var_os(FV_TOOL_ENV) {
            return Ok(PathBuf::from(tool));
        }
        Err(TreeError::ToolUnavailable)
    }
}

impl TreeSource for ExternalTreeSource {
    fn build_tree(&self, image: &FirmwareImage) -> Result<Vec<ModuleNode>, TreeError> {
        let tool = self.resolve_tool()?;
        log::debug!("running decoder {} on {}", tool.display(), image.path.display());
        let output = Command::new(&tool)
            .arg(&image.path)
            .output()
            .map_err(|e| TreeError::Tool(format!("failed to spawn {}: {e}", tool.display())))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TreeError::Tool(format!(
                "{} exited with {}: {}",
                tool.display(),
                output.status,
                stderr.trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let manifest = manifest::parse_manifest(&stdout)?;
        manifest::build_nodes(&manifest, &image.bytes)
    }

    fn name(&self) -> &'static str {
        "external"
    }
}
