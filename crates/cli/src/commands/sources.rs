use anyhow::Result;
use serde::Serialize;

use survey_core::fv::FV_TOOL_ENV;

#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub description: String,
}

/// List the module tree sources known to this binary.
pub fn list_sources_command(json: bool) -> Result<()> {
    let entries = vec![
        SourceInfo {
            name: "external".to_string(),
            description: format!(
                "Runs the volume decoder from --tool or {} against the image and reads a tree manifest from its stdout",
                FV_TOOL_ENV
            ),
        },
        SourceInfo {
            name: "manifest".to_string(),
            description: "Reads a pre-dumped tree manifest (--manifest) and slices payloads out of the image".to_string(),
        },
    ];

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Tree sources:");
    for entry in entries {
        println!("- {}: {}", entry.name, entry.description);
    }

    Ok(())
}
