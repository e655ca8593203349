use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use survey_core::model::ModuleType;
use survey_core::scan::TargetTypes;

fn default_extract() -> bool {
    true
}

/// A reusable scan profile: which module types to hunt and whether to
/// extract their sections. Loaded from YAML or JSON based on extension.
#[derive(Debug, Deserialize, Serialize)]
pub struct ScanProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target_types: Vec<String>,
    #[serde(default = "default_extract")]
    pub extract: bool,
}

impl ScanProfile {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Scan profile 'name' is required"));
        }
        if self.target_types.is_empty() {
            return Err(anyhow!("Scan profile must include at least one target type"));
        }
        Ok(())
    }

    pub fn resolve_targets(&self) -> Result<TargetTypes> {
        let mut types = Vec::with_capacity(self.target_types.len());
        for spec in &self.target_types {
            types.push(parse_type_spec(spec)?);
        }
        Ok(TargetTypes::new(types))
    }
}

/// Load a scan profile (supports YAML or JSON based on extension).
pub fn load_scan_profile(path: &Path) -> Result<ScanProfile> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read scan profile at {}", path.display()))?;
    let profile: ScanProfile = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_slice(&bytes).context("Failed to parse scan profile JSON")?
    } else {
        serde_yaml::from_slice(&bytes).context("Failed to parse scan profile YAML")?
    };
    profile.validate()?;
    Ok(profile)
}

/// Parse a comma-separated type list as given on the command line.
pub fn parse_type_list(csv: &str) -> Result<TargetTypes> {
    let mut types = Vec::new();
    for spec in csv.split(',') {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        types.push(parse_type_spec(spec)?);
    }
    if types.is_empty() {
        return Err(anyhow!("Type list '{}' names no module types", csv));
    }
    Ok(TargetTypes::new(types))
}

/// Pick the target set: an explicit `--types` list wins over the profile,
/// which wins over the built-in management-mode set.
pub fn resolve_target_types(
    cli_types: Option<&str>,
    profile: Option<&ScanProfile>,
) -> Result<TargetTypes> {
    if let Some(csv) = cli_types {
        return parse_type_list(csv);
    }
    if let Some(profile) = profile {
        return profile.resolve_targets();
    }
    Ok(TargetTypes::default_mm())
}

fn parse_type_spec(spec: &str) -> Result<ModuleType> {
    ModuleType::parse_spec(spec).ok_or_else(|| {
        let known: Vec<&str> = ModuleType::ALL.iter().map(|t| t.label()).collect();
        anyhow!("Unknown module type '{}' (known: {})", spec, known.join(", "))
    })
}
