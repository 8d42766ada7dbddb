use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ ChatError, Result };
use crate::llm::profile::{ builtin_profiles, BackendProfile };

/// Parses a JSON object of profile name to profile.
pub fn parse_profiles(json: &str) -> Result<HashMap<String, BackendProfile>> {
    let mut profiles: HashMap<String, BackendProfile> = serde_json
        ::from_str(json)
        .map_err(|e| ChatError::config(format!("Failed to parse profiles: {}", e)))?;
    for (name, profile) in profiles.iter_mut() {
        profile.name = name.clone();
    }
    Ok(profiles)
}

/// Built-in profiles, overridden or extended by the file at `path`.
pub fn load_profiles<P: AsRef<Path>>(path: Option<P>) -> Result<HashMap<String, BackendProfile>> {
    let mut profiles = builtin_profiles();
    let Some(path) = path else {
        return Ok(profiles);
    };

    let path = path.as_ref();
    let file_content = fs
        ::read_to_string(path)
        .map_err(|e| ChatError::config(format!("Failed to read profiles file '{}': {}", path.display(), e)))?;
    let extra = parse_profiles(&file_content)?;
    info!("Loaded {} profile(s) from {}", extra.len(), path.display());
    profiles.extend(extra);
    Ok(profiles)
}
