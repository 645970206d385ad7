//! Load model descriptors from a directory tree of JSON files.

use crate::error::RegistryError;
use crate::registry::ModelDescriptor;
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

/// Read every `*.json` file below `dir` in file-name order. A file holds one descriptor or an array of them.
pub fn load_descriptors(dir: &Path) -> Result<Vec<ModelDescriptor>, RegistryError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| RegistryError::Load {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let load_err = |reason: String| RegistryError::Load {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))?;
        match value {
            Value::Array(items) => {
                for item in items {
                    out.push(serde_json::from_value(item).map_err(|e| load_err(e.to_string()))?);
                }
            }
            other => out.push(serde_json::from_value(other).map_err(|e| load_err(e.to_string()))?),
        }
        tracing::debug!(path = %path.display(), "loaded model descriptors");
    }
    Ok(out)
}
