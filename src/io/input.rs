use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::ExportError;
use crate::models::Export;

/// Read and parse an export file
pub fn read_export_file(path: &Path) -> std::result::Result<Export, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ExportError::NotFound(path.to_path_buf())
        } else {
            ExportError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_export_json(&content).map_err(|source| ExportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse an export from a JSON string
///
/// Missing top-level fields default to empty; only non-JSON input or a
/// non-object root fails.
pub fn parse_export_json(json: &str) -> serde_json::Result<Export> {
    serde_json::from_str(json)
}

/// Expand glob patterns into a de-duplicated list of paths
///
/// A pattern without glob syntax that matches nothing is kept as-is so the
/// caller can report it as missing.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for pattern in patterns {
        let entries =
            glob::glob(pattern).with_context(|| format!("Invalid path pattern: {}", pattern))?;

        let mut matched = false;
        for entry in entries {
            match entry {
                Ok(path) => {
                    matched = true;
                    if seen.insert(path.clone()) {
                        paths.push(path);
                    }
                }
                Err(e) => warn!("Skipping unreadable path {:?}: {}", e.path(), e.error()),
            }
        }

        if !matched && !is_glob(pattern) {
            let path = PathBuf::from(pattern);
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    Ok(paths)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
