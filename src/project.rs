//! Project path, version label and description helpers

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::logger::Logger;

/// Host project manifest consulted for a version label
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Errors reading the host project manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolve `input` against `cwd`; empty input means `cwd` itself.
pub fn resolve_project_path(input: &str, cwd: &Path) -> PathBuf {
    if input.is_empty() {
        return cwd.to_path_buf();
    }
    let path = Path::new(input);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Version label: explicit value, else the host manifest's version,
/// else a `YYYYMMDD.HHmm` timestamp.
pub fn generate_version(explicit: Option<&str>, host_root: &Path, logger: &Logger) -> String {
    if let Some(version) = explicit.filter(|v| !v.is_empty()) {
        return version.to_string();
    }

    match host_package_version(host_root) {
        Ok(Some(version)) => return version,
        Ok(None) => {}
        Err(e) => logger.warn(format!("cannot read version from {}: {}", PACKAGE_MANIFEST, e)),
    }

    timestamp_version(Local::now())
}

/// The `version` field of `<root>/package.json`, if the file exists and has one
pub fn host_package_version(root: &Path) -> Result<Option<String>, ManifestError> {
    let path = root.join(PACKAGE_MANIFEST);
    if !path.is_file() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)?;
    let manifest: serde_json::Value = serde_json::from_str(&contents)?;

    Ok(manifest
        .get("version")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(str::to_string))
}

pub fn timestamp_version(now: DateTime<Local>) -> String {
    now.format("%Y%m%d.%H%M").to_string()
}

/// Description: explicit value, else a timestamped default.
pub fn generate_desc(explicit: Option<&str>) -> String {
    match explicit.filter(|d| !d.is_empty()) {
        Some(desc) => desc.to_string(),
        None => format!("CI build {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
    }
}
