//! CI backend interface
//!
//! The upload/preview network calls belong to the platform's CI SDK. Drivers
//! reach it through [`CiBackend`]; [`MiniprogramCli`] drives the
//! `miniprogram-ci` command-line tool.

mod cli;

pub use cli::{locate_sdk, MiniprogramCli, SDK_NAME};

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::CompileSettings;

/// Package name reporting the size of the whole project
pub const FULL_PACKAGE: &str = "__FULL__";

/// Package name reporting the size of the main package
pub const MAIN_PACKAGE: &str = "__APP__";

/// Project description handed to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHandle {
    #[serde(rename = "type")]
    pub kind: String,
    pub appid: String,
    pub project_path: PathBuf,
    pub private_key_path: PathBuf,
    #[serde(default)]
    pub ignores: Vec<String>,
}

/// One upload or preview submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub project: ProjectHandle,
    pub version: String,
    pub desc: String,
    pub robot: u32,
    pub setting: CompileSettings,
}

/// Size of one package in a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSize {
    pub name: String,
    /// Bytes
    pub size: u64,
}

/// What the backend reports back after a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    #[serde(rename = "subPackageInfo", default)]
    pub sub_packages: Vec<PackageSize>,
}

impl SubmitResult {
    fn size_of(&self, name: &str) -> Option<u64> {
        self.sub_packages
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.size)
    }

    /// Total size of the project in bytes
    pub fn full_size(&self) -> Option<u64> {
        self.size_of(FULL_PACKAGE)
    }

    /// Size of the main package in bytes
    pub fn main_size(&self) -> Option<u64> {
        self.size_of(MAIN_PACKAGE)
    }

    /// Human summary such as "312.50kb in total, main package 120.00kb"
    pub fn size_summary(&self) -> Option<String> {
        let full = self.full_size()?;
        let mut summary = format!("{:.2}kb in total", full as f64 / 1024.0);
        if let Some(main) = self.main_size() {
            summary.push_str(&format!(", main package {:.2}kb", main as f64 / 1024.0));
        }
        Some(summary)
    }
}

/// A client of the platform's CI service
pub trait CiBackend {
    /// Submit as the next release candidate of `request.robot`
    fn upload(&self, request: &SubmitRequest) -> Result<SubmitResult, BackendError>;

    /// Submit as a development build, writing its QR code image to `qrcode_dest`
    fn preview(
        &self,
        request: &SubmitRequest,
        qrcode_dest: &Path,
    ) -> Result<SubmitResult, BackendError>;
}

/// Backend errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(packages: &[(&str, u64)]) -> SubmitResult {
        SubmitResult {
            sub_packages: packages
                .iter()
                .map(|(name, size)| PackageSize {
                    name: name.to_string(),
                    size: *size,
                })
                .collect(),
        }
    }

    #[test]
    fn test_size_summary() {
        let summary = result(&[(FULL_PACKAGE, 2048), (MAIN_PACKAGE, 1024), ("pkgA", 512)])
            .size_summary()
            .unwrap();
        assert_eq!(summary, "2.00kb in total, main package 1.00kb");
    }

    #[test]
    fn test_size_summary_without_main() {
        let summary = result(&[(FULL_PACKAGE, 1536)]).size_summary().unwrap();
        assert_eq!(summary, "1.50kb in total");
    }

    #[test]
    fn test_size_summary_without_full() {
        assert_eq!(result(&[(MAIN_PACKAGE, 1024)]).size_summary(), None);
        assert_eq!(SubmitResult::default().size_summary(), None);
    }

    #[test]
    fn test_parse_backend_result() {
        let json = r#"{"subPackageInfo":[{"name":"__FULL__","size":100},{"name":"__APP__","size":60}]}"#;
        let parsed: SubmitResult = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.full_size(), Some(100));
        assert_eq!(parsed.main_size(), Some(60));
    }
}
