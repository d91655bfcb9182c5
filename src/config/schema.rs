//! Typed configuration schema
//!
//! Every field is optional so that the same type describes a single layer
//! (defaults, a config file, CLI flags) and the merged result. Keys keep
//! the camelCase names used by mini-program tooling.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::merge::{merge_nested, merge_scalar, Merge};
use crate::platform::Platform;

/// Compile settings forwarded to the CI backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileSettings {
    /// Transpile ES6 down to ES5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub es6: Option<bool>,

    /// Minify scripts and styles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,

    /// Add vendor prefixes to WXSS
    #[serde(rename = "autoPrefixWXSS", skip_serializing_if = "Option::is_none")]
    pub auto_prefix_wxss: Option<bool>,

    /// Backend-specific flags passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompileSettings {
    pub fn es6_enabled(&self) -> bool {
        self.es6.unwrap_or(true)
    }

    pub fn minify_enabled(&self) -> bool {
        self.minify.unwrap_or(true)
    }

    pub fn auto_prefix_enabled(&self) -> bool {
        self.auto_prefix_wxss.unwrap_or(true)
    }
}

impl Merge for CompileSettings {
    fn merge(&mut self, overlay: Self) {
        merge_scalar(&mut self.es6, overlay.es6);
        merge_scalar(&mut self.minify, overlay.minify);
        merge_scalar(&mut self.auto_prefix_wxss, overlay.auto_prefix_wxss);
        self.extra.merge(overlay.extra);
    }
}

/// Options block for one platform (`[weapp]`, `[alipay]`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOptions {
    /// Project type understood by the backend (e.g. "miniProgram")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Application identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,

    /// Upload credential file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    /// Directory handed to the backend, when it differs from the project path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,

    /// Glob patterns excluded from the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignores: Option<Vec<String>>,

    /// Release slot, overriding the global one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot: Option<u32>,

    /// Compile settings, merged over the global ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<CompileSettings>,

    /// Install location of the desktop developer tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_tools_install_path: Option<PathBuf>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Merge for PlatformOptions {
    fn merge(&mut self, overlay: Self) {
        merge_scalar(&mut self.kind, overlay.kind);
        merge_scalar(&mut self.appid, overlay.appid);
        merge_scalar(&mut self.private_key_path, overlay.private_key_path);
        merge_scalar(&mut self.project_path, overlay.project_path);
        merge_scalar(&mut self.ignores, overlay.ignores);
        merge_scalar(&mut self.robot, overlay.robot);
        merge_nested(&mut self.setting, overlay.setting);
        merge_scalar(
            &mut self.dev_tools_install_path,
            overlay.dev_tools_install_path,
        );
        self.extra.merge(overlay.extra);
    }
}

/// A configuration layer, or the merge of several
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// One of info, debug, warn, error, silent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,

    /// Release slot (1..=30)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot: Option<u32>,

    /// Version label of the submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Description of the submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<CompileSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapp: Option<PlatformOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alipay: Option<PlatformOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub swan: Option<PlatformOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<PlatformOptions>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// The options block for `platform`, if one was configured
    pub fn platform(&self, platform: Platform) -> Option<&PlatformOptions> {
        match platform {
            Platform::Weapp => self.weapp.as_ref(),
            Platform::Alipay => self.alipay.as_ref(),
            Platform::Swan => self.swan.as_ref(),
            Platform::Tiktok => self.tiktok.as_ref(),
        }
    }

    /// Mutable slot for the options block of `platform`
    pub fn platform_slot(&mut self, platform: Platform) -> &mut Option<PlatformOptions> {
        match platform {
            Platform::Weapp => &mut self.weapp,
            Platform::Alipay => &mut self.alipay,
            Platform::Swan => &mut self.swan,
            Platform::Tiktok => &mut self.tiktok,
        }
    }

    /// Release slot for `platform`: the platform block wins over the global value.
    pub fn effective_robot(&self, platform: Platform) -> u32 {
        self.platform(platform)
            .and_then(|p| p.robot)
            .or(self.robot)
            .unwrap_or(1)
    }

    /// Global compile settings with the platform block's settings merged on top.
    pub fn effective_setting(&self, platform: Platform) -> CompileSettings {
        let mut setting = self.setting.clone().unwrap_or_default();
        if let Some(overlay) = self.platform(platform).and_then(|p| p.setting.clone()) {
            setting.merge(overlay);
        }
        setting
    }

    /// Get a value by dot-separated key path (e.g. "setting.es6")
    pub fn get(&self, path: &str) -> Option<Value> {
        let value = serde_json::to_value(self).ok()?;
        let mut current = &value;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current.clone())
    }
}

impl Merge for Config {
    fn merge(&mut self, overlay: Self) {
        merge_scalar(&mut self.log_level, overlay.log_level);
        merge_scalar(&mut self.project_path, overlay.project_path);
        merge_scalar(&mut self.robot, overlay.robot);
        merge_scalar(&mut self.version, overlay.version);
        merge_scalar(&mut self.desc, overlay.desc);
        merge_nested(&mut self.setting, overlay.setting);
        merge_nested(&mut self.weapp, overlay.weapp);
        merge_nested(&mut self.alipay, overlay.alipay);
        merge_nested(&mut self.swan, overlay.swan);
        merge_nested(&mut self.tiktok, overlay.tiktok);
        self.extra.merge(overlay.extra);
    }
}
