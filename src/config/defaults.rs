//! Built-in defaults (lowest precedence layers)
//!
//! Global defaults apply to every platform; platform defaults fill in the
//! platform's own options block.

use std::env;
use std::path::PathBuf;

use super::schema::{CompileSettings, Config, PlatformOptions};
use crate::platform::Platform;

/// Project type every supported platform defaults to
pub const DEFAULT_PROJECT_KIND: &str = "miniProgram";

/// Built-in global configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    /// Log verbosity (default: "info")
    pub log_level: String,

    /// Project path (default: current working directory)
    pub project_path: PathBuf,

    /// Release slot (default: 1)
    pub robot: u32,

    /// ES6 down-transform (default: true)
    pub es6: bool,

    /// Minification (default: true)
    pub minify: bool,

    /// WXSS vendor prefixing (default: true)
    pub auto_prefix_wxss: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            project_path: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            robot: 1,
            es6: true,
            minify: true,
            auto_prefix_wxss: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a configuration layer for merging
    pub fn to_layer(&self) -> Config {
        Config {
            log_level: Some(self.log_level.clone()),
            project_path: Some(self.project_path.clone()),
            robot: Some(self.robot),
            setting: Some(CompileSettings {
                es6: Some(self.es6),
                minify: Some(self.minify),
                auto_prefix_wxss: Some(self.auto_prefix_wxss),
                ..CompileSettings::default()
            }),
            ..Config::default()
        }
    }
}

/// Default layer for a platform: its options block with the project type set.
pub fn platform_defaults(platform: Platform) -> Config {
    let block = match platform {
        Platform::Weapp | Platform::Alipay | Platform::Swan | Platform::Tiktok => PlatformOptions {
            kind: Some(DEFAULT_PROJECT_KIND.to_string()),
            ..PlatformOptions::default()
        },
    };

    let mut layer = Config::default();
    *layer.platform_slot(platform) = Some(block);
    layer
}
