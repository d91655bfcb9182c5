//! Configuration resolution
//!
//! Builds the per-run configuration from built-in defaults, platform
//! defaults and user options, validates it, and keeps track of which
//! layers contributed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defaults::{platform_defaults, BuiltinDefaults};
use super::merge::{deep_merge, Merge};
use super::schema::{Config, PlatformOptions};
use crate::platform::Platform;

/// Schema identifier of the effective config report
pub const SCHEMA_ID: &str = "mini-ci/effective_config@1";

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "mini-ci.toml";

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Platform,
    File,
    Cli,
}

/// A contributing layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for everything but file layers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn new(origin: ConfigOrigin) -> Self {
        Self { origin, path: None }
    }
}

/// User-supplied options: a config file layer under CLI flags.
#[derive(Debug, Clone, Default)]
pub struct UserOptions {
    pub config: Config,
    pub sources: Vec<ConfigSource>,
}

impl UserOptions {
    /// Load `file` (if any) and merge `cli` on top of it.
    pub fn load(file: Option<&Path>, cli: Config) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        if let Some(path) = file {
            layers.push(load_toml_file(path)?);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_path_buf()),
            });
        }

        let mut cli = cli;
        if let Some(below) = layers.first() {
            lift_globals(&mut cli, below);
        }
        layers.push(cli);
        sources.push(ConfigSource::new(ConfigOrigin::Cli));

        Ok(Self {
            config: deep_merge(Config::default(), layers),
            sources,
        })
    }
}

/// Copy `overlay`'s global `robot` and `setting` into each platform block
/// that `below` defines, keeping a higher layer's globals ahead of a lower
/// layer's block values.
fn lift_globals(overlay: &mut Config, below: &Config) {
    let robot = overlay.robot;
    let setting = overlay.setting.clone();
    if robot.is_none() && setting.is_none() {
        return;
    }

    for platform in Platform::ALL {
        if below.platform(platform).is_none() {
            continue;
        }
        let block = overlay
            .platform_slot(platform)
            .get_or_insert_with(PlatformOptions::default);
        if block.robot.is_none() {
            block.robot = robot;
        }
        if let Some(global) = &setting {
            let mut merged = global.clone();
            if let Some(own) = block.setting.take() {
                merged.merge(own);
            }
            block.setting = Some(merged);
        }
    }
}

impl From<Config> for UserOptions {
    fn from(config: Config) -> Self {
        Self {
            config,
            sources: vec![ConfigSource::new(ConfigOrigin::Cli)],
        }
    }
}

/// Merge global defaults < platform defaults < user options.
pub fn create_config(user: Config, platform: Platform) -> Config {
    deep_merge(
        BuiltinDefaults::default().to_layer(),
        [platform_defaults(platform), user],
    )
}

/// Check that the platform block exists and carries an application id.
pub fn validate_config(config: &Config, platform: Platform) -> Result<bool, ConfigError> {
    let block = config
        .platform(platform)
        .ok_or(ConfigError::PlatformConfigMissing(platform))?;

    if !block.appid.as_deref().is_some_and(|s| !s.is_empty()) {
        return Err(ConfigError::MissingField {
            platform,
            field: "appid".to_string(),
        });
    }

    Ok(true)
}

/// Resolved configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    pub platform: Platform,

    /// The merged configuration
    pub config: Config,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Merge and validate the configuration for `platform`.
    pub fn build(platform: Platform, user: UserOptions) -> Result<Self, ConfigError> {
        let mut sources = vec![
            ConfigSource::new(ConfigOrigin::Builtin),
            ConfigSource::new(ConfigOrigin::Platform),
        ];
        sources.extend(user.sources);

        let config = create_config(user.config, platform);
        validate_config(&config, platform)?;

        Ok(Self {
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            platform,
            config,
            sources,
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Load and parse a TOML config file into a layer
fn load_toml_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("missing \"{0}\" options block")]
    PlatformConfigMissing(Platform),

    #[error("missing required config: {platform}.{field}")]
    MissingField { platform: Platform, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn layer(value: Value) -> Config {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_config_weapp_scenario() {
        let config = create_config(layer(json!({"weapp": {"appid": "wx123"}})), Platform::Weapp);

        assert_eq!(config.get("setting.es6"), Some(json!(true)));
        assert_eq!(config.get("setting.minify"), Some(json!(true)));
        assert_eq!(config.get("setting.autoPrefixWXSS"), Some(json!(true)));
        assert_eq!(config.get("robot"), Some(json!(1)));
        assert_eq!(config.get("logLevel"), Some(json!("info")));
        assert_eq!(config.get("weapp.appid"), Some(json!("wx123")));
        assert_eq!(config.get("weapp.type"), Some(json!("miniProgram")));
    }

    #[test]
    fn test_user_overrides_platform_and_global() {
        let user = layer(json!({
            "robot": 4,
            "setting": {"minify": false},
            "weapp": {"appid": "wx1", "type": "miniGame"}
        }));

        let config = create_config(user, Platform::Weapp);

        assert_eq!(config.get("robot"), Some(json!(4)));
        assert_eq!(config.get("setting.minify"), Some(json!(false)));
        assert_eq!(config.get("setting.es6"), Some(json!(true)));
        assert_eq!(config.get("weapp.type"), Some(json!("miniGame")));
    }

    #[test]
    fn test_validate_ok() {
        let config = create_config(layer(json!({"weapp": {"appid": "wx123"}})), Platform::Weapp);
        assert!(validate_config(&config, Platform::Weapp).unwrap());
    }

    #[test]
    fn test_validate_missing_appid() {
        let config = create_config(Config::default(), Platform::Weapp);
        let err = validate_config(&config, Platform::Weapp).unwrap_err();

        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "appid"));
        assert!(err.to_string().contains("appid"));
    }

    #[test]
    fn test_validate_empty_appid() {
        let config = create_config(layer(json!({"weapp": {"appid": ""}})), Platform::Weapp);
        assert!(validate_config(&config, Platform::Weapp).is_err());
    }

    #[test]
    fn test_validate_missing_block() {
        let config = BuiltinDefaults::default().to_layer();
        let err = validate_config(&config, Platform::Tiktok).unwrap_err();

        assert!(matches!(err, ConfigError::PlatformConfigMissing(Platform::Tiktok)));
    }

    #[test]
    fn test_user_options_file_under_cli() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "robot = 3").unwrap();
        writeln!(temp, "desc = \"from file\"").unwrap();
        writeln!(temp, "[weapp]").unwrap();
        writeln!(temp, "appid = \"wxfile\"").unwrap();
        writeln!(temp, "ignores = [\"node_modules/**\"]").unwrap();

        let cli = layer(json!({"robot": 5}));
        let options = UserOptions::load(Some(temp.path()), cli).unwrap();

        assert_eq!(options.config.robot, Some(5));
        assert_eq!(options.config.desc.as_deref(), Some("from file"));
        assert_eq!(options.config.get("weapp.appid"), Some(json!("wxfile")));
        assert_eq!(options.sources[0].origin, ConfigOrigin::File);
        assert_eq!(options.sources[1].origin, ConfigOrigin::Cli);
    }

    #[test]
    fn test_file_extra_keys_kept_typed() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "uploadTimeout = 60").unwrap();
        writeln!(temp, "[setting]").unwrap();
        writeln!(temp, "es6 = false").unwrap();
        writeln!(temp, "minifyWXML = true").unwrap();
        writeln!(temp, "[weapp]").unwrap();
        writeln!(temp, "robot = 2").unwrap();

        let options = UserOptions::load(Some(temp.path()), Config::default()).unwrap();
        let setting = options.config.setting.unwrap();

        assert_eq!(setting.es6, Some(false));
        assert_eq!(setting.extra.get("minifyWXML"), Some(&json!(true)));
        assert_eq!(options.config.extra.get("uploadTimeout"), Some(&json!(60)));
        assert_eq!(options.config.weapp.unwrap().robot, Some(2));
    }

    #[test]
    fn test_cli_globals_beat_file_platform_block() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[weapp]").unwrap();
        writeln!(temp, "appid = \"wx1\"").unwrap();
        writeln!(temp, "robot = 5").unwrap();
        writeln!(temp, "[weapp.setting]").unwrap();
        writeln!(temp, "minify = false").unwrap();
        writeln!(temp, "es6 = false").unwrap();

        let cli = layer(json!({"robot": 3, "setting": {"minify": true}}));
        let options = UserOptions::load(Some(temp.path()), cli).unwrap();
        let config = create_config(options.config, Platform::Weapp);

        assert_eq!(config.effective_robot(Platform::Weapp), 3);
        let setting = config.effective_setting(Platform::Weapp);
        assert_eq!(setting.minify, Some(true));
        assert_eq!(setting.es6, Some(false));
        assert!(config.alipay.is_none());
    }

    #[test]
    fn test_cli_platform_values_still_win() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[weapp]").unwrap();
        writeln!(temp, "robot = 5").unwrap();

        let cli = layer(json!({"robot": 3, "weapp": {"robot": 7}}));
        let options = UserOptions::load(Some(temp.path()), cli).unwrap();

        assert_eq!(options.config.effective_robot(Platform::Weapp), 7);
    }

    #[test]
    fn test_file_block_robot_kept_without_cli_robot() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "robot = 2").unwrap();
        writeln!(temp, "[weapp]").unwrap();
        writeln!(temp, "robot = 5").unwrap();

        let options = UserOptions::load(Some(temp.path()), Config::default()).unwrap();

        assert_eq!(options.config.effective_robot(Platform::Weapp), 5);
    }

    #[test]
    fn test_user_options_missing_file() {
        let result = UserOptions::load(Some(Path::new("/nonexistent/mini-ci.toml")), Config::default());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_user_options_bad_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "robot = [").unwrap();

        let result = UserOptions::load(Some(temp.path()), Config::default());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_effective_config_sources() {
        let user = UserOptions::from(layer(json!({"weapp": {"appid": "wx123"}})));
        let effective = EffectiveConfig::build(Platform::Weapp, user).unwrap();

        let origins: Vec<_> = effective.sources.iter().map(|s| s.origin).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::Platform, ConfigOrigin::Cli]
        );
        assert_eq!(effective.schema_id, SCHEMA_ID);

        let json: Value = serde_json::from_str(&effective.to_json().unwrap()).unwrap();
        assert_eq!(json["platform"], "weapp");
        assert_eq!(json["config"]["weapp"]["appid"], "wx123");
    }

    #[test]
    fn test_effective_config_validates() {
        let result = EffectiveConfig::build(Platform::Weapp, UserOptions::default());
        assert!(result.is_err());
    }
}
