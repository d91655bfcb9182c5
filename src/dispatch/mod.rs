//! Action dispatch
//!
//! One run: check the platform and action, resolve the project path, build
//! and validate the configuration, create and initialize the driver, then
//! invoke the requested action on it.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::{ConfigError, EffectiveConfig, UserOptions};
use crate::driver::{DriverContext, DriverError, Outcome};
use crate::logger::Logger;
use crate::platform::{Platform, Registry, RegistryError};
use crate::project::{generate_desc, generate_version, resolve_project_path};

/// Lifecycle action requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the project in the platform's desktop tool
    Open,
    /// Submit as the next release candidate
    Upload,
    /// Submit as a development build
    Preview,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Open, Action::Upload, Action::Preview];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Open => "open",
            Action::Upload => "upload",
            Action::Preview => "preview",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DispatchError::UnsupportedAction(s.to_string()))
    }
}

/// Dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl DispatchError {
    /// Exit status for the binary
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Runs actions against the drivers of a registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Registry,
    cwd: PathBuf,
    logger: Option<Logger>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher over the built-in drivers, rooted at the current directory
    pub fn new() -> Self {
        Self::with_registry(Registry::builtin())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            cwd: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            logger: None,
        }
    }

    /// Resolve relative paths and look for `package.json` under `cwd`
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Log through `logger` instead of one built from the `logLevel` option
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn supported_platforms(&self) -> Vec<Platform> {
        self.registry.supported_platforms()
    }

    fn logger_for(&self, user: &UserOptions) -> Logger {
        match &self.logger {
            Some(logger) => logger.clone(),
            None => Logger::from_config(user.config.log_level.as_deref()),
        }
    }

    fn supported_platform(&self, name: &str, logger: &Logger) -> Result<Platform, RegistryError> {
        match name.parse::<Platform>() {
            Ok(p) if self.registry.is_supported(p) => Ok(p),
            _ => {
                logger.warn(format!("platform \"{}\" is not supported yet", name));
                Err(RegistryError::Unsupported(name.to_string()))
            }
        }
    }

    /// Build the validated configuration `run` would hand to the driver.
    pub fn resolve(
        &self,
        platform: &str,
        project_path: &str,
        options: impl Into<UserOptions>,
    ) -> DispatchResult<EffectiveConfig> {
        let user = options.into();
        let logger = self.logger_for(&user);
        let platform = self.supported_platform(platform, &logger)?;
        let path = resolve_project_path(project_path, &self.cwd);
        Ok(self.build_config(platform, path, user, &logger)?)
    }

    fn build_config(
        &self,
        platform: Platform,
        project_path: PathBuf,
        mut user: UserOptions,
        logger: &Logger,
    ) -> Result<EffectiveConfig, ConfigError> {
        let version = generate_version(user.config.version.as_deref(), &self.cwd, logger);
        let desc = generate_desc(user.config.desc.as_deref());

        user.config.project_path = Some(project_path);
        user.config.version = Some(version);
        user.config.desc = Some(desc);

        EffectiveConfig::build(platform, user)
    }

    /// Perform `action` for `platform` on the project at `project_path`.
    ///
    /// Errors are logged before being returned. An `Outcome::Exit` is
    /// returned, never acted on.
    pub fn run(
        &self,
        platform: &str,
        action: &str,
        project_path: &str,
        options: impl Into<UserOptions>,
    ) -> DispatchResult<Outcome> {
        let user = options.into();
        let logger = self.logger_for(&user);

        let result = self.dispatch(platform, action, project_path, user, &logger);
        if let Err(e) = &result {
            logger.error(e);
        }
        result
    }

    fn dispatch(
        &self,
        platform: &str,
        action: &str,
        project_path: &str,
        user: UserOptions,
        logger: &Logger,
    ) -> DispatchResult<Outcome> {
        let platform = self.supported_platform(platform, logger)?;
        let action: Action = action.parse()?;

        let project_path = resolve_project_path(project_path, &self.cwd);
        logger.debug(format!("project path: {}", project_path.display()));

        let effective = self.build_config(platform, project_path.clone(), user, logger)?;

        let ctx = DriverContext::new(effective.config, logger.clone(), self.cwd.clone());
        let mut driver = self.registry.create_driver(platform, ctx)?;
        driver.set_project_path(project_path);
        driver.init()?;

        let outcome = match action {
            Action::Open => match driver.opener() {
                Some(opener) => opener.open()?,
                None => {
                    logger.warn(format!("{} has no desktop tool to open", platform));
                    Outcome::Done
                }
            },
            Action::Upload => {
                logger.task("uploading mini-program");
                driver.upload()?
            }
            Action::Preview => {
                logger.task("previewing mini-program");
                driver.preview()?
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::LogLevel;
    use serde_json::json;
    use tempfile::TempDir;

    fn options(value: serde_json::Value) -> Config {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("open".parse::<Action>().unwrap(), Action::Open);
        assert_eq!("upload".parse::<Action>().unwrap(), Action::Upload);
        assert_eq!("preview".parse::<Action>().unwrap(), Action::Preview);
        assert!(matches!(
            "deploy".parse::<Action>(),
            Err(DispatchError::UnsupportedAction(a)) if a == "deploy"
        ));
    }

    #[test]
    fn test_resolve_injects_run_values() {
        let dir = TempDir::new().unwrap();
        let dispatcher = Dispatcher::new()
            .in_dir(dir.path())
            .with_logger(Logger::new(LogLevel::Silent));

        let effective = dispatcher
            .resolve(
                "weapp",
                "app",
                options(json!({"weapp": {"appid": "wx123"}, "version": "3.1.0"})),
            )
            .unwrap();

        let config = effective.config;
        assert_eq!(config.project_path, Some(dir.path().join("app")));
        assert_eq!(config.version.as_deref(), Some("3.1.0"));
        assert!(config.desc.unwrap().starts_with("CI build "));
        assert_eq!(config.robot, Some(1));
    }

    #[test]
    fn test_resolve_rejects_missing_appid() {
        let dispatcher = Dispatcher::new().with_logger(Logger::new(LogLevel::Silent));
        let err = dispatcher.resolve("weapp", "", Config::default()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Config(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_driverless_platform() {
        let (logger, capture) = Logger::capture(LogLevel::Info);
        let dispatcher = Dispatcher::new().with_logger(logger);

        let err = dispatcher
            .resolve("alipay", "", options(json!({"alipay": {"appid": "ali1"}})))
            .unwrap_err();

        assert!(matches!(err, DispatchError::Registry(RegistryError::Unsupported(p)) if p == "alipay"));
        assert!(capture.contains("platform \"alipay\" is not supported yet"));
    }

    #[test]
    fn test_unknown_platform_is_logged() {
        let (logger, capture) = Logger::capture(LogLevel::Info);
        let dispatcher = Dispatcher::new().with_logger(logger);

        let err = dispatcher
            .run("qywx", "upload", ".", Config::default())
            .unwrap_err();

        assert!(matches!(err, DispatchError::Registry(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(capture.contains("[WARN] platform \"qywx\" is not supported yet"));
        assert!(capture.contains("[ERROR] unsupported platform: qywx"));
    }

    #[test]
    fn test_registered_but_driverless_platform() {
        let (logger, capture) = Logger::capture(LogLevel::Info);
        let dispatcher = Dispatcher::new().with_logger(logger);

        let err = dispatcher
            .run("alipay", "upload", ".", Config::default())
            .unwrap_err();

        assert!(matches!(err, DispatchError::Registry(RegistryError::Unsupported(p)) if p == "alipay"));
        assert!(capture.contains("not supported yet"));
    }

    #[test]
    fn test_unknown_action_before_config() {
        let (logger, capture) = Logger::capture(LogLevel::Info);
        let dispatcher = Dispatcher::new().with_logger(logger);

        // No appid: reaching config validation would raise a different error.
        let err = dispatcher
            .run("weapp", "deploy", ".", Config::default())
            .unwrap_err();

        assert!(matches!(err, DispatchError::UnsupportedAction(_)));
        assert!(capture.contains("[ERROR] unsupported action: deploy"));
    }
}
