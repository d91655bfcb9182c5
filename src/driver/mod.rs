//! Lifecycle contract for platform drivers
//!
//! A driver is created for one run, bound to a project path, initialized,
//! and then asked to perform exactly one action.

use std::path::PathBuf;

use crate::config::Config;
use crate::logger::Logger;
use crate::platform::Platform;
use crate::sdk::BackendError;

/// What a finished action asks of the process
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Return normally
    Done,
    /// Terminate the process with this status
    Exit(i32),
}

impl Outcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Outcome::Done => None,
            Outcome::Exit(code) => Some(*code),
        }
    }
}

/// Everything a driver factory receives
#[derive(Debug, Clone)]
pub struct DriverContext {
    /// Resolved and validated configuration
    pub config: Config,

    pub logger: Logger,

    /// Directory the tool was invoked from; relative credential paths and
    /// the SDK lookup resolve against it
    pub cwd: PathBuf,
}

impl DriverContext {
    pub fn new(config: Config, logger: Logger, cwd: PathBuf) -> Self {
        Self {
            config,
            logger,
            cwd,
        }
    }
}

/// Operations every platform driver implements
pub trait Driver {
    fn platform(&self) -> Platform;

    /// Record the resolved absolute project path
    fn set_project_path(&mut self, path: PathBuf);

    /// Check preconditions and connect to the CI backend.
    ///
    /// Must succeed before any action is invoked.
    fn init(&mut self) -> Result<(), DriverError>;

    /// Submit the project as the next release candidate
    fn upload(&mut self) -> Result<Outcome, DriverError>;

    /// Submit the project as a development build and show its QR code
    fn preview(&mut self) -> Result<Outcome, DriverError>;

    /// The desktop-tool launcher, for platforms that have one
    fn opener(&mut self) -> Option<&mut dyn Opener> {
        None
    }
}

/// Optional capability: open the project in the platform's desktop tool
pub trait Opener {
    fn open(&mut self) -> Result<Outcome, DriverError>;
}

/// Driver errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("missing \"{0}\" options block")]
    PlatformConfigMissing(Platform),

    #[error("missing required config: {platform}.{field}")]
    MissingField {
        platform: Platform,
        field: &'static str,
    },

    #[error("dependency {name} is not installed (looked in {searched})")]
    SdkNotInstalled { name: String, searched: String },

    #[error("private key file does not exist, aborting: {}", .0.display())]
    PrivateKeyMissing(PathBuf),

    #[error("robot must be between 1 and 30, got {0}")]
    InvalidRobot(u32),

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidIgnore {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("driver used before init()")]
    NotInitialized,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
