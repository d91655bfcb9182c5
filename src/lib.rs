//! mini-ci - mini-program CI dispatch
//!
//! This crate resolves a layered configuration for a mini-program project,
//! selects the platform driver and runs one lifecycle action against it:
//! open the project in the desktop tool, upload a release candidate, or
//! upload a development build for preview.

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod logger;
pub mod platform;
pub mod project;
pub mod qr;
pub mod sdk;
pub mod weapp;

pub use config::{create_config, deep_merge, validate_config, Config, ConfigError, EffectiveConfig, UserOptions};
pub use dispatch::{Action, DispatchError, Dispatcher};
pub use driver::{Driver, DriverContext, DriverError, Opener, Outcome};
pub use logger::{LogLevel, Logger};
pub use platform::{create_driver, supported_platforms, Platform, Registry, RegistryError};
