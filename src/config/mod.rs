//! Configuration resolution
//!
//! Implements the 3-layer configuration merge:
//! 1. Built-in global defaults
//! 2. Platform defaults
//! 3. User options (config file, then CLI flags)

mod defaults;
mod effective;
mod merge;
mod schema;

pub use defaults::{platform_defaults, BuiltinDefaults, DEFAULT_PROJECT_KIND};
pub use effective::{
    create_config, validate_config, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig,
    UserOptions, DEFAULT_CONFIG_FILE,
};
pub use merge::{deep_merge, deep_merge_value, merge_nested, merge_scalar, Merge};
pub use schema::{CompileSettings, Config, PlatformOptions};
