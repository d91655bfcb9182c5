//! Platform registry
//!
//! Maps each supported platform to the factory that builds its driver.
//! Platforms without a registered factory still have configuration
//! defaults but cannot be dispatched to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::driver::{Driver, DriverContext};
use crate::weapp;

/// Known mini-program ecosystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// WeChat mini program
    Weapp,
    /// Alipay mini program
    Alipay,
    /// Baidu smart program
    Swan,
    /// Douyin mini program
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Weapp,
        Platform::Alipay,
        Platform::Swan,
        Platform::Tiktok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Weapp => "weapp",
            Platform::Alipay => "alipay",
            Platform::Swan => "swan",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| RegistryError::Unsupported(s.to_string()))
    }
}

/// Builds a driver bound to one resolved configuration
pub type DriverFactory = fn(DriverContext) -> Box<dyn Driver>;

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

/// Table of platform → driver factory, in registration order
#[derive(Clone)]
pub struct Registry {
    entries: Vec<(Platform, DriverFactory)>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The drivers shipped with this crate
    pub fn builtin() -> Self {
        Self::new().register(Platform::Weapp, weapp::factory)
    }

    /// Register (or replace) the factory for `platform`
    pub fn register(mut self, platform: Platform, factory: DriverFactory) -> Self {
        match self.entries.iter_mut().find(|(p, _)| *p == platform) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((platform, factory)),
        }
        self
    }

    pub fn supported_platforms(&self) -> Vec<Platform> {
        self.entries.iter().map(|(p, _)| *p).collect()
    }

    pub fn is_supported(&self, platform: Platform) -> bool {
        self.entries.iter().any(|(p, _)| *p == platform)
    }

    /// Build a driver for `platform` bound to `ctx`
    pub fn create_driver(
        &self,
        platform: Platform,
        ctx: DriverContext,
    ) -> Result<Box<dyn Driver>, RegistryError> {
        let factory = self
            .entries
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, f)| *f)
            .ok_or_else(|| RegistryError::Unsupported(platform.to_string()))?;

        Ok(factory(ctx))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("platforms", &self.supported_platforms())
            .finish()
    }
}

/// Platforms the built-in registry can dispatch to
pub fn supported_platforms() -> Vec<Platform> {
    Registry::builtin().supported_platforms()
}

/// Build a driver from the built-in registry
pub fn create_driver(
    platform: Platform,
    ctx: DriverContext,
) -> Result<Box<dyn Driver>, RegistryError> {
    Registry::builtin().create_driver(platform, ctx)
}
