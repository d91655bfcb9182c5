//! Test fixtures for dispatch tests
//!
//! This module provides:
//! - Fake drivers that record each lifecycle call through the run's logger
//! - Registries wired to those drivers
//! - Temporary project directories

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use mini_ci::driver::{Driver, DriverContext, DriverError, Opener, Outcome};
use mini_ci::logger::Logger;
use mini_ci::platform::{Platform, Registry};
use mini_ci::sdk::BackendError;
use tempfile::TempDir;

/// Prefix of every line a fake driver logs
pub const FAKE: &str = "fake:";

/// Which lifecycle call a fake driver fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    Init,
    Preview,
}

/// Driver that logs every call instead of talking to a backend
pub struct FakeDriver {
    logger: Logger,
    fail_at: FailAt,
    with_opener: bool,
}

impl FakeDriver {
    fn build(ctx: DriverContext, fail_at: FailAt, with_opener: bool) -> Box<dyn Driver> {
        let logger = ctx.logger.clone();
        logger.info(format!("{} created", FAKE));
        if let Some(version) = &ctx.config.version {
            logger.info(format!("{} version {}", FAKE, version));
        }
        if let Some(desc) = &ctx.config.desc {
            logger.info(format!("{} desc {}", FAKE, desc));
        }
        if let Some(path) = &ctx.config.project_path {
            logger.info(format!("{} config path {}", FAKE, path.display()));
        }
        Box::new(Self {
            logger,
            fail_at,
            with_opener,
        })
    }

    fn record(&self, call: &str) {
        self.logger.info(format!("{} {}", FAKE, call));
    }
}

impl Driver for FakeDriver {
    fn platform(&self) -> Platform {
        Platform::Weapp
    }

    fn set_project_path(&mut self, path: PathBuf) {
        self.record(&format!("set_project_path {}", path.display()));
    }

    fn init(&mut self) -> Result<(), DriverError> {
        self.record("init");
        if self.fail_at == FailAt::Init {
            return Err(DriverError::PrivateKeyMissing(PathBuf::from("/keys/missing.key")));
        }
        Ok(())
    }

    fn upload(&mut self) -> Result<Outcome, DriverError> {
        self.record("upload");
        Ok(Outcome::Exit(0))
    }

    fn preview(&mut self) -> Result<Outcome, DriverError> {
        self.record("preview");
        if self.fail_at == FailAt::Preview {
            return Err(BackendError::Rejected("preview rejected".to_string()).into());
        }
        Ok(Outcome::Done)
    }

    fn opener(&mut self) -> Option<&mut dyn Opener> {
        if self.with_opener {
            Some(self)
        } else {
            None
        }
    }
}

impl Opener for FakeDriver {
    fn open(&mut self) -> Result<Outcome, DriverError> {
        self.record("open");
        Ok(Outcome::Done)
    }
}

pub fn recording_driver(ctx: DriverContext) -> Box<dyn Driver> {
    FakeDriver::build(ctx, FailAt::Nothing, true)
}

pub fn failing_init_driver(ctx: DriverContext) -> Box<dyn Driver> {
    FakeDriver::build(ctx, FailAt::Init, true)
}

pub fn failing_preview_driver(ctx: DriverContext) -> Box<dyn Driver> {
    FakeDriver::build(ctx, FailAt::Preview, true)
}

pub fn openerless_driver(ctx: DriverContext) -> Box<dyn Driver> {
    FakeDriver::build(ctx, FailAt::Nothing, false)
}

/// Registry with `factory` as the weapp driver
pub fn fake_registry(factory: fn(DriverContext) -> Box<dyn Driver>) -> Registry {
    Registry::new().register(Platform::Weapp, factory)
}

/// Empty project directory
pub fn temp_project() -> TempDir {
    TempDir::new().expect("create temp project")
}

/// Project directory whose `package.json` declares `version`
pub fn temp_project_with_version(version: &str) -> TempDir {
    let dir = temp_project();
    fs::write(
        dir.path().join("package.json"),
        format!(r#"{{"name":"demo","version":"{}"}}"#, version),
    )
    .expect("write package.json");
    dir
}

/// Index of the first captured line containing `needle`
pub fn position(lines: &[String], needle: &str) -> Option<usize> {
    lines.iter().position(|l| l.contains(needle))
}
