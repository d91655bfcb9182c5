//! WeChat DevTools launcher
//!
//! The DevTools CLI only accepts commands while the IDE's service port is
//! enabled; the IDE records that switch in a `.ide-status` file under the
//! user's profile, in a directory named after the MD5 of the install path.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use md5::{Digest, Md5};

use crate::driver::Outcome;
use crate::logger::{Logger, ProcessKind};

const IDE_DIR_NAME: &str = "微信开发者工具";

const PORT_CLOSED: &str = "the DevTools service port is closed. Enable it under Settings -> Security \
    to drive the tool from the command line: https://developers.weixin.qq.com/miniprogram/dev/devtools/cli.html";

/// Default install location for the current OS
pub fn default_install_path() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/wechatwebdevtools.app")
    } else {
        PathBuf::from(r"C:\Program Files (x86)\Tencent\微信web开发者工具")
    }
}

/// Path of the DevTools command-line entry point
pub fn cli_path(install_path: &Path) -> PathBuf {
    if cfg!(windows) {
        install_path.join("cli.bat")
    } else {
        install_path.join("Contents").join("MacOS").join("cli")
    }
}

/// Location of the `.ide-status` file for an installation
pub fn ide_status_file(home: &Path, install_path: &Path) -> PathBuf {
    let digest = hex::encode(Md5::digest(install_path.to_string_lossy().as_bytes()));
    let base = if cfg!(windows) {
        home.join("AppData")
            .join("Local")
            .join(IDE_DIR_NAME)
            .join("User Data")
    } else {
        home.join("Library")
            .join("Application Support")
            .join(IDE_DIR_NAME)
    };
    base.join(digest).join("Default").join(".ide-status")
}

/// A DevTools installation
#[derive(Debug, Clone)]
pub struct DevTools {
    install_path: PathBuf,
    home: Option<PathBuf>,
}

impl DevTools {
    pub fn new(install_path: PathBuf) -> Self {
        Self {
            install_path,
            home: dirs::home_dir(),
        }
    }

    /// Use `home` instead of the environment's home directory
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = Some(home);
        self
    }

    pub fn install_path(&self) -> &Path {
        &self.install_path
    }

    /// Whether the IDE reports its service port as enabled
    fn service_port_open(&self) -> bool {
        let Some(home) = &self.home else {
            return false;
        };
        let status_file = ide_status_file(home, &self.install_path);
        match fs::read_to_string(&status_file) {
            Ok(status) => status.trim() != "Off",
            Err(_) => false,
        }
    }

    /// Open `project` in the IDE. Problems are logged, never raised.
    pub fn open_project(&self, project: &Path, logger: &Logger) -> Outcome {
        if !self.install_path.exists() {
            logger.process(
                ProcessKind::Error,
                format!(
                    "WeChat DevTools install path does not exist: {}",
                    self.install_path.display()
                ),
            );
            return Outcome::Done;
        }

        if !self.service_port_open() {
            logger.process(ProcessKind::Error, PORT_CLOSED);
            return Outcome::Done;
        }

        let cli = cli_path(&self.install_path);
        if !cli.exists() {
            logger.process(
                ProcessKind::Error,
                format!("DevTools CLI does not exist: {}", cli.display()),
            );
            return Outcome::Done;
        }

        logger.process(
            ProcessKind::Start,
            format!("opening WeChat DevTools for {}", project.display()),
        );

        match Command::new(&cli)
            .arg("open")
            .arg("--project")
            .arg(project)
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => logger.process(
                ProcessKind::Error,
                format!("DevTools CLI exited with {}", status),
            ),
            Err(e) => logger.process(
                ProcessKind::Error,
                format!("failed to run {}: {}", cli.display(), e),
            ),
        }
        Outcome::Done
    }
}
