//! WeChat mini-program driver
//!
//! Uploads and previews go through `miniprogram-ci`; `open` launches the
//! WeChat DevTools IDE.

pub mod devtools;

use std::path::{Path, PathBuf};

use chrono::Local;
use globset::Glob;

use crate::config::{Config, DEFAULT_PROJECT_KIND};
use crate::driver::{Driver, DriverContext, DriverError, Opener, Outcome};
use crate::logger::{Logger, ProcessKind};
use crate::platform::Platform;
use crate::project::{generate_desc, generate_version};
use crate::qr;
use crate::sdk::{locate_sdk, CiBackend, MiniprogramCli, ProjectHandle, SubmitRequest};

use devtools::DevTools;

/// File the preview QR code image is written to, under the project path
pub const PREVIEW_QRCODE_FILE: &str = "preview.jpg";

/// File the release-candidate QR code is written to, under the project path
pub const UPLOAD_QRCODE_FILE: &str = "upload.png";

/// Highest release slot the backend accepts
pub const MAX_ROBOT: u32 = 30;

/// Registry entry point
pub fn factory(ctx: DriverContext) -> Box<dyn Driver> {
    Box::new(WeappDriver::new(ctx))
}

/// Landing page encoded in the release-candidate QR code
pub fn experience_url(appid: &str) -> String {
    format!(
        "https://open.weixin.qq.com/sns/getexpappinfo?appid={}#wechat-redirect",
        appid
    )
}

pub struct WeappDriver {
    config: Config,
    logger: Logger,
    cwd: PathBuf,
    project_path: PathBuf,
    backend: Option<Box<dyn CiBackend>>,
    project: Option<ProjectHandle>,
    devtools: Option<DevTools>,
}

impl WeappDriver {
    pub fn new(ctx: DriverContext) -> Self {
        let project_path = ctx.cwd.clone();
        Self {
            config: ctx.config,
            logger: ctx.logger,
            cwd: ctx.cwd,
            project_path,
            backend: None,
            project: None,
            devtools: None,
        }
    }

    /// Use `backend` instead of locating `miniprogram-ci` during `init`
    pub fn with_backend(ctx: DriverContext, backend: Box<dyn CiBackend>) -> Self {
        let mut driver = Self::new(ctx);
        driver.backend = Some(backend);
        driver
    }

    pub fn project(&self) -> Option<&ProjectHandle> {
        self.project.as_ref()
    }

    fn missing(field: &'static str) -> DriverError {
        DriverError::MissingField {
            platform: Platform::Weapp,
            field,
        }
    }

    fn submission(&self) -> Result<(&dyn CiBackend, SubmitRequest), DriverError> {
        let backend = self.backend.as_deref().ok_or(DriverError::NotInitialized)?;
        let project = self.project.clone().ok_or(DriverError::NotInitialized)?;

        let request = SubmitRequest {
            project,
            version: generate_version(self.config.version.as_deref(), &self.cwd, &self.logger),
            desc: generate_desc(self.config.desc.as_deref()),
            robot: self.config.effective_robot(Platform::Weapp),
            setting: self.config.effective_setting(Platform::Weapp),
        };
        Ok((backend, request))
    }

    fn publish_experience_code(&self, path: &Path, content: &str) -> Result<(), qr::QrError> {
        self.logger.print(&qr::render_terminal(content)?);
        qr::write_png(path, content)?;
        Ok(())
    }

    fn now() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl Driver for WeappDriver {
    fn platform(&self) -> Platform {
        Platform::Weapp
    }

    fn set_project_path(&mut self, path: PathBuf) {
        self.project_path = path;
    }

    fn init(&mut self) -> Result<(), DriverError> {
        let options = self
            .config
            .platform(Platform::Weapp)
            .cloned()
            .ok_or(DriverError::PlatformConfigMissing(Platform::Weapp))?;

        if self.backend.is_none() {
            let program = locate_sdk(&self.cwd)?;
            self.logger.debug(format!("using {}", program.display()));
            self.backend = Some(Box::new(MiniprogramCli::new(program, self.logger.clone())));
        }

        let install_path = options
            .dev_tools_install_path
            .unwrap_or_else(devtools::default_install_path);
        self.devtools = Some(DevTools::new(install_path));

        let appid = options
            .appid
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Self::missing("appid"))?;

        let robot = self.config.effective_robot(Platform::Weapp);
        if !(1..=MAX_ROBOT).contains(&robot) {
            return Err(DriverError::InvalidRobot(robot));
        }

        let ignores = options.ignores.unwrap_or_default();
        for pattern in &ignores {
            Glob::new(pattern).map_err(|source| DriverError::InvalidIgnore {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let key_path = options
            .private_key_path
            .ok_or_else(|| Self::missing("privateKeyPath"))?;
        let key_path = if key_path.is_absolute() {
            key_path
        } else {
            self.cwd.join(key_path)
        };
        if !key_path.exists() {
            return Err(DriverError::PrivateKeyMissing(key_path));
        }

        self.project = Some(ProjectHandle {
            kind: options
                .kind
                .unwrap_or_else(|| DEFAULT_PROJECT_KIND.to_string()),
            appid,
            project_path: options
                .project_path
                .unwrap_or_else(|| self.project_path.clone()),
            private_key_path: key_path,
            ignores,
        });
        Ok(())
    }

    fn upload(&mut self) -> Result<Outcome, DriverError> {
        let (backend, request) = self.submission()?;

        self.logger
            .process(ProcessKind::Start, "uploading release candidate to the WeChat backend");
        self.logger.process(
            ProcessKind::Remind,
            format!(
                "version \"{}\", description \"{}\"",
                request.version, request.desc
            ),
        );

        match backend.upload(&request) {
            Ok(result) => {
                let sizes = result.size_summary().unwrap_or_default();
                self.logger
                    .success(format!("upload succeeded {} {}", Self::now(), sizes).trim_end());
            }
            Err(e) => {
                self.logger.process(
                    ProcessKind::Error,
                    format!("upload failed {}\n{}", Self::now(), e),
                );
                return Ok(Outcome::Exit(1));
            }
        }

        let qr_path = self.project_path.join(UPLOAD_QRCODE_FILE);
        let content = experience_url(&request.project.appid);
        if let Err(e) = self.publish_experience_code(&qr_path, &content) {
            self.logger.process(
                ProcessKind::Error,
                format!("failed to generate the release-candidate QR code: {}", e),
            );
            return Ok(Outcome::Done);
        }

        self.logger.process(
            ProcessKind::Remind,
            format!(
                "release-candidate QR code saved to \"{}\", content: \"{}\"",
                qr_path.display(),
                content
            ),
        );
        self.logger.process(
            ProcessKind::Remind,
            "you may need to mark this version as the trial version in the WeChat console",
        );
        self.logger.process(
            ProcessKind::Remind,
            format!(
                "no need if robot {} was already set as the trial version",
                request.robot
            ),
        );
        Ok(Outcome::Exit(0))
    }

    fn preview(&mut self) -> Result<Outcome, DriverError> {
        let (backend, request) = self.submission()?;

        self.logger.process(
            ProcessKind::Start,
            "uploading development build to the WeChat backend for preview",
        );

        let qr_path = self.project_path.join(PREVIEW_QRCODE_FILE);
        match backend.preview(&request, &qr_path) {
            Ok(result) => {
                if let Some(sizes) = result.size_summary() {
                    self.logger
                        .success(format!("development build uploaded {} {}", Self::now(), sizes));
                }
            }
            Err(e) => {
                self.logger.process(
                    ProcessKind::Error,
                    format!("upload failed {}\n{}", Self::now(), e),
                );
                return Ok(Outcome::Done);
            }
        }

        let shown = qr::read_image_content(&qr_path).and_then(|content| {
            self.logger.print(&qr::render_terminal(&content)?);
            Ok(content)
        });
        match shown {
            Ok(content) => self.logger.process(
                ProcessKind::Remind,
                format!(
                    "preview QR code saved to \"{}\", content: {}",
                    qr_path.display(),
                    content
                ),
            ),
            Err(e) => self.logger.process(
                ProcessKind::Error,
                format!("failed to read the preview QR code: {}", e),
            ),
        }
        Ok(Outcome::Done)
    }

    fn opener(&mut self) -> Option<&mut dyn Opener> {
        Some(self)
    }
}

impl Opener for WeappDriver {
    fn open(&mut self) -> Result<Outcome, DriverError> {
        let devtools = self.devtools.as_ref().ok_or(DriverError::NotInitialized)?;
        Ok(devtools.open_project(&self.project_path, &self.logger))
    }
}
