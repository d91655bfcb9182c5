//! `miniprogram-ci` command-line backend
//!
//! Locates the tool (project `node_modules/.bin` first, then `PATH`) and
//! runs one subprocess per submission.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{BackendError, CiBackend, SubmitRequest, SubmitResult};
use crate::driver::DriverError;
use crate::logger::Logger;

/// Package name of the WeChat CI SDK
pub const SDK_NAME: &str = "miniprogram-ci";

/// Find the `miniprogram-ci` executable for a project rooted at `root`.
pub fn locate_sdk(root: &Path) -> Result<PathBuf, DriverError> {
    let local_bin = root.join("node_modules").join(".bin");
    let mut searched = vec![local_bin.clone()];
    if let Some(paths) = env::var_os("PATH") {
        searched.extend(env::split_paths(&paths));
    }

    searched
        .iter()
        .flat_map(|dir| executable_names().into_iter().map(move |n| dir.join(n)))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| DriverError::SdkNotInstalled {
            name: SDK_NAME.to_string(),
            searched: format!("{} and PATH", local_bin.display()),
        })
}

fn executable_names() -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{}.cmd", SDK_NAME), format!("{}.exe", SDK_NAME)]
    } else {
        vec![SDK_NAME.to_string()]
    }
}

/// Backend that shells out to `miniprogram-ci`
#[derive(Debug, Clone)]
pub struct MiniprogramCli {
    program: PathBuf,
    logger: Logger,
}

impl MiniprogramCli {
    pub fn new(program: PathBuf, logger: Logger) -> Self {
        Self { program, logger }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments shared by `upload` and `preview`
    pub fn submit_args(request: &SubmitRequest) -> Vec<OsString> {
        let project = &request.project;
        let setting = &request.setting;
        let mut args: Vec<OsString> = vec![
            "--project-type".into(),
            project.kind.clone().into(),
            "--pp".into(),
            project.project_path.clone().into(),
            "--pkp".into(),
            project.private_key_path.clone().into(),
            "--appid".into(),
            project.appid.clone().into(),
            "--uv".into(),
            request.version.clone().into(),
            "--ud".into(),
            request.desc.clone().into(),
            "-r".into(),
            request.robot.to_string().into(),
            "--enable-es6".into(),
            setting.es6_enabled().to_string().into(),
            "--enable-minify".into(),
            setting.minify_enabled().to_string().into(),
            "--enable-autoprefixwxss".into(),
            setting.auto_prefix_enabled().to_string().into(),
        ];
        for pattern in &project.ignores {
            args.push("--ignores".into());
            args.push(pattern.into());
        }
        args
    }

    fn run(&self, subcommand: &str, args: Vec<OsString>) -> Result<SubmitResult, BackendError> {
        self.logger.debug(format!(
            "running {} {}",
            self.program.display(),
            subcommand
        ));

        let output = Command::new(&self.program)
            .arg(subcommand)
            .args(&args)
            .output()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        self.finish(subcommand, output)
    }

    fn finish(&self, subcommand: &str, output: Output) -> Result<SubmitResult, BackendError> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            self.logger.debug(line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Failed {
                program: format!("{} {}", SDK_NAME, subcommand),
                status: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(parse_result(&stdout))
    }
}

/// Pick the last JSON object on stdout that parses as a submission result.
fn parse_result(stdout: &str) -> SubmitResult {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
        .unwrap_or_default()
}

impl CiBackend for MiniprogramCli {
    fn upload(&self, request: &SubmitRequest) -> Result<SubmitResult, BackendError> {
        self.run("upload", Self::submit_args(request))
    }

    fn preview(
        &self,
        request: &SubmitRequest,
        qrcode_dest: &Path,
    ) -> Result<SubmitResult, BackendError> {
        let mut args = Self::submit_args(request);
        args.extend([
            "--qrcode-format".into(),
            "image".into(),
            "--qrcode-output-dest".into(),
            qrcode_dest.as_os_str().to_os_string(),
        ]);
        self.run("preview", args)
    }
}
