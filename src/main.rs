//! mini-ci CLI
//!
//! Entry point for the `mini-ci` command-line tool.

use clap::{Args, Parser, Subcommand};
use mini_ci::config::{Config, PlatformOptions, UserOptions, DEFAULT_CONFIG_FILE};
use mini_ci::{Dispatcher, Logger, Outcome, Platform};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "mini-ci")]
#[command(about = "Upload, preview or open mini-program projects", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the project in the platform's developer tool
    Open(TargetArgs),

    /// Upload the project as a release candidate
    Upload(TargetArgs),

    /// Upload the project as a development build and show its QR code
    Preview(TargetArgs),

    /// Print the resolved configuration as JSON
    Config {
        #[command(flatten)]
        target: TargetArgs,

        /// Print only the value at this dot-separated key (e.g. "weapp.appid")
        #[arg(long)]
        key: Option<String>,
    },
}

#[derive(Args, Clone)]
struct TargetArgs {
    /// Target platform (weapp, alipay, swan, tiktok)
    #[arg(long, short = 'p', default_value = "weapp")]
    platform: String,

    /// Project directory, relative to the working directory
    #[arg(long, default_value = "")]
    project_path: String,

    /// Config file (default: mini-ci.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Application identifier
    #[arg(long)]
    appid: Option<String>,

    /// Upload private key file
    #[arg(long)]
    private_key_path: Option<PathBuf>,

    /// Release slot (1-30)
    #[arg(long, short = 'r')]
    robot: Option<u32>,

    /// Version label of the submission
    #[arg(long = "version", id = "upload_version")]
    upload_version: Option<String>,

    /// Description of the submission
    #[arg(long)]
    desc: Option<String>,

    /// Log level (debug, info, warn, error, silent)
    #[arg(long)]
    log_level: Option<String>,

    /// Install location of the developer tool
    #[arg(long)]
    dev_tools_path: Option<PathBuf>,

    /// Glob pattern excluded from the upload (repeatable)
    #[arg(long = "ignore")]
    ignores: Vec<String>,
}

impl TargetArgs {
    /// CLI flags as the top configuration layer
    fn to_layer(&self) -> Config {
        let block = PlatformOptions {
            appid: self.appid.clone(),
            private_key_path: self.private_key_path.clone(),
            dev_tools_install_path: self.dev_tools_path.clone(),
            ignores: (!self.ignores.is_empty()).then(|| self.ignores.clone()),
            ..PlatformOptions::default()
        };

        let mut layer = Config {
            log_level: self.log_level.clone(),
            robot: self.robot,
            version: self.upload_version.clone(),
            desc: self.desc.clone(),
            ..Config::default()
        };
        if block != PlatformOptions::default() {
            if let Ok(platform) = self.platform.parse::<Platform>() {
                *layer.platform_slot(platform) = Some(block);
            }
        }
        layer
    }

    fn user_options(&self) -> UserOptions {
        let default_file = PathBuf::from(DEFAULT_CONFIG_FILE);
        let file = match &self.config {
            Some(path) => Some(path.clone()),
            None if default_file.is_file() => Some(default_file),
            None => None,
        };

        match UserOptions::load(file.as_deref(), self.to_layer()) {
            Ok(options) => options,
            Err(e) => {
                Logger::from_config(self.log_level.as_deref()).error(&e);
                process::exit(1);
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Open(target) => run_action("open", target),
        Commands::Upload(target) => run_action("upload", target),
        Commands::Preview(target) => run_action("preview", target),
        Commands::Config { target, key } => run_config(target, key),
    }
}

fn run_action(action: &str, target: TargetArgs) {
    let options = target.user_options();
    let logger = Logger::from_config(options.config.log_level.as_deref());

    logger.line();
    logger.info("starting mini-program CI");

    let dispatcher = Dispatcher::new().with_logger(logger.clone());
    match dispatcher.run(&target.platform, action, &target.project_path, options) {
        Ok(Outcome::Exit(code)) => process::exit(code),
        Ok(Outcome::Done) => {
            logger.success("CI flow finished");
            logger.line();
        }
        // Already logged by the dispatcher
        Err(e) => process::exit(e.exit_code()),
    }
}

fn run_config(target: TargetArgs, key: Option<String>) {
    let options = target.user_options();
    let logger = Logger::from_config(options.config.log_level.as_deref());
    let dispatcher = Dispatcher::new().with_logger(logger.clone());

    let effective = match dispatcher.resolve(&target.platform, &target.project_path, options) {
        Ok(effective) => effective,
        Err(e) => {
            logger.error(&e);
            process::exit(e.exit_code());
        }
    };

    let output = match key {
        Some(key) => match effective.config.get(&key) {
            Some(value) => serde_json::to_string_pretty(&value),
            None => {
                logger.error(format!("no such key: {}", key));
                process::exit(1);
            }
        },
        None => effective.to_json(),
    };

    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            logger.error(format!("failed to serialize config: {}", e));
            process::exit(1);
        }
    }
}
