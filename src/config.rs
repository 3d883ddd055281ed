use std::path::PathBuf;

use thiserror::Error;

use crate::probe::EnvironmentProbe;
use crate::settings::SETTINGS_FILE_NAME;

pub const HOME_ENV: &str = "SWITCHBOARD_HOME";
pub const SRC_DIR_ENV: &str = "SWITCHBOARD_SRC_DIR";
pub const LAUNCH_METHOD_ENV: &str = "SWITCHBOARD_LAUNCH_METHOD";
pub const MODULES_DIR_ENV: &str = "SWITCHBOARD_MODULES_DIR";
pub const PORT_ENV: &str = "SWITCHBOARD_PORT";
pub const CHANNEL_ENV: &str = "SWITCHBOARD_CHANNEL";

pub const DEFAULT_PORT: u16 = 8040;
pub const DEFAULT_CHANNEL: &str = "latest";

/// Environment-variable overrides, captured once so resolution stays a pure
/// function of its inputs (tests construct this directly).
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub src_dir: Option<String>,
    pub launch_method: Option<String>,
    pub modules_dir: Option<String>,
    pub port: Option<String>,
    pub channel: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        EnvOverrides {
            home: std::env::var(HOME_ENV).ok(),
            src_dir: std::env::var(SRC_DIR_ENV).ok(),
            launch_method: std::env::var(LAUNCH_METHOD_ENV).ok(),
            modules_dir: std::env::var(MODULES_DIR_ENV).ok(),
            port: std::env::var(PORT_ENV).ok(),
            channel: std::env::var(CHANNEL_ENV).ok(),
        }
    }
}

/// The flags main.rs extracts from the clap surface.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub launch_method: Option<String>,
    pub channel: Option<String>,
    pub update: bool,
}

/// Everything the orchestrator needs, resolved with fixed precedence:
/// CLI flag > environment variable > persisted settings > computed default.
///
/// `launch_method` stays a free-form string here; it is validated against
/// `LaunchMethod` at orchestration time, not at parse time.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub launch_method: String,
    pub channel: String,
    pub update: bool,
    pub port: u16,
    pub modules_dir: PathBuf, // hot-loaded device modules, watched by the hub
    pub settings_file: PathBuf,
    pub src_dir: PathBuf, // hub source checkout
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("invalid {PORT_ENV} value '{0}' (expected a port number 1-65535)")]
    InvalidPort(String),
}

/// `~/.switchboard`, or whatever `SWITCHBOARD_HOME` points at.
pub fn home_dir(env: &EnvOverrides) -> Result<PathBuf, ConfigError> {
    match &env.home {
        Some(h) => Ok(PathBuf::from(h)),
        None => dirs::home_dir()
            .map(|h| h.join(".switchboard"))
            .ok_or(ConfigError::NoHomeDir),
    }
}

/// Computed default when neither flag nor env var picks a launch method.
///
/// A detected engine wins even when its daemon is down or its version is
/// unreportable; the container path then fails loud with start guidance.
/// Only a host with no engine and Node.js at the supported major defaults
/// to the local process.
pub fn default_launch_method(probe: &EnvironmentProbe) -> &'static str {
    if probe.docker_detected() {
        "docker"
    } else if probe.node_supported() {
        "node"
    } else {
        "docker"
    }
}

pub fn resolve(
    cli: &CliOptions,
    env: &EnvOverrides,
    persisted_channel: Option<&str>,
    probe: &EnvironmentProbe,
) -> Result<ResolvedConfig, ConfigError> {
    let home = home_dir(env)?;

    let launch_method = cli
        .launch_method
        .clone()
        .or_else(|| env.launch_method.clone())
        .unwrap_or_else(|| default_launch_method(probe).to_string());

    let channel = cli
        .channel
        .clone()
        .or_else(|| env.channel.clone())
        .or_else(|| persisted_channel.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

    let port = match &env.port {
        Some(raw) => raw
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ConfigError::InvalidPort(raw.clone()))?,
        None => DEFAULT_PORT,
    };

    let src_dir = env
        .src_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join("src"));
    let modules_dir = env
        .modules_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join("modules"));
    let settings_file = home.join(SETTINGS_FILE_NAME);

    Ok(ResolvedConfig {
        launch_method,
        channel,
        update: cli.update,
        port,
        modules_dir,
        settings_file,
        src_dir,
    })
}
