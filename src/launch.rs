//! Launch orchestration: the state machine over the chosen method.
//!
//! Every failure here is terminal for the invocation — no retries, no
//! fallback between methods. On success the process image is replaced and
//! this module never returns.

use std::path::Path;
use std::process::Command;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::checkout::{self, REPO_URL};
use crate::config::ResolvedConfig;
use crate::exec;
use crate::probe::{self, DockerProbe, EnvironmentProbe, SUPPORTED_NODE_MAJOR};
use crate::settings;

pub const CONTAINER_NAME: &str = "switchboard";
pub const IMAGE: &str = "ghcr.io/switchboard-hub/switchboard";
/// The hub always listens on this port inside the image.
pub const INTERNAL_PORT: u16 = 8040;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMethod {
    Node,
    Docker,
}

impl FromStr for LaunchMethod {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(LaunchMethod::Node),
            "docker" => Ok(LaunchMethod::Docker),
            other => Err(LaunchError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("unknown launch method '{0}' (expected 'node' or 'docker')")]
    UnknownMethod(String),
    #[error("Node.js is not installed; {hint}")]
    NodeMissing { hint: String },
    #[error(
        "Node.js v{found} is installed but the hub requires v{required}.x; \
         install the supported major and re-run"
    )]
    NodeWrongVersion { found: String, required: u64 },
    #[error("docker is not installed; {hint}")]
    DockerMissing { hint: String },
    #[error(
        "docker is installed but the daemon is not running; \
         start it (e.g. `sudo systemctl start docker`) and re-run"
    )]
    DaemonNotRunning,
    #[error("{tool} {args} exited with status {code}")]
    StepFailed {
        tool: &'static str,
        args: String,
        code: i32,
    },
}

/// Validates the method, then runs the matching launch path to completion.
/// The validation happens before any side effect, so a bad method never
/// creates the settings file or touches the checkout.
pub fn launch(config: &ResolvedConfig, probe: &EnvironmentProbe) -> anyhow::Result<()> {
    let method = LaunchMethod::from_str(&config.launch_method)?;
    debug!(?method, channel = %config.channel, "launching");
    match method {
        LaunchMethod::Node => launch_node(config, probe),
        LaunchMethod::Docker => launch_docker(config, probe),
    }
}

fn launch_node(config: &ResolvedConfig, probe: &EnvironmentProbe) -> anyhow::Result<()> {
    settings::ensure_settings_file(&config.settings_file, &config.channel)?;
    check_node(probe)?;
    checkout::ensure_checkout(&config.src_dir, REPO_URL, config.update)?;

    run_step("npm", &["install"], Some(&config.src_dir))?;
    run_step("npm", &["run", "build"], Some(&config.src_dir))?;

    eprintln!("[switchboard] starting hub on port {}", config.port);
    exec::exec_in("node", &node_start_args(config), Some(&config.src_dir))
}

fn launch_docker(config: &ResolvedConfig, probe: &EnvironmentProbe) -> anyhow::Result<()> {
    settings::ensure_settings_file(&config.settings_file, &config.channel)?;
    check_docker(probe)?;

    let image = format!("{}:{}", IMAGE, config.channel);
    if config.update {
        checkout::ensure_checkout(&config.src_dir, REPO_URL, true)?;
        run_step("docker", &["system", "prune", "--force"], None)?;
        eprintln!("[switchboard] pulling {image}");
        run_step("docker", &["pull", &image], None)?;
    }

    // Kill-by-name is idempotent: no prior container is not an error, so the
    // result and output are discarded.
    let _ = Command::new("docker")
        .args(["rm", "--force", CONTAINER_NAME])
        .output();

    // Create mount sources up front so the engine does not create them
    // root-owned.
    std::fs::create_dir_all(&config.modules_dir)?;
    std::fs::create_dir_all(&config.src_dir)?;

    eprintln!(
        "[switchboard] starting container '{}' on port {}",
        CONTAINER_NAME, config.port
    );
    exec::exec_in("docker", &docker_run_args(config), None)
}

/// Gate for the local-process path: Node.js must exist at the exact
/// supported major. Distinct errors for "absent" and "wrong version".
fn check_node(probe: &EnvironmentProbe) -> Result<(), LaunchError> {
    match &probe.node {
        None => Err(LaunchError::NodeMissing {
            hint: probe::install_hint("nodejs", "https://nodejs.org/en/download"),
        }),
        Some(v) if v.major != SUPPORTED_NODE_MAJOR => Err(LaunchError::NodeWrongVersion {
            found: v.to_string(),
            required: SUPPORTED_NODE_MAJOR,
        }),
        Some(_) => Ok(()),
    }
}

/// Gate for the container path: engine installed AND daemon answering.
fn check_docker(probe: &EnvironmentProbe) -> Result<(), LaunchError> {
    match &probe.docker {
        DockerProbe::Absent => Err(LaunchError::DockerMissing {
            hint: probe::install_hint("docker", "https://docs.docker.com/engine/install"),
        }),
        DockerProbe::NotRunning => Err(LaunchError::DaemonNotRunning),
        DockerProbe::Running { .. } => Ok(()),
    }
}

fn run_step(tool: &'static str, args: &[&str], cwd: Option<&Path>) -> Result<(), LaunchError> {
    debug!(tool, ?args, "running launch step");
    let mut cmd = Command::new(tool);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let status = cmd.status().map_err(|e| LaunchError::StepFailed {
        tool,
        args: args.join(" "),
        code: e.raw_os_error().unwrap_or(-1),
    })?;
    if !status.success() {
        return Err(LaunchError::StepFailed {
            tool,
            args: args.join(" "),
            code: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

fn node_start_args(config: &ResolvedConfig) -> Vec<String> {
    vec![
        ".".to_string(),
        "--port".to_string(),
        config.port.to_string(),
        "--settings".to_string(),
        config.settings_file.display().to_string(),
        "--modules".to_string(),
        config.modules_dir.display().to_string(),
    ]
}

fn docker_run_args(config: &ResolvedConfig) -> Vec<String> {
    vec![
        "run".to_string(),
        "--name".to_string(),
        CONTAINER_NAME.to_string(),
        "-p".to_string(),
        format!("{}:{}", config.port, INTERNAL_PORT),
        "-v".to_string(),
        "/dev:/dev".to_string(),
        "-v".to_string(),
        "/var/run/docker.sock:/var/run/docker.sock".to_string(),
        "-v".to_string(),
        format!("{}:/app/modules", config.modules_dir.display()),
        "-v".to_string(),
        format!("{}:/app/settings.json", config.settings_file.display()),
        "-v".to_string(),
        format!("{}:/app/src", config.src_dir.display()),
        format!("{}:{}", IMAGE, config.channel),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::parse_node_version;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn test_config(home: &Path) -> ResolvedConfig {
        ResolvedConfig {
            launch_method: "docker".to_string(),
            channel: "latest".to_string(),
            update: true,
            port: 8040,
            modules_dir: home.join("modules"),
            settings_file: home.join("settings.json"),
            src_dir: home.join("src"),
        }
    }

    #[test]
    fn method_parses_known_values_only() {
        assert_eq!("node".parse::<LaunchMethod>().unwrap(), LaunchMethod::Node);
        assert_eq!(
            "docker".parse::<LaunchMethod>().unwrap(),
            LaunchMethod::Docker
        );
        let err = "kubernetes".parse::<LaunchMethod>().unwrap_err();
        assert!(matches!(err, LaunchError::UnknownMethod(_)));
        assert!(err.to_string().contains("kubernetes"));
        // Case-sensitive, like the CLI contract.
        assert!("Docker".parse::<LaunchMethod>().is_err());
    }

    #[test]
    fn unknown_method_attempts_no_launch_path() {
        let home = tempdir().unwrap();
        let mut config = test_config(home.path());
        config.launch_method = "kubernetes".to_string();
        let probe = EnvironmentProbe {
            docker: DockerProbe::Running {
                version: "27.0.0".to_string(),
            },
            node: None,
        };

        let err = launch(&config, &probe).unwrap_err();
        assert!(err.to_string().contains("unknown launch method"), "{err}");
        // No side effect before validation: settings file was not created.
        assert!(!config.settings_file.exists());
    }

    #[test]
    fn node_gate_distinguishes_absent_from_wrong_major() {
        let absent = EnvironmentProbe {
            docker: DockerProbe::Absent,
            node: None,
        };
        let err = check_node(&absent).unwrap_err();
        assert!(matches!(err, LaunchError::NodeMissing { .. }));

        let wrong = EnvironmentProbe {
            docker: DockerProbe::Absent,
            node: parse_node_version("v18.19.0"),
        };
        let err = check_node(&wrong).unwrap_err();
        assert!(matches!(err, LaunchError::NodeWrongVersion { .. }));
        assert!(err.to_string().contains("18.19.0"), "{err}");
        assert!(err.to_string().contains("v22.x"), "{err}");

        let supported = EnvironmentProbe {
            docker: DockerProbe::Absent,
            node: parse_node_version("v22.0.0"),
        };
        assert!(check_node(&supported).is_ok());
    }

    #[test]
    fn docker_gate_distinguishes_absent_from_not_running() {
        let absent = EnvironmentProbe {
            docker: DockerProbe::Absent,
            node: None,
        };
        let missing = check_docker(&absent).unwrap_err();
        assert!(matches!(missing, LaunchError::DockerMissing { .. }));

        let stopped = EnvironmentProbe {
            docker: DockerProbe::NotRunning,
            node: None,
        };
        let not_running = check_docker(&stopped).unwrap_err();
        assert!(matches!(not_running, LaunchError::DaemonNotRunning));
        assert_ne!(missing.to_string(), not_running.to_string());
        assert!(not_running.to_string().contains("not running"));

        let running = EnvironmentProbe {
            docker: DockerProbe::Running {
                version: "27.0.0".to_string(),
            },
            node: None,
        };
        assert!(check_docker(&running).is_ok());
    }

    #[test]
    fn docker_run_command_carries_name_port_and_five_mounts() {
        let config = ResolvedConfig {
            launch_method: "docker".to_string(),
            channel: "prerelease".to_string(),
            update: true,
            port: 9100,
            modules_dir: PathBuf::from("/home/op/.switchboard/modules"),
            settings_file: PathBuf::from("/home/op/.switchboard/settings.json"),
            src_dir: PathBuf::from("/home/op/.switchboard/src"),
        };
        let args = docker_run_args(&config);

        assert_eq!(args[0], "run");
        assert!(args.contains(&"--name".to_string()));
        assert!(args.contains(&"switchboard".to_string()));
        assert!(args.contains(&"9100:8040".to_string()));

        let mounts: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| **flag == "-v")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(mounts.len(), 5);
        assert!(mounts.contains(&&"/dev:/dev".to_string()));
        assert!(mounts.contains(&&"/var/run/docker.sock:/var/run/docker.sock".to_string()));
        assert!(mounts.contains(&&"/home/op/.switchboard/modules:/app/modules".to_string()));
        assert!(
            mounts.contains(&&"/home/op/.switchboard/settings.json:/app/settings.json".to_string())
        );
        assert!(mounts.contains(&&"/home/op/.switchboard/src:/app/src".to_string()));

        // Channel-tagged image is the last argument.
        assert_eq!(
            args.last().unwrap(),
            "ghcr.io/switchboard-hub/switchboard:prerelease"
        );
    }

    #[test]
    fn node_start_command_binds_port_and_paths() {
        let home = tempdir().unwrap();
        let mut config = test_config(home.path());
        config.port = 8045;
        let args = node_start_args(&config);
        assert_eq!(args[0], ".");
        let port_at = args.iter().position(|a| a == "--port").unwrap();
        assert_eq!(args[port_at + 1], "8045");
        assert!(args.contains(&"--settings".to_string()));
        assert!(args.contains(&"--modules".to_string()));
    }
}
