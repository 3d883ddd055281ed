//! Environment probing: which runtimes exist on this host and in what state.
//!
//! Probing is a pure read — nothing here mutates the host. The snapshot is
//! taken once per invocation and threaded through resolution and launch; it
//! is never refreshed mid-run.

use std::process::Command;

use semver::Version;
use tracing::debug;

/// The hub only runs on this Node.js major; other majors fail the gate.
pub const SUPPORTED_NODE_MAJOR: u64 = 22;

/// Observed state of the container engine.
///
/// `NotRunning` means the client binary is on PATH but the daemon did not
/// answer a server-version query. The distinction matters for error messages
/// ("install docker" vs "start the daemon").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerProbe {
    Absent,
    NotRunning,
    Running { version: String },
}

/// Immutable snapshot of the tools this launcher cares about.
#[derive(Debug, Clone)]
pub struct EnvironmentProbe {
    pub docker: DockerProbe,
    pub node: Option<Version>,
}

impl EnvironmentProbe {
    /// True if the docker client is installed at all, running daemon or not.
    pub fn docker_detected(&self) -> bool {
        !matches!(self.docker, DockerProbe::Absent)
    }

    /// True if Node.js is installed at exactly the supported major.
    pub fn node_supported(&self) -> bool {
        self.node
            .as_ref()
            .is_some_and(|v| v.major == SUPPORTED_NODE_MAJOR)
    }
}

pub fn probe() -> EnvironmentProbe {
    let snapshot = EnvironmentProbe {
        docker: probe_docker(),
        node: probe_node(),
    };
    debug!(?snapshot, "environment probe");
    snapshot
}

fn probe_docker() -> DockerProbe {
    if which::which("docker").is_err() {
        return DockerProbe::Absent;
    }
    // The server version is only reportable when the daemon answers; the
    // client alone cannot satisfy this query.
    let out = Command::new("docker")
        .args(["version", "--format", "{{.Server.Version}}"])
        .output();
    match out {
        Ok(o) if o.status.success() => DockerProbe::Running {
            version: String::from_utf8_lossy(&o.stdout).trim().to_string(),
        },
        _ => DockerProbe::NotRunning,
    }
}

fn probe_node() -> Option<Version> {
    let out = Command::new("node").arg("--version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    parse_node_version(&String::from_utf8_lossy(&out.stdout))
}

/// Parse `node --version` output ("v22.1.0") into a semver version.
pub(crate) fn parse_node_version(raw: &str) -> Option<Version> {
    Version::parse(raw.trim().trim_start_matches('v')).ok()
}

/// One-line install guidance for a missing tool, tailored to whichever
/// system package manager is on PATH. Falls back to the project URL.
pub fn install_hint(package: &str, fallback_url: &str) -> String {
    match detect_package_manager() {
        Some(pm) => hint_for(pm, package),
        None => format!("see {fallback_url}"),
    }
}

fn detect_package_manager() -> Option<&'static str> {
    ["apt-get", "dnf", "pacman", "brew"]
        .into_iter()
        .find(|pm| which::which(pm).is_ok())
}

fn hint_for(pm: &str, package: &str) -> String {
    match pm {
        "apt-get" => format!("install it with `sudo apt-get install -y {package}`"),
        "dnf" => format!("install it with `sudo dnf install {package}`"),
        "pacman" => format!("install it with `sudo pacman -S {package}`"),
        "brew" => format!("install it with `brew install {package}`"),
        other => format!("install {package} via {other}"),
    }
}
