//! The hub source checkout and its sync state machine.
//!
//! The launcher never discards uncommitted work: the state→action mapping is
//! the pure `plan_sync` function, and the only destructive transition
//! (force-reset to upstream) is reachable from a clean checkout alone.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{anyhow, Context, Result};
use thiserror::Error;
use tracing::debug;

use crate::probe;

pub const REPO_URL: &str = "https://github.com/switchboard-hub/switchboard.git";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Absent,
    Clean,
    Dirty,
}

/// What a launch should do to the checkout, decided before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    Clone,
    Skip,
    RefuseDirty,
    ForceSync,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("git is not installed; {hint}")]
    GitMissing { hint: String },
    #[error(
        "{dir} has uncommitted changes; refusing to update over them.\n  \
         keep them:    git -C {dir} stash\n  \
         discard them: git -C {dir} reset --hard && git -C {dir} clean -fd\n\
         then re-run, or pass --no-update"
    )]
    DirtyCheckout { dir: String },
}

pub fn plan_sync(state: CheckoutState, update: bool) -> SyncPlan {
    match (state, update) {
        (CheckoutState::Absent, _) => SyncPlan::Clone,
        (CheckoutState::Clean, false) | (CheckoutState::Dirty, false) => SyncPlan::Skip,
        (CheckoutState::Clean, true) => SyncPlan::ForceSync,
        (CheckoutState::Dirty, true) => SyncPlan::RefuseDirty,
    }
}

pub fn checkout_state(dir: &Path) -> Result<CheckoutState> {
    if !dir.join(".git").exists() {
        return Ok(CheckoutState::Absent);
    }
    if Git::new(dir).is_dirty()? {
        Ok(CheckoutState::Dirty)
    } else {
        Ok(CheckoutState::Clean)
    }
}

/// Bring the checkout at `dir` into line with `remote`, per `plan_sync`.
///
/// One-shot: a fetch or clone failure propagates fatally, no retry.
pub fn ensure_checkout(dir: &Path, remote: &str, update: bool) -> Result<()> {
    if which::which("git").is_err() {
        return Err(CheckoutError::GitMissing {
            hint: probe::install_hint("git", "https://git-scm.com/downloads"),
        }
        .into());
    }

    let state = checkout_state(dir)?;
    match plan_sync(state, update) {
        SyncPlan::Clone => {
            eprintln!("[switchboard] cloning {} to {}", remote, dir.display());
            clone_repo(remote, dir)
        }
        SyncPlan::Skip => {
            debug!(dir = %dir.display(), "checkout present, update disabled, skipping sync");
            Ok(())
        }
        SyncPlan::RefuseDirty => Err(CheckoutError::DirtyCheckout {
            dir: dir.display().to_string(),
        }
        .into()),
        SyncPlan::ForceSync => {
            eprintln!("[switchboard] syncing {} to latest upstream", dir.display());
            let git = Git::new(dir);
            git.fetch_origin()?;
            git.reset_hard_fetched()?;
            Ok(())
        }
    }
}

fn clone_repo(remote: &str, dir: &Path) -> Result<()> {
    let output = Command::new("git")
        .arg("clone")
        .arg(remote)
        .arg(dir)
        .output()
        .context("spawn git clone")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("git clone {} failed: {}", remote, stderr.trim()));
    }
    Ok(())
}

/// Thin wrapper for git subprocess calls inside the checkout.
#[derive(Debug)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// True if the worktree has uncommitted changes, untracked files included.
    pub fn is_dirty(&self) -> Result<bool> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-uall"])?;
        Ok(!out.trim().is_empty())
    }

    pub fn fetch_origin(&self) -> Result<()> {
        self.run_checked(&["fetch", "origin"])?;
        Ok(())
    }

    /// Force the worktree onto the revision the last fetch brought in.
    pub fn reset_hard_fetched(&self) -> Result<()> {
        self.run_checked(&["reset", "--hard", "FETCH_HEAD"])?;
        Ok(())
    }

    pub fn head_sha(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}
