use std::path::Path;

/// Replace the current process image with `program`.
///
/// The handoff is the terminal action of a successful launch: after
/// `exec()` the hub (or `docker run`) owns the launcher's PID, signals
/// reach it directly, and there is no child left to reap or supervise.
/// A return from this function is therefore always a failure.
#[cfg(unix)]
pub fn exec_in(program: &str, args: &[String], cwd: Option<&Path>) -> anyhow::Result<()> {
    use std::os::unix::process::CommandExt;

    let mut cmd = std::process::Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let err = cmd.exec();
    Err(anyhow::anyhow!("exec {} failed: {}", program, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_nonexistent_binary_returns_error() {
        let result = exec_in("/nonexistent/binary/switchboard-does-not-exist", &[], None);
        assert!(result.is_err());
    }
}
