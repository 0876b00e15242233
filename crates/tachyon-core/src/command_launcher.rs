//! `CommandLauncher`: the external-hook port for fire-and-forget shelling
//! out (dependency recomputation commands, the worker-restart hook).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use parking_lot::Mutex;

/// Spawns a shell command string detached, streaming its stdout/stderr to
/// a log file, per `SPEC_FULL.md` §6's "external hooks" contract. Never
/// waits for the child; callers are not told when (or whether) it exits.
pub trait CommandLauncher: Send + Sync {
    fn launch(&self, command: &str, log_path: &Path) -> std::io::Result<()>;
}

/// Real implementation: `setsid()`-detaches the child so it outlives the
/// master if the master restarts, same as `oxcrypt-mount`'s daemon spawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellCommandLauncher;

impl CommandLauncher for ShellCommandLauncher {
    fn launch(&self, command: &str, log_path: &Path) -> std::io::Result<()> {
        let log_file = OpenOptions::new().create(true).append(true).open(log_path)?;
        let mut shell = Command::new("sh");
        shell.arg("-c").arg(command);
        shell.stdin(Stdio::null());
        shell.stdout(log_file.try_clone()?);
        shell.stderr(log_file);
        spawn_detached(&mut shell)?;
        Ok(())
    }
}

#[cfg(unix)]
fn spawn_detached(command: &mut Command) -> std::io::Result<u32> {
    use std::os::unix::process::CommandExt;

    unsafe {
        command.pre_exec(|| match nix::unistd::setsid() {
            Ok(_) => Ok(()),
            Err(e) => Err(std::io::Error::from_raw_os_error(e as i32)),
        });
    }
    let child = command.spawn()?;
    Ok(child.id())
}

#[cfg(not(unix))]
fn spawn_detached(command: &mut Command) -> std::io::Result<u32> {
    let child = command.spawn()?;
    Ok(child.id())
}

/// Records every launch instead of spawning a process, for deterministic
/// tests of the recomputation scheduler and liveness monitor.
#[derive(Debug, Default)]
pub struct RecordingCommandLauncher {
    launches: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingCommandLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> Vec<(String, PathBuf)> {
        self.launches.lock().clone()
    }
}

impl CommandLauncher for RecordingCommandLauncher {
    fn launch(&self, command: &str, log_path: &Path) -> std::io::Result<()> {
        self.launches.lock().push((command.to_string(), log_path.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_launcher_captures_calls() {
        let launcher = RecordingCommandLauncher::new();
        launcher.launch("echo hi", Path::new("/tmp/log")).unwrap();
        let launches = launcher.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].0, "echo hi");
    }
}
