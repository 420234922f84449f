//! Concrete transports: a Unix domain socket IPC client, and a subprocess
//! hook spawner run through the platform shell.
//!
//! Both transports are treated elsewhere as assumed primitives; this
//! module supplies a real, minimal default so the crate is exercisable
//! end to end rather than only through the in-memory test doubles in
//! `oracle`'s unit tests.

use crate::oracle::{HookTransport, IpcTransport};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::Command;

/// Talks to a long-lived daemon over a Unix domain socket.
#[derive(Debug, Clone)]
pub struct UnixSocketIpc {
    socket_path: PathBuf,
}

impl UnixSocketIpc {
    /// Point the client at the daemon's socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }
}

#[cfg(unix)]
impl IpcTransport for UnixSocketIpc {
    fn send_recv(&self, request: &[u8]) -> std::io::Result<Vec<u8>> {
        use std::os::unix::net::UnixStream;

        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.write_all(request)?;
        stream.flush()?;
        stream.shutdown(std::net::Shutdown::Write)?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response)?;
        Ok(response)
    }
}

#[cfg(not(unix))]
impl IpcTransport for UnixSocketIpc {
    fn send_recv(&self, _request: &[u8]) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no local IPC socket support on this platform"))
    }
}

/// Spawns the configured hook program with the given working-tree root as
/// its working directory, through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellHookSpawner {
    working_dir: PathBuf,
}

impl ShellHookSpawner {
    /// Run hooks with `working_dir` as the working directory.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self { working_dir: working_dir.into() }
    }
}

impl HookTransport for ShellHookSpawner {
    fn invoke(&self, hook_path: &str, args: &[&str]) -> std::io::Result<Vec<u8>> {
        let mut command = shell_command(hook_path, args);
        command.current_dir(&self.working_dir);

        let output = command.output()?;
        if !output.status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("hook exited with status {}", output.status),
            ));
        }
        Ok(output.stdout)
    }
}

#[cfg(unix)]
fn shell_command(hook_path: &str, args: &[&str]) -> Command {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(format!("{hook_path} \"$@\"")).arg("--").args(args);
    command
}

#[cfg(windows)]
fn shell_command(hook_path: &str, args: &[&str]) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(hook_path).args(args);
    command
}
