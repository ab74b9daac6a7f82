//! Child-process bridge for the external-run commands (`!`, `<`, `>`, `|`).
//!
//! Everything here is blocking: one spawn, at most one write, one read with
//! a deadline. A hung child stalls the caller for at most the read timeout;
//! whatever output arrived before the deadline is returned, never an error.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

/// How long `read` waits for output before settling for what it has.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A running child process with piped stdin/stdout (unless spawned
/// detached).
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
}

/// Splits an external-command string into process-launch components:
/// executable name, its folder, and the parameter list. One level of double
/// quotes is honored around the executable path and around individual
/// parameters.
pub fn parse_command(command: &str) -> (String, String, Vec<String>) {
    let trimmed = command.trim_start();
    if trimmed.is_empty() {
        return (String::new(), String::new(), Vec::new());
    }
    let (path, rest) = if let Some(quoted) = trimmed.strip_prefix('"') {
        match quoted.find('"') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
        }
    } else {
        match trimmed.find(' ') {
            Some(end) => (&trimmed[..end], &trimmed[end + 1..]),
            None => (trimmed, ""),
        }
    };
    let path = Path::new(path);
    let executable = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folder = path
        .parent()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();
    (executable, folder, split_parameters(rest))
}

fn split_parameters(rest: &str) -> Vec<String> {
    let mut parameters = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in rest.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    parameters.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        parameters.push(current);
    }
    parameters
}

/// Spawns the command with piped stdin/stdout. The child runs in the
/// executable's folder when the command named one.
pub fn run(command: &str) -> Result<ProcessHandle> {
    spawn(command, true)
}

/// Spawns the command without pipes and lets it run free.
pub fn run_detached(command: &str) -> Result<()> {
    spawn(command, false).map(|_| ())
}

fn spawn(command: &str, piped: bool) -> Result<ProcessHandle> {
    let (executable, folder, parameters) = parse_command(command);
    if executable.is_empty() {
        return Err(Error::Pipe("empty command".into()));
    }
    let program = if folder.is_empty() {
        Path::new(&executable).to_path_buf()
    } else {
        Path::new(&folder).join(&executable)
    };
    let mut cmd = Command::new(&program);
    cmd.args(&parameters);
    if !folder.is_empty() {
        cmd.current_dir(&folder);
    }
    if piped {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
    } else {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
    }
    debug!(executable, folder, "spawning child process");
    let child = cmd
        .spawn()
        .map_err(|e| Error::Pipe(format!("could not create child process: {e}")))?;
    Ok(ProcessHandle { child })
}

/// Sends `bytes` to the child's stdin, then closes it so the child sees
/// end-of-input.
pub fn write(handle: &mut ProcessHandle, bytes: &[u8]) -> Result<()> {
    let mut stdin = handle
        .child
        .stdin
        .take()
        .ok_or_else(|| Error::Pipe("child stdin is not piped".into()))?;
    stdin
        .write_all(bytes)
        .map_err(|e| Error::Pipe(format!("could not write to child process: {e}")))
}

/// Gathers the child's stdout until end-of-file or the deadline, whichever
/// comes first. Partial output at the deadline is returned as-is.
pub fn read(handle: &mut ProcessHandle, timeout: Duration) -> Vec<u8> {
    // Close stdin first so a child waiting for input does not hang us.
    drop(handle.child.stdin.take());
    let Some(mut stdout) = handle.child.stdout.take() else {
        return Vec::new();
    };
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match stdout.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    let deadline = Instant::now() + timeout;
    let mut output = Vec::new();
    loop {
        let now = Instant::now();
        if now >= deadline {
            debug!(bytes = output.len(), "child process read timed out");
            break;
        }
        match rx.recv_timeout(deadline - now) {
            Ok(chunk) => output.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }
    output
}

/// Gives the child `grace` to exit on its own, then kills it.
pub fn destroy(mut handle: ProcessHandle, grace: Duration) {
    let deadline = Instant::now() + grace;
    loop {
        match handle.child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
            _ => break,
        }
    }
    let _ = handle.child.kill();
    let _ = handle.child.wait();
}
