//! The module supervisor: spawning children, fanning their stdout/stderr out
//! through an event channel, and the write/eof/kill primitives the command
//! handlers in `cpsh-commands` build on (§4.4).

use std::process::Stdio;

use anyhow::Context as _;
use cpsh_core::ModuleEvent;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;

/// Read buffer size for stdout forwarding; the spec requires "at least 2 KiB".
const STDOUT_BUF_SIZE: usize = 8 * 1024;

/// What `spawn` hands back to the caller, which then installs it on the
/// `Module` via `Module::set_running`.
pub struct SpawnedChild {
    pub pid: u32,
    pub stdin: Option<ChildStdin>,
}

/// Start a child process, wire its stdout/stderr into dedicated forwarder
/// tasks, and spawn a reaper task that owns the `tokio::process::Child` and
/// publishes exactly one `ModuleEvent::Exited` when it exits.
///
/// Does not reap on drop: the reaper task is the only thing that ever calls
/// `.wait()`, so there is exactly one path to a single `Exited` event (see
/// DESIGN.md's "double-reap avoidance" resolution).
pub async fn spawn(
    id: u64,
    name: &str,
    argv: &[String],
    events: mpsc::UnboundedSender<ModuleEvent>,
) -> anyhow::Result<SpawnedChild> {
    let program = argv.first().context("argv must be non-empty")?;
    let mut cmd = Command::new(program);
    cmd.args(&argv[1..]);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    // Isolate the child in its own session so a later `kill` can target the
    // whole process group it may have spawned, not just the immediate pid.
    #[cfg(unix)]
    unsafe {
        use std::os::unix::process::CommandExt;
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn module '{name}': {}", argv.join(" ")))?;
    let pid = child.id().context("spawned child exposed no pid")?;
    let stdin = child.stdin.take();
    let stdout = child.stdout.take().expect("stdout was piped at spawn");
    let stderr = child.stderr.take().expect("stderr was piped at spawn");

    tokio::spawn(forward_stdout(id, name.to_string(), stdout, events.clone()));
    tokio::spawn(forward_stderr(id, name.to_string(), stderr, events.clone()));
    tokio::spawn(reap(id, name.to_string(), child, events));

    Ok(SpawnedChild { pid, stdin })
}

async fn forward_stdout(
    id: u64,
    name: String,
    mut stdout: ChildStdout,
    events: mpsc::UnboundedSender<ModuleEvent>,
) {
    let mut buf = vec![0u8; STDOUT_BUF_SIZE];
    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => {
                let _ = events.send(ModuleEvent::StdoutEof { id, module: name });
                return;
            }
            Ok(n) => {
                let chunk = buf[..n].to_vec();
                if events
                    .send(ModuleEvent::Stdout { id, module: name.clone(), chunk })
                    .is_err()
                {
                    return; // engine is gone; nothing left to forward to.
                }
            }
            Err(e) => {
                tracing::warn!(module = %name, error = %e, "stdout read error");
                let _ = events.send(ModuleEvent::StdoutEof { id, module: name });
                return;
            }
        }
    }
}

async fn forward_stderr(
    id: u64,
    name: String,
    stderr: ChildStderr,
    events: mpsc::UnboundedSender<ModuleEvent>,
) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if events
                    .send(ModuleEvent::StderrLine { id, module: name.clone(), line })
                    .is_err()
                {
                    return;
                }
            }
            Ok(None) => {
                let _ = events.send(ModuleEvent::StderrEof { id, module: name });
                return;
            }
            Err(e) => {
                tracing::warn!(module = %name, error = %e, "stderr read error");
                let _ = events.send(ModuleEvent::StderrEof { id, module: name });
                return;
            }
        }
    }
}

async fn reap(
    id: u64,
    name: String,
    mut child: tokio::process::Child,
    events: mpsc::UnboundedSender<ModuleEvent>,
) {
    let status = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(module = %name, error = %e, "wait() failed");
            None
        }
    };
    let _ = events.send(ModuleEvent::Exited { id, module: name, status });
}

/// Send SIGTERM to a pid. Best-effort: a process that already exited just
/// logs an `ESRCH` warning, it is not an error condition the caller must
/// handle (the reaper will observe the exit on its own).
pub fn send_sigterm(module: &str, pid: u32) {
    // SAFETY: libc::kill with a valid signal number has no memory-safety
    // preconditions; failures are reported through errno, not UB.
    let rc = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
    if rc != 0 {
        tracing::warn!(
            module,
            pid,
            error = %std::io::Error::last_os_error(),
            "SIGTERM delivery failed"
        );
    }
}

/// Shut down a child's stdin endpoint, if still open. Used by `eof`, `kill`,
/// and the exit-handler teardown.
pub async fn close_stdin(stdin: Option<ChildStdin>) {
    if let Some(mut s) = stdin {
        if let Err(e) = s.shutdown().await {
            tracing::warn!(error = %e, "error shutting down stdin");
        }
    }
}

/// Write all bytes to a child's stdin and flush. Callers check
/// `Module::is_running`/`stdin_is_open` first (§4.4 "Writing to a module");
/// this only reports the lower-level I/O failure.
pub async fn write_all(stdin: &mut ChildStdin, data: &[u8]) -> anyhow::Result<()> {
    stdin.write_all(data).await.context("write to child stdin failed")?;
    stdin.flush().await.context("flush to child stdin failed")?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
