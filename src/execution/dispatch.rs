//! Command dispatch - runs one command string as exactly one subprocess
//!
//! Commands using shell syntax are handed to `sh -c`, everything else is
//! split on whitespace and invoked directly.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Substrings that require shell interpretation
pub const SHELL_TRIGGERS: [&str; 7] = ["|", ">", "<", "&&", "||", ";", "$"];

/// Failure of a single command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("exit status {0}")]
    Exit(i32),

    #[error("terminated by signal")]
    Signal,

    #[error("killed: deadline exceeded")]
    DeadlineExceeded,

    #[error("failed to collect process output: {0}")]
    Io(#[source] io::Error),
}

impl CommandError {
    /// Exit code to report: the process code when there is one, else 1
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Exit(code) => *code,
            _ => 1,
        }
    }
}

/// How a command string is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `sh -c <command>`
    Shell(String),
    /// Program with arguments, no shell involved
    Direct { program: String, args: Vec<String> },
}

/// Whether a command needs a shell to be interpreted
pub fn needs_shell(command: &str) -> bool {
    SHELL_TRIGGERS.iter().any(|trigger| command.contains(trigger))
}

impl Invocation {
    /// Decide how to launch a command; `None` for a blank command
    pub fn parse(command: &str) -> Option<Self> {
        if needs_shell(command) {
            return Some(Invocation::Shell(command.to_string()));
        }

        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Invocation::Direct {
            program,
            args: parts.collect(),
        })
    }

    /// Program that will be spawned
    pub fn program(&self) -> &str {
        match self {
            Invocation::Shell(_) => "sh",
            Invocation::Direct { program, .. } => program,
        }
    }

    fn to_command(&self) -> Command {
        match self {
            Invocation::Shell(script) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                cmd
            }
            Invocation::Direct { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        }
    }
}

/// Run one command to completion, appending its stdout and stderr to `output`.
///
/// The process inherits the current environment overlaid with `env`. It runs
/// in its own process group, and the whole group is killed once `deadline`
/// passes. Blank commands succeed without spawning, and nothing is spawned
/// once the deadline has already passed.
pub async fn run_command(
    command: &str,
    env: &HashMap<String, String>,
    workspace: &Path,
    deadline: Instant,
    output: &mut Vec<u8>,
) -> Result<(), CommandError> {
    let Some(invocation) = Invocation::parse(command) else {
        return Ok(());
    };
    if Instant::now() >= deadline {
        return Err(CommandError::DeadlineExceeded);
    }
    debug!("Dispatching {:?}", invocation);

    let mut cmd = invocation.to_command();
    cmd.current_dir(workspace)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: invocation.program().to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let waited = timeout_at(deadline, async {
        capture(stdout, stderr, output).await?;
        child.wait().await
    })
    .await;

    match waited {
        Ok(Ok(status)) => check_status(status),
        Ok(Err(e)) => Err(CommandError::Io(e)),
        Err(_) => {
            kill_process_group(&child);
            // Already exited processes make kill fail, nothing left to do then
            let _ = child.kill().await;
            Err(CommandError::DeadlineExceeded)
        }
    }
}

/// Kill everything the command started, not just the direct child
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; the group id is the
    // child's own pid because it was spawned with process_group(0)
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn check_status(status: ExitStatus) -> Result<(), CommandError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(CommandError::Exit(code)),
        None => Err(CommandError::Signal),
    }
}

/// Drain both pipes into one buffer, chunks appended in arrival order
async fn capture<O, E>(stdout: Option<O>, stderr: Option<E>, output: &mut Vec<u8>) -> io::Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = stdout;
    let mut stderr = stderr;
    let mut out_buf = [0u8; 4096];
    let mut err_buf = [0u8; 4096];

    loop {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => stdout = None,
                    n => output.extend_from_slice(&out_buf[..n]),
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => stderr = None,
                    n => output.extend_from_slice(&err_buf[..n]),
                }
            }
            else => break,
        }
    }

    Ok(())
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
