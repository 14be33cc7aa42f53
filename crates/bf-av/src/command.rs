//! Builder for executing external tool commands with timeout and
//! interruption support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::process::{terminate, Interrupt};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use bf_av::{Interrupt, ToolCommand};
/// use std::path::PathBuf;
///
/// # async fn example() -> bf_core::Result<()> {
/// let interrupt = Interrupt::new();
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("quiet")
///     .arg("-print_format").arg("json")
///     .arg("-show_chapters")
///     .arg("/path/to/book.m4b")
///     .interruptible(&interrupt)
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    interrupt: Option<Interrupt>,
}

enum Waited {
    Finished(std::io::Result<ExitStatus>, Vec<u8>, Vec<u8>),
    TimedOut,
    Interrupted,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            interrupt: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Stop the child when `interrupt` is requested, and publish its pid in
    /// the interrupt's [`LiveProcess`](crate::LiveProcess) slot while it runs.
    pub fn interruptible(&mut self, interrupt: &Interrupt) -> &mut Self {
        self.interrupt = Some(interrupt.clone());
        self
    }

    /// The command line, for logging.
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`bf_core::Error::Cancelled`] if the interrupt was requested before
    ///   or during the run. The child is terminated first.
    /// - [`bf_core::Error::Tool`] if the process times out, exits with a
    ///   non-zero status (message includes stderr), or cannot be spawned.
    pub async fn execute(&self) -> bf_core::Result<ToolOutput> {
        let program_name = self.program_name();

        if self.interrupt.as_ref().is_some_and(Interrupt::is_requested) {
            return Err(bf_core::Error::Cancelled);
        }

        tracing::debug!("exec: {}", self.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| bf_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        if let (Some(interrupt), Some(pid)) = (&self.interrupt, child.id()) {
            interrupt.live().set(pid);
        }

        let result = self.wait_for(&mut child, &program_name).await;

        if let Some(interrupt) = &self.interrupt {
            interrupt.live().clear();
        }

        result
    }

    async fn wait_for(
        &self,
        child: &mut tokio::process::Child,
        program_name: &str,
    ) -> bf_core::Result<ToolOutput> {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let waited = {
            let collect = async {
                let (status, out, err) =
                    tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
                Waited::Finished(status, out, err)
            };
            tokio::select! {
                finished = collect => finished,
                _ = tokio::time::sleep(self.timeout) => Waited::TimedOut,
                _ = interrupt_requested(self.interrupt.as_ref()) => Waited::Interrupted,
            }
        };

        match waited {
            Waited::Finished(Ok(status), out, err) => {
                let tool_output = ToolOutput {
                    status,
                    stdout: String::from_utf8_lossy(&out).to_string(),
                    stderr: String::from_utf8_lossy(&err).to_string(),
                };

                if !status.success() {
                    // A terminal Ctrl+C reaches the child too; report it as a stop.
                    if self.interrupt.as_ref().is_some_and(Interrupt::is_requested) {
                        return Err(bf_core::Error::Cancelled);
                    }
                    return Err(bf_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Waited::Finished(Err(e), _, _) => Err(bf_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Waited::TimedOut => {
                terminate(child, program_name).await;
                Err(bf_core::Error::tool(
                    program_name,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
            Waited::Interrupted => {
                tracing::info!("stopping {program_name}");
                terminate(child, program_name).await;
                Err(bf_core::Error::Cancelled)
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

async fn interrupt_requested(interrupt: Option<&Interrupt>) {
    match interrupt {
        Some(interrupt) => interrupt.requested().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        assert!(matches!(result, Err(bf_core::Error::Tool { .. })));
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be stopped well before 10 seconds.
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn already_requested_interrupt_skips_spawn() {
        let interrupt = Interrupt::new();
        interrupt.request();
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .interruptible(&interrupt)
            .execute()
            .await;
        assert!(matches!(result, Err(bf_core::Error::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupt_stops_running_child() {
        let interrupt = Interrupt::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.request();
        });

        let started = std::time::Instant::now();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("30")
            .interruptible(&interrupt)
            .execute()
            .await;

        assert!(matches!(result, Err(bf_core::Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(interrupt.live().current(), None);
    }

    #[test]
    fn display_quotes_spaces() {
        let mut cmd = ToolCommand::new(PathBuf::from("ffmpeg"));
        cmd.args(["-i", "My Book.m4b"]);
        assert_eq!(cmd.display(), r#"ffmpeg -i "My Book.m4b""#);
    }
}
