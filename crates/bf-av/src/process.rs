//! Cooperative interruption of delegated subprocesses.
//!
//! An [`Interrupt`] pairs a [`CancellationToken`] with a [`LiveProcess`]
//! slot. Every [`ToolCommand`](crate::ToolCommand) built with
//! [`interruptible`](crate::ToolCommand::interruptible) registers its child
//! pid in the slot while it runs and races the child against the token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

/// Time a terminated child gets to exit before it is killed.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Handle to the delegated subprocess currently running, if any.
#[derive(Debug, Clone, Default)]
pub struct LiveProcess {
    pid: Arc<Mutex<Option<u32>>>,
}

impl LiveProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pid of a freshly spawned child.
    pub fn set(&self, pid: u32) {
        *self.pid.lock() = Some(pid);
    }

    /// Forget the child once its call has returned.
    pub fn clear(&self) {
        *self.pid.lock() = None;
    }

    pub fn current(&self) -> Option<u32> {
        *self.pid.lock()
    }

    /// Kill the live child immediately without waiting on it.
    ///
    /// Returns `true` if a signal was delivered.
    pub fn kill_now(&self) -> bool {
        let Some(pid) = self.pid.lock().take() else {
            return false;
        };
        kill_pid(pid)
    }
}

#[cfg(unix)]
fn kill_pid(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match i32::try_from(pid) {
        Ok(raw) => kill(Pid::from_raw(raw), Signal::SIGKILL).is_ok(),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn kill_pid(pid: u32) -> bool {
    tracing::warn!("cannot signal process {pid} on this platform");
    false
}

/// Shared stop request for a run, observed by every long operation.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
    stop_flag: Arc<AtomicBool>,
    live: LiveProcess,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` for exactly one request, even when
    /// several race.
    pub fn request(&self) -> bool {
        let first = !self.stop_flag.swap(true, Ordering::SeqCst);
        self.token.cancel();
        first
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a stop has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await
    }

    pub fn live(&self) -> &LiveProcess {
        &self.live
    }
}

/// Ask `child` to exit (SIGTERM on unix), then kill it after
/// [`TERMINATE_GRACE`].
pub(crate) async fn terminate(child: &mut Child, tool: &str) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(raw) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                tracing::debug!("SIGTERM to {tool} ({raw}) failed: {e}");
            }
        }
    }

    #[cfg(not(unix))]
    let _ = child.start_kill();

    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!("{tool} exited after terminate: {status}"),
        _ => {
            tracing::warn!("{tool} did not exit within {TERMINATE_GRACE:?}; killing");
            if let Err(e) = child.kill().await {
                tracing::warn!("failed to kill {tool}: {e}");
            }
        }
    }
}
