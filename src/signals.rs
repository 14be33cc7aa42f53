//! Ctrl+C / SIGTERM handling for batch runs.
//!
//! The first signal requests a cooperative stop: the driver finishes its
//! current delegated call (or terminates it) and cleans up the interrupted
//! item. A second signal while that is still going forces teardown.

use bf_av::Interrupt;
use bf_split::FileTracker;
use tokio::task::JoinHandle;

/// Exit status after a forced teardown (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

/// What a received signal turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    /// First request; the run winds down on its own.
    Graceful,
    /// Repeated request; the live child was killed and everything the
    /// current item wrote, committed parts and scratch space included, was
    /// removed.
    Forced,
}

/// Apply one stop request to the run's shared state.
pub fn handle_stop_request(interrupt: &Interrupt, tracker: &FileTracker) -> StopAction {
    if interrupt.request() {
        tracing::warn!("Stop requested; cleaning up current book (signal again to force)");
        return StopAction::Graceful;
    }

    tracing::warn!("Second stop request; forcing shutdown");
    if interrupt.live().kill_now() {
        tracing::info!("Killed running subprocess");
    }
    let report = tracker.discard_item();
    if !report.is_clean() {
        tracing::error!("Could not remove {} partial file(s)", report.failed.len());
    }
    StopAction::Forced
}

/// Spawn the signal listener for a run.
///
/// Must be called from within a tokio runtime. The task lives until the
/// process exits; abort the handle once the run is over.
pub fn spawn_stop_handler(interrupt: Interrupt, tracker: FileTracker) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    None
                }
            };

        loop {
            #[cfg(unix)]
            let terminated = async {
                match terminate.as_mut() {
                    Some(sig) => {
                        sig.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            #[cfg(not(unix))]
            let terminated = std::future::pending::<()>();

            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        tracing::error!("Failed to install Ctrl+C handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
                _ = terminated => {}
            }

            if handle_stop_request(&interrupt, &tracker) == StopAction::Forced {
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    })
}
