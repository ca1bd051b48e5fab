//! Signal-driven sandbox teardown.
//!
//! Termination signals are fed into a channel and handled by
//! [`run_signal_loop`], which tears the owned sandbox down and then invokes
//! the exit action with the conventional signal exit code.

use log::info;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::lifecycle::ContainerLifecycleManager;

/// Signals that end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl TerminationSignal {
    /// Exit code used after cleanup (128 + signal number).
    pub fn exit_code(self) -> i32 {
        match self {
            TerminationSignal::Interrupt => 130,
            TerminationSignal::Terminate => 143,
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Called with the exit code once teardown has finished.
pub type ExitAction = Arc<dyn Fn(i32) + Send + Sync>;

/// Exit action that terminates the process.
pub fn process_exit() -> ExitAction {
    Arc::new(|code| std::process::exit(code))
}

/// Handle every received signal by tearing down and then calling `exit`.
///
/// Signals are handled concurrently; teardown itself runs once and every
/// handler waits for it before exiting. Returns when the channel closes
/// and all handlers have finished.
pub async fn run_signal_loop(
    manager: Arc<ContainerLifecycleManager>,
    mut signals: mpsc::Receiver<TerminationSignal>,
    exit: ExitAction,
) {
    let mut handlers = JoinSet::new();
    while let Some(signal) = signals.recv().await {
        info!(
            "termination signal received (signal={}, exit_code={})",
            signal,
            signal.exit_code()
        );
        let manager = manager.clone();
        let exit = exit.clone();
        handlers.spawn(async move {
            manager.teardown().await;
            exit(signal.exit_code());
        });
    }
    while handlers.join_next().await.is_some() {}
}

/// Route OS interrupt/terminate signals into [`run_signal_loop`] with [`process_exit`].
pub fn spawn_os_signal_cleanup(
    manager: Arc<ContainerLifecycleManager>,
) -> std::io::Result<JoinHandle<()>> {
    let (tx, rx) = mpsc::channel(4);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = interrupt.recv() => TerminationSignal::Interrupt,
                    Some(()) = terminate.recv() => TerminationSignal::Terminate,
                    else => break,
                };
                if tx.send(received).await.is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(TerminationSignal::Interrupt).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(tokio::spawn(run_signal_loop(manager, rx, process_exit())))
}

#[cfg(test)]
mod tests {
    use super::TerminationSignal;
    use pretty_assertions::assert_eq;

    #[test]
    fn exit_codes_follow_shell_convention() {
        assert_eq!(TerminationSignal::Interrupt.exit_code(), 130);
        assert_eq!(TerminationSignal::Terminate.exit_code(), 143);
        assert_eq!(TerminationSignal::Terminate.to_string(), "SIGTERM");
    }
}
