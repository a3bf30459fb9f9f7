//! Stop triggers for an interactive recording

use std::fmt;
use std::io::BufRead;
use std::thread;

use tokio::sync::oneshot;
use tracing::debug;

/// What ended the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Enter pressed on stdin
    Enter,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Enter => "enter",
        };
        write!(f, "{}", s)
    }
}

/// Resolve once the user asks to stop.
///
/// Stdin is read on a detached thread so a pending read never holds up
/// runtime shutdown. A closed stdin is not treated as a stop request.
pub async fn stop_requested() -> StopReason {
    let (enter_tx, enter_rx) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    let _ = enter_tx.send(());
                }
            }
        });
    if let Err(e) = spawned {
        debug!(error = %e, "Stdin watcher unavailable");
    }

    let enter = async {
        if enter_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let reason = tokio::select! {
        _ = interrupt() => StopReason::Interrupt,
        _ = terminate() => StopReason::Terminate,
        _ = enter => StopReason::Enter,
    };
    debug!(%reason, "Stop requested");
    reason
}

/// Resolve on Ctrl+C or SIGTERM, for aborting work after recording
pub async fn cancel_requested() -> StopReason {
    let reason = tokio::select! {
        _ = interrupt() => StopReason::Interrupt,
        _ = terminate() => StopReason::Terminate,
    };
    debug!(%reason, "Cancel requested");
    reason
}

async fn interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(_) => std::future::pending::<()>().await,
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::Interrupt.to_string(), "interrupt");
        assert_eq!(StopReason::Enter.to_string(), "enter");
        assert_ne!(StopReason::Terminate, StopReason::Interrupt);
    }
}
