//! Signal handling for a recording run
//!
//! Ctrl+C asks for a graceful stop (finalize and save). SIGTERM, or a second
//! Ctrl+C, tears the session down without saving.

use colored::Colorize;
use tokio::sync::mpsc;

/// What the user asked for from outside the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    /// Finalize the recording and keep it
    Graceful,
    /// Discard everything and exit
    Abort,
}

/// Receives stop requests from OS signals
pub struct StopSignals {
    receiver: mpsc::Receiver<StopRequest>,
}

impl StopSignals {
    /// Start listening for SIGINT and SIGTERM.
    pub fn listen() -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(4);

        let tx_int = tx.clone();
        tokio::spawn(async move {
            let mut request = StopRequest::Graceful;
            while tokio::signal::ctrl_c().await.is_ok() {
                if request == StopRequest::Graceful {
                    eprintln!("\n{} Stopping (Ctrl+C again to discard)", "↓".cyan());
                }
                if tx_int.send(request).await.is_err() {
                    break;
                }
                request = StopRequest::Abort;
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::spawn(async move {
                if sigterm.recv().await.is_some() {
                    eprintln!("{} Received SIGTERM (discarding)", "↓".cyan());
                    let _ = tx.send(StopRequest::Abort).await;
                }
            });
        }

        Ok(Self { receiver: rx })
    }

    /// Channel-backed instance, for driving a run without OS signals
    pub fn from_channel(receiver: mpsc::Receiver<StopRequest>) -> Self {
        Self { receiver }
    }

    /// Wait for the next request. Pends forever once every source is gone.
    pub async fn recv(&mut self) -> StopRequest {
        match self.receiver.recv().await {
            Some(request) => request,
            None => std::future::pending().await,
        }
    }
}
