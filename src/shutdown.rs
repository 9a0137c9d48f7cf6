// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Stop requests for batch and watch runs
//!
//! A request never interrupts a file in progress. Batch runs check for it
//! between files; watch mode also races it against the poll timer.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Owner of the stop flag
#[derive(Debug)]
pub struct Shutdown {
    requested: watch::Sender<bool>,
}

/// Read side of the stop flag, handed to each loop that must stop
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    requested: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (requested, _) = watch::channel(false);
        Self { requested }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            requested: self.requested.subscribe(),
        }
    }

    /// Ask every listener to stop; repeated requests are harmless
    pub fn request(&self) {
        self.requested.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn is_requested(&self) -> bool {
        *self.requested.borrow()
    }

    /// Resolves once a stop has been requested. Never resolves if the
    /// [`Shutdown`] is dropped without a request.
    pub async fn requested(&mut self) {
        if self.requested.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Request `shutdown` on the first Ctrl+C or SIGTERM
pub fn spawn_signal_listener(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal = next_stop_signal().await;
        info!("Received {}, stopping after the current file...", signal);
        shutdown.request();
    })
}

#[cfg(unix)]
async fn next_stop_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            _ = ctrl_c() => "Ctrl+C",
            _ = term.recv() => "SIGTERM",
        },
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            ctrl_c().await;
            "Ctrl+C"
        }
    }
}

#[cfg(not(unix))]
async fn next_stop_signal() -> &'static str {
    ctrl_c().await;
    "Ctrl+C"
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
