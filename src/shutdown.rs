// src/shutdown.rs

//! Process-wide cancellation signal.
//!
//! One [`ShutdownTrigger`] is held by the Ctrl-C handler; every cycle gets a
//! cheap [`Shutdown`] clone and awaits [`Shutdown::cancelled`] at its
//! suspension points (retry delay, fetch, diff subprocess).

use tokio::sync::watch;

/// Sending half: flips the signal once.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // Receivers may all be gone already; nothing to do then.
        let _ = self.tx.send(true);
    }
}

/// Receiving half, cloned into every cycle.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Shutdown { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown was requested. Pends forever if the trigger is
    /// dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            let triggered = *rx.borrow_and_update();
            if triggered {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
