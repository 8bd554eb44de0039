//! Process-wide cancellation signal.
//!
//! A [`ShutdownTrigger`] is held by whoever owns the process lifecycle; every
//! stage receives a cloned [`Shutdown`] and races its blocking waits against
//! [`Shutdown::wait`]. The signal fires once and stays fired.

use tokio::sync::watch;

/// Creates a linked trigger/signal pair in the "not fired" state.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, Shutdown { receiver })
}

/// Fires the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Fires the signal. Idempotent.
    pub fn trigger(&self) {
        // send_replace stores the value even when nobody is subscribed yet
        self.sender.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Cloneable view of the shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has fired.
    ///
    /// If the trigger is dropped without ever firing, this never resolves.
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
