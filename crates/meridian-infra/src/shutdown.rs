//! Graceful shutdown signalling

use tokio::sync::watch;

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }
}

/// Fans one shutdown event out to every background loop and the server.
#[derive(Clone)]
pub struct ShutdownListener {
    tx: watch::Sender<bool>,
}

impl Default for ShutdownListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Trigger shutdown once [`shutdown_signal`] resolves.
    pub fn listen_for_signals(&self) -> tokio::task::JoinHandle<()> {
        let listener = self.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            listener.trigger();
        })
    }

    pub fn trigger(&self) {
        tracing::info!("Shutting down gracefully...");
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        // An error means the sender is gone, which only happens at teardown.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let listener = ShutdownListener::new();
        let mut first = listener.subscribe();
        let waiter = {
            let listener = listener.clone();
            tokio::spawn(async move { listener.wait().await })
        };

        listener.trigger();

        first.changed().await.unwrap();
        assert!(*first.borrow());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown() {
        let listener = ShutdownListener::new();
        listener.trigger();
        tokio::time::timeout(Duration::from_secs(1), listener.wait())
            .await
            .unwrap();
    }
}
