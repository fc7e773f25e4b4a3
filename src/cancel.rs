use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Operator cancellation, observed between pages and between chunks.
///
/// A single remote call is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Cancels on the first Ctrl-C. A second Ctrl-C terminates the process.
    pub fn cancel_on_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            log::warn!("Cancellation requested, stopping at the next chunk boundary");
            flag.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                log::error!("Interrupted again, exiting immediately");
                std::process::exit(130);
            }
        });
    }
}
