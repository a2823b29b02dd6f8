//! Cooperative cancellation of a running invocation.
//!
//! The CLI trips the handle on Ctrl-C. Whatever external command is running
//! at that moment is killed and nothing further is started.

use std::sync::Arc;

use tokio::sync::watch;

/// Trips the paired [`CancelSignal`]s.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
  pub fn cancel(&self) {
    self.0.send_replace(true);
  }
}

/// Observes cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
  /// A signal that never fires.
  pub fn never() -> Self {
    let (_, rx) = watch::channel(false);
    Self(rx)
  }

  pub fn is_cancelled(&self) -> bool {
    *self.0.borrow()
  }

  /// Resolves once cancellation was requested. Pends forever if the handle
  /// was dropped without cancelling.
  pub async fn cancelled(&mut self) {
    if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
  let (tx, rx) = watch::channel(false);
  (CancelHandle(Arc::new(tx)), CancelSignal(rx))
}
