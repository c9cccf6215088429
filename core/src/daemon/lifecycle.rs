use tokio::signal;
use tracing::{error, info, warn};

/// Where the gateway process is between startup and exit.
///
/// States only move forward; a request to go back is refused and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
  /// Loading config, building the pool, starting the listener.
  Initializing,
  /// Accepting connections.
  Running,
  /// No longer accepting; open sessions finish on their own.
  ShuttingDown,
  Stopped,
}

/// The signal that ended [`Lifecycle::wait_for_shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
  Interrupt,
  Terminate,
}

pub struct Lifecycle {
  state: LifecycleState,
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self::new()
  }
}

impl Lifecycle {
  pub fn new() -> Self {
    Self {
      state: LifecycleState::Initializing,
    }
  }

  pub fn state(&self) -> LifecycleState {
    self.state
  }

  /// Move to `next`. Returns `false` (and stays put) for a backward move.
  pub fn transition(&mut self, next: LifecycleState) -> bool {
    if next < self.state {
      warn!(from = ?self.state, to = ?next, "refusing backward lifecycle transition");
      return false;
    }
    if next != self.state {
      info!(from = ?self.state, to = ?next, "lifecycle state transition");
      self.state = next;
    }
    true
  }

  /// Resolve on SIGINT or SIGTERM.
  ///
  /// A signal whose handler cannot be installed is logged and never fires.
  pub async fn wait_for_shutdown() -> ShutdownSignal {
    let interrupt = async {
      if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to install SIGINT handler");
        std::future::pending::<()>().await;
      }
    };

    #[cfg(unix)]
    let terminate = async {
      match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sig) => {
          sig.recv().await;
        }
        Err(e) => {
          error!(error = %e, "failed to install SIGTERM handler");
          std::future::pending::<()>().await;
        }
      }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
      _ = interrupt => ShutdownSignal::Interrupt,
      _ = terminate => ShutdownSignal::Terminate,
    };
    info!(signal = ?received, "shutdown requested");
    received
  }
}
