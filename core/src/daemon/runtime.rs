use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shape of the Tokio runtime every connection and operation task runs on.
pub struct RuntimeConfig {
  pub worker_threads: usize,
  /// Workers are named `<prefix>-<n>`.
  pub thread_name_prefix: String,
  pub thread_stack_size: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      worker_threads: available_cores(),
      thread_name_prefix: "sluice-worker".to_string(),
      thread_stack_size: 2 * 1024 * 1024,
    }
  }
}

impl RuntimeConfig {
  /// Defaults, with the worker count overridden when configured.
  pub fn with_workers(worker_threads: Option<usize>) -> Self {
    let mut cfg = Self::default();
    if let Some(n) = worker_threads.filter(|n| *n > 0) {
      cfg.worker_threads = n;
    }
    cfg
  }

  pub fn build_runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
    let prefix = self.thread_name_prefix.clone();
    let counter = Arc::new(AtomicUsize::new(0));

    let rt = tokio::runtime::Builder::new_multi_thread()
      .worker_threads(self.worker_threads)
      .thread_name_fn(move || {
        let n = counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n}")
      })
      .thread_stack_size(self.thread_stack_size)
      .enable_all()
      .build()?;

    info!(
      workers = self.worker_threads,
      stack_size = self.thread_stack_size,
      "tokio runtime configured"
    );
    Ok(rt)
  }
}

fn available_cores() -> usize {
  std::thread::available_parallelism()
    .map(|n| n.get())
    .unwrap_or(4)
}
