use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Cloneable cancellation flag shared between the runner, its workers, and
/// whatever installs the user-interrupt handler.
///
/// Cancelling is one-way: once set, not-yet-started cases report `Skipped`
/// and in-flight child processes are killed at the next poll.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  flag: Arc<AtomicBool>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.flag.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_the_flag() {
    let token = CancelToken::new();
    let observer = token.clone();
    assert!(!observer.is_cancelled());

    token.cancel();
    assert!(observer.is_cancelled());
  }
}
