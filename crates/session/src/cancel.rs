use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared manual-quit flag. Clones observe the same flag.
///
/// The operator side calls [`CancelToken::cancel`]; the controller polls
/// [`CancelToken::is_cancelled`] at the top of every tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
