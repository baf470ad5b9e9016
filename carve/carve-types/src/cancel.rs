//! Cooperative cancellation.

use crate::{CarveError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cheaply-clonable cooperative cancellation token.
///
/// Long-running pipeline passes (carve stream, outlier loop,
/// coalescence loop, mesh emission) accept a token and call
/// [`CancelToken::checkpoint`] between top-level iterations. Firing the
/// token makes the pass finish its current iteration, leave its data
/// structures consistent, and return [`CarveError::Cancelled`].
///
/// Timeouts are expressed as a deadline on the token.
///
/// # Example
///
/// ```
/// use carve_types::CancelToken;
///
/// let token = CancelToken::new();
/// assert!(token.checkpoint().is_ok());
///
/// token.cancel();
/// assert!(token.checkpoint().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    fired: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that only cancels when [`cancel`](Self::cancel)
    /// is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also cancels once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    /// Fires the token. All clones observe the cancellation.
    pub fn cancel(&self) {
        self.inner.fired.store(true, Ordering::Release);
    }

    /// Returns `true` if the token has fired or its deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.fired.load(Ordering::Acquire) {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Returns `Err(CarveError::Cancelled)` if the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::Cancelled`] when cancellation has been
    /// requested or the deadline has passed.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CarveError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
        assert!(t.checkpoint().is_ok());
    }

    #[test]
    fn cancel_propagates_to_clones() {
        let t = CancelToken::new();
        let c = t.clone();
        t.cancel();
        assert!(c.is_cancelled());
        assert!(matches!(c.checkpoint(), Err(CarveError::Cancelled)));
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let t = CancelToken::with_timeout(Duration::ZERO);
        assert!(t.is_cancelled());
    }

    #[test]
    fn future_deadline_does_not_cancel() {
        let t = CancelToken::with_timeout(Duration::from_secs(3600));
        assert!(!t.is_cancelled());
    }
}
