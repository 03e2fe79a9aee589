//! Cooperative cancellation for long-running engine calls.
//!
//! Both engines poll a [`Progress`] implementation once per unit of internal
//! work (per node while computing core distances, per extracted vertex in
//! Prim's algorithm, per SGD iteration while embedding). When the callback
//! asks to stop, the engine returns promptly with [`RunStatus::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Polled by the engines to decide whether to keep working.
///
/// Implementations must be cheap and thread-safe; the embedding engine polls
/// from every worker.
///
/// # Examples
/// ```
/// use largevis_core::Progress;
///
/// let budget = std::sync::atomic::AtomicUsize::new(3);
/// let limited = || budget.fetch_sub(1, std::sync::atomic::Ordering::Relaxed) > 0;
/// assert!(limited.should_continue());
/// ```
pub trait Progress: Sync {
    /// Returns `false` to request cancellation.
    fn should_continue(&self) -> bool;
}

impl<F> Progress for F
where
    F: Fn() -> bool + Sync,
{
    fn should_continue(&self) -> bool {
        self()
    }
}

/// A [`Progress`] that never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunToCompletion;

impl Progress for RunToCompletion {
    fn should_continue(&self) -> bool {
        true
    }
}

/// A shareable flag that cancels every run polling it once set.
///
/// # Examples
/// ```
/// use largevis_core::{CancellationToken, Progress};
///
/// let token = CancellationToken::new();
/// assert!(token.should_continue());
/// token.cancel();
/// assert!(!token.should_continue());
/// ```
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Reports whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Progress for CancellationToken {
    fn should_continue(&self) -> bool {
        !self.is_cancelled()
    }
}

/// How an engine call finished.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RunStatus {
    /// All requested work was performed.
    Completed,
    /// The progress callback requested an early stop.
    Cancelled,
}

impl RunStatus {
    /// Returns `true` for [`RunStatus::Completed`].
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Returned by stage functions when the progress callback stopped the work.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("run cancelled by progress callback")]
pub struct Cancelled;

/// Polls `progress`, mapping a stop request to [`Cancelled`].
#[inline]
pub(crate) fn checkpoint<P: Progress + ?Sized>(progress: &P) -> Result<(), Cancelled> {
    if progress.should_continue() {
        Ok(())
    } else {
        Err(Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_progress() {
        let stop = || false;
        assert_eq!(checkpoint(&stop), Err(Cancelled));
        assert_eq!(checkpoint(&RunToCompletion), Ok(()));
    }

    #[test]
    fn token_cancellation_is_sticky() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(checkpoint(&token).is_err());
    }
}
