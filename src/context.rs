//! Cancellation and deadline handling for one scan.
//!
//! A [`ScanContext`] is threaded through the entire engine and every plugin
//! call. The walker checks it before each entry and before each extractor
//! dispatch; a running extractor is never interrupted, but no further work is
//! started once cancellation is observed.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::ScanError;

/// Cancellation handle plus optional deadline for a scan run.
///
/// Cloning is cheap; all clones observe the same cancellation.
///
/// # Example
///
/// ```
/// use hostscan::context::ScanContext;
///
/// let ctx = ScanContext::new();
/// assert!(ctx.check().is_ok());
/// ctx.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ScanContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanContext {
    /// A context that never expires on its own.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context that reports cancellation once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Signals cancellation to every clone of this context.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once [`cancel`](Self::cancel) was called or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Returns [`ScanError::Cancelled`] once the context is no longer live.
    ///
    /// A passed deadline is reported as cancellation as well; the deadline is
    /// just the caller's way of scheduling one.
    pub fn check(&self) -> Result<(), ScanError> {
        if self.is_cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fresh_context_is_live() {
        let ctx = ScanContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let ctx = ScanContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(ScanError::Cancelled)));
    }

    #[test]
    fn test_past_deadline_reports_cancelled() {
        let ctx = ScanContext::with_deadline(Instant::now() - Duration::from_secs(1));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_future_deadline_is_live() {
        let ctx = ScanContext::with_deadline(Instant::now() + Duration::from_secs(3600));
        assert!(ctx.check().is_ok());
    }
}
