//! Cooperative cancellation for long-running resolutions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PodError, PodResult};

/// Shared flag a caller flips to abort an in-flight resolution
///
/// Clones share the same flag, so one clone can be handed to the resolver
/// while another stays with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with `Cancelled` if cancellation was requested
    pub fn check(&self) -> PodResult<()> {
        if self.is_cancelled() {
            Err(PodError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancellationToken::new();
        let handle = token.clone();
        handle.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(PodError::Cancelled));
    }

    #[test]
    fn test_from_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let token = CancellationToken::from_flag(flag);
        assert!(token.is_cancelled());
    }
}
