//! Shared state handed to passes during compilation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use alsvid_plat::Platform;

use crate::options::Options;

/// Cooperative cancellation token.
///
/// Long-running passes check it at coarse granularity (between kernels or
/// sub-passes). A cancelled pass must leave the program either fully
/// processed or exactly as received.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Context a pass receives alongside the mutable program.
pub struct PassContext<'a> {
    /// The target platform.
    pub platform: &'a Platform,
    /// Dotted instance path of the running pass, for logs and errors.
    pub path: &'a str,
    /// The pass's frozen option set.
    pub options: &'a Options,
    /// Cancellation token supplied by the caller.
    pub cancel: &'a CancellationToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
