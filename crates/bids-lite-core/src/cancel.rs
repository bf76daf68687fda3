//! Cooperative cancellation for the apply phase.
//!
//! The writer checks the token between operations, never inside a transfer,
//! so a cancelled run leaves every destination either fully written or absent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation flag shared between the shell and the writer.
///
/// Cloning yields a handle on the same flag, so a signal handler or UI thread
/// can hold one clone while the writer polls another.
///
/// # Example
///
/// ```
/// use bids_lite_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
///
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed by every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
