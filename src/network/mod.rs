//! Co-expression network construction
//!
//! Correlation and signed adjacency matrices, soft-threshold selection via
//! the scale-free topology criterion, and the topological overlap
//! dissimilarity that feeds hierarchical clustering.

mod adjacency;
mod soft_threshold;
mod tom;

pub use adjacency::{correlation_matrix, signed_adjacency};
pub use soft_threshold::{pick_soft_threshold, PowerFit, PowerSelection};
pub use tom::tom_dissimilarity;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle for the long-running matrix stages
///
/// The O(n^2)/O(n^3) computations poll the token between row blocks and
/// abort with [`crate::error::WgcnaError::Cancelled`] once it trips.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; safe to call from another thread
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
