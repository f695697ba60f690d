// vim: tw=80
//! Completion aggregation for split requests

use std::sync::{
    Mutex,
    OnceLock,
    PoisonError,
    atomic::{AtomicUsize, Ordering}
};
use crate::types::*;

/// Called exactly once with the outcome of a logical request.
pub type Completion = Box<dyn FnOnce(Result<()>) + Send>;

/// Bookkeeping for one logical request that has been split into sub-requests.
///
/// A group is born with one outstanding completion, which belongs to the
/// request's final sub-request.  Every other sub-request must be
/// [`register`](#method.register)ed before it is dispatched.  When the last
/// outstanding sub-request [`complete`](#method.complete)s, the request's
/// `Completion` fires with the first error recorded, if any.
///
/// Sub-requests may complete in any order, on any thread.
pub struct CompletionGroup {
    outstanding: AtomicUsize,
    /// First error reported by any sub-request
    error: OnceLock<Error>,
    completion: Mutex<Option<Completion>>,
}

impl CompletionGroup {
    pub fn new(completion: Completion) -> Self {
        CompletionGroup {
            outstanding: AtomicUsize::new(1),
            error: OnceLock::new(),
            completion: Mutex::new(Some(completion))
        }
    }

    /// Record the outcome of one sub-request.
    pub fn complete(&self, status: Result<()>) {
        if let Err(e) = status {
            if let Err(later) = self.error.set(e) {
                tracing::debug!(error = %later, "dropping secondary error");
            }
        }
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let status = match self.error.get() {
                Some(e) => Err(e.clone()),
                None => Ok(())
            };
            let completion = self.completion.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(f) = completion {
                f(status);
            }
        }
    }

    /// Has the request's completion already fired?
    pub fn is_resolved(&self) -> bool {
        self.outstanding() == 0
    }

    /// Number of sub-requests that have yet to complete
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Account for one more sub-request.
    pub fn register(&self) {
        let prev = self.outstanding.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "Registered a sub-request after resolution");
    }
}

// LCOV_EXCL_STOP
