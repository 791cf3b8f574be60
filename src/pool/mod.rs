//! Recycling pool for [`Document`] wrapper objects.
//!
//! Document wrappers are created and dropped at high rates by callers that
//! churn through documents; the pool keeps released wrappers on a free list
//! so the allocation is reused. Pool operations never fail and give no
//! ordering guarantee about which recycled instance comes back.
//!
//! The pool is the one facade component designed for concurrent use: the
//! free list lives behind a `Mutex`, so unrelated threads may acquire and
//! release wrappers freely. The documents themselves remain single-threaded
//! with respect to mutation.

use std::sync::{Mutex, PoisonError};

use crate::node::Document;

/// A concurrency-safe free list of recycled [`Document`] wrappers.
#[derive(Debug, Default)]
pub struct DocumentPool {
    free: Mutex<Vec<Document>>,
}

impl DocumentPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a recycled or freshly allocated wrapper with handle zero and
    /// the persistent flag. The caller must bind a fresh handle before use.
    #[must_use]
    pub fn acquire(&self) -> Document {
        let recycled = self.lock().pop();
        match recycled {
            Some(doc) => {
                log::trace!(target: "domgraft.pool", "recycled document wrapper");
                doc
            }
            None => Document::empty(),
        }
    }

    /// Returns a wrapper to the pool for reuse by a future document.
    ///
    /// The wrapper's underlying tree must already have been freed; the pool
    /// resets the handle and ownership flag before recycling, so a stale
    /// handle can never leak into the next acquire.
    pub fn release(&self, mut doc: Document) {
        doc.reset();
        self.lock().push(doc);
    }

    /// Number of wrappers currently idle in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Pool operations never fail: a poisoned lock (a panic on another
    /// thread mid-push/pop of plain `Document` values) leaves the list
    /// usable, so we take the guard either way.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Document>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn test_acquire_from_empty_pool() {
        let pool = DocumentPool::new();
        let doc = pool.acquire();
        assert_eq!(doc.raw(), 0);
        assert!(!doc.is_mortal());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_release_then_acquire_recycles() {
        let pool = DocumentPool::new();
        let doc = pool.acquire();
        pool.release(doc);
        assert_eq!(pool.idle(), 1);
        let _again = pool.acquire();
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_recycled_wrapper_is_reset() {
        let mut engine = Engine::new();
        let pool = DocumentPool::new();

        let mut doc = pool.acquire();
        doc.bind(engine.create_document(Some("1.0"), None));
        doc.make_mortal();
        let first_raw = doc.raw();
        doc.release(&mut engine).expect("free tree");
        pool.release(doc);

        // The recycled instance never aliases the released handle.
        let again = pool.acquire();
        assert_eq!(again.raw(), 0);
        assert!(!again.is_mortal());
        assert_ne!(again.raw(), first_raw);
    }

    #[test]
    fn test_release_resets_even_unreleased_handle() {
        let pool = DocumentPool::new();
        let mut doc = pool.acquire();
        doc.make_mortal();
        pool.release(doc);
        let again = pool.acquire();
        assert_eq!(again.raw(), 0);
        assert!(!again.is_mortal());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        use std::sync::Arc;

        let pool = Arc::new(DocumentPool::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    let doc = pool.acquire();
                    assert_eq!(doc.raw(), 0);
                    pool.release(doc);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker thread");
        }
        // Every wrapper came back; the free list is intact.
        assert!(pool.idle() >= 1);
    }
}
