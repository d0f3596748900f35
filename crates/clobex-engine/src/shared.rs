//! Thread-safe handle to an [`Exchange`].
//!
//! Every operation runs whole under one lock, so no caller ever observes a
//! half-applied submission.

use std::sync::{Arc, Mutex};

use clobex_ledger::Custody;
use clobex_types::{ClobError, Result};

use crate::Exchange;

pub struct SharedExchange<C: Custody> {
    inner: Arc<Mutex<Exchange<C>>>,
}

impl<C: Custody> Clone for SharedExchange<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Custody> SharedExchange<C> {
    #[must_use]
    pub fn new(exchange: Exchange<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(exchange)),
        }
    }

    /// Run a read-only closure under the lock.
    ///
    /// # Errors
    /// Returns `Internal` if the lock is poisoned.
    pub fn with<R>(&self, f: impl FnOnce(&Exchange<C>) -> R) -> Result<R> {
        let guard = self.inner.lock().map_err(|_| poisoned())?;
        Ok(f(&guard))
    }

    /// Run a mutating closure under the lock.
    ///
    /// # Errors
    /// Returns `Internal` if the lock is poisoned.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Exchange<C>) -> R) -> Result<R> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        Ok(f(&mut guard))
    }
}

fn poisoned() -> ClobError {
    tracing::error!("Exchange lock poisoned");
    ClobError::Internal("exchange lock poisoned".into())
}
