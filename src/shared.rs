// 9.3 shared.rs: serialized handle for hosts that call a pool from several threads.
// every operation takes the one lock, so operations never interleave.

use std::sync::{Arc, Mutex};

use crate::credit_feed::CreditEventSource;
use crate::custody::SettlementAsset;
use crate::engine::{Pool, PoolError};

#[derive(Debug)]
pub struct SharedPool<A: SettlementAsset, E: CreditEventSource> {
    inner: Arc<Mutex<Pool<A, E>>>,
}

impl<A: SettlementAsset, E: CreditEventSource> Clone for SharedPool<A, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: SettlementAsset, E: CreditEventSource> SharedPool<A, E> {
    pub fn new(pool: Pool<A, E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Run `f` with exclusive access to the pool.
    pub fn with<R>(&self, f: impl FnOnce(&mut Pool<A, E>) -> R) -> Result<R, PoolError> {
        let mut pool = self.inner.lock().map_err(|_| PoolError::LockPoisoned)?;
        Ok(f(&mut pool))
    }

    /// Like `with`, for closures that already return a pool result.
    pub fn execute<R>(&self, f: impl FnOnce(&mut Pool<A, E>) -> Result<R, PoolError>) -> Result<R, PoolError> {
        self.with(f)?
    }

    // unwraps the handle once every clone is gone
    pub fn into_inner(self) -> Option<Pool<A, E>> {
        Arc::try_unwrap(self.inner).ok().and_then(|m| m.into_inner().ok())
    }
}
