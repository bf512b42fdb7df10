use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use super::{AggregationCascade, EmitSink, QueryResult, Timestamp};

/// Cascade behind a single critical-section lock
///
/// The sampling loop and a request handler can share one cascade through a
/// `static`. Every call holds the lock for its whole duration, so a query
/// reads all layers from one consistent state. The emit sink runs while the
/// lock is held.
pub struct SharedCascade<S, const CAPACITY: usize, const DEPTH: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<AggregationCascade<S, CAPACITY, DEPTH>>>,
}

impl<S, const CAPACITY: usize, const DEPTH: usize> SharedCascade<S, CAPACITY, DEPTH>
where
    S: EmitSink,
{
    pub const fn new(cascade: AggregationCascade<S, CAPACITY, DEPTH>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(cascade)),
        }
    }

    pub fn log(&self, value: f64, timestamp: Timestamp) {
        self.inner
            .lock(|cascade| cascade.borrow_mut().log(value, timestamp));
    }

    pub fn log_with_max(&self, value: f64, max: f64, timestamp: Timestamp) {
        self.inner
            .lock(|cascade| cascade.borrow_mut().log_with_max(value, max, timestamp));
    }

    pub fn query(&self) -> QueryResult {
        self.inner.lock(|cascade| cascade.borrow().query())
    }

    /// Run `f` against a consistent view of the cascade.
    pub fn with<R>(&self, f: impl FnOnce(&AggregationCascade<S, CAPACITY, DEPTH>) -> R) -> R {
        self.inner.lock(|cascade| f(&cascade.borrow()))
    }

    pub fn into_inner(self) -> AggregationCascade<S, CAPACITY, DEPTH> {
        self.inner.into_inner().into_inner()
    }
}
