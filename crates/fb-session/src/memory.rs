//! In-process correlation store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{SessionError, SessionResult};
use crate::exchange::ExchangeState;
use crate::store::{CorrelationKey, CorrelationStore, PutOutcome};

/// Correlation store backed by a concurrent map.
///
/// Suitable when the caller's sessions live in a single process. Each
/// `insert` and `remove` holds the shard lock for its key, which makes
/// [`CorrelationStore::take_and_clear`] atomic.
///
/// The capacity limit is exact: a new slot reserves its place in `slots`
/// while the shard lock for its key is held, so concurrent puts cannot
/// overshoot it.
#[derive(Debug, Default)]
pub struct InMemoryCorrelationStore {
    entries: DashMap<CorrelationKey, ExchangeState>,
    slots: AtomicUsize,
    max_entries: Option<usize>,
}

impl InMemoryCorrelationStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses new slots beyond `max_entries`.
    #[must_use]
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            slots: AtomicUsize::new(0),
            max_entries: Some(max_entries),
        }
    }

    /// Number of live slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reserve_slot(&self) -> SessionResult<()> {
        let Some(limit) = self.max_entries else {
            self.slots.fetch_add(1, Ordering::AcqRel);
            return Ok(());
        };
        self.slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .map(|_| ())
            .map_err(|_| SessionError::CapacityExceeded(limit))
    }

    fn release_slots(&self, n: usize) {
        if n > 0 {
            self.slots.fetch_sub(n, Ordering::AcqRel);
        }
    }
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn put(&self, key: &CorrelationKey, state: ExchangeState) -> SessionResult<PutOutcome> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(state);
                tracing::debug!(slot = %key, "replaced in-flight exchange");
                Ok(PutOutcome::Replaced)
            }
            Entry::Vacant(slot) => {
                self.reserve_slot()?;
                slot.insert(state);
                Ok(PutOutcome::Stored)
            }
        }
    }

    async fn take_and_clear(&self, key: &CorrelationKey) -> SessionResult<Option<ExchangeState>> {
        let taken = self.entries.remove(key).map(|(_, state)| state);
        if taken.is_some() {
            self.release_slots(1);
        }
        Ok(taken)
    }

    async fn purge_expired(&self, max_age: Duration) -> SessionResult<usize> {
        let mut purged = 0;
        self.entries.retain(|_, state| {
            let expired = state.is_expired(max_age);
            purged += usize::from(expired);
            !expired
        });
        self.release_slots(purged);
        Ok(purged)
    }
}
