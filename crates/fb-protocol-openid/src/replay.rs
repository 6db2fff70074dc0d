//! Seen response nonces.
//!
//! ## NIST 800-53 Rev5: IA-2(8) (Replay-Resistant Authentication)
//!
//! A provider never issues the same `openid.response_nonce` twice. The cache
//! remembers every nonce accepted from an endpoint for as long as the nonce
//! could still pass the age check; older entries are dropped on the next
//! insert.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Accepted nonces keyed by `(op_endpoint, response_nonce)`.
#[derive(Debug)]
pub struct NonceCache {
    seen: DashMap<(String, String), DateTime<Utc>>,
    max_age: Duration,
}

impl NonceCache {
    /// Creates a cache holding nonces for `max_age`.
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            max_age,
        }
    }

    /// Records a nonce issued at `issued`.
    ///
    /// Returns `false` when the endpoint already used this nonce.
    pub fn record(&self, op_endpoint: &str, nonce: &str, issued: DateTime<Utc>) -> bool {
        let cutoff = Utc::now() - self.max_age;
        self.seen.retain(|_, at| *at >= cutoff);

        match self.seen.entry((op_endpoint.to_string(), nonce.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(issued);
                true
            }
        }
    }

    /// Returns the number of remembered nonces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns whether no nonce is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
