//! At most one in-flight external fetch per URL fingerprint.
//!
//! The fingerprint is a SHA-256 of the exact URL string. No normalization
//! is applied: URLs differing in any character, query strings included,
//! are fetched independently. Concurrent callers for one fingerprint share
//! the first caller's result; the entry is dropped as soon as that fetch
//! completes, so a later call fetches again.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::hashing::sha256_hex;

/// Deterministic fingerprint of a request URL.
pub fn fingerprint(url: &str) -> String {
    sha256_hex(url.as_bytes())
}

type InFlight<T, E> = Arc<OnceCell<Result<T, E>>>;

/// Coalesces concurrent fetches of the same URL.
pub struct FetchDeduplicator<T, E> {
    in_flight: DashMap<String, InFlight<T, E>>,
}

impl<T, E> FetchDeduplicator<T, E>
where
    T: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Run `fetch` for `url` unless a fetch for the same fingerprint is
    /// already running, in which case wait for and return its result.
    pub async fn fetch<F, Fut>(&self, url: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = fingerprint(url);
        let cell = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell.get_or_init(fetch).await.clone();

        // Only the cell we waited on is removed; a newer fetch may already
        // sit under the same key.
        self.in_flight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));

        result
    }

    /// Number of fingerprints with a fetch currently running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl<T, E> Default for FetchDeduplicator<T, E>
where
    T: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
