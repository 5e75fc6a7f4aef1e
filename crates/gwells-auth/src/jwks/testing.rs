//! Test doubles shared by the cache and validator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{JsonWebKey, JsonWebKeySet, JwksError, KeyFetcher};

/// A fetcher that counts calls and returns a canned response.
pub(crate) struct StubFetcher {
    calls: AtomicUsize,
    response: Mutex<Result<JsonWebKeySet, JwksError>>,
    delay: Duration,
}

impl StubFetcher {
    pub(crate) fn ok(set: JsonWebKeySet) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(Ok(set)),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn failing(err: JwksError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(Err(err)),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn set_response(&self, response: Result<JsonWebKeySet, JwksError>) {
        *self.response.lock() = response;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for StubFetcher {
    async fn fetch(&self) -> Result<JsonWebKeySet, JwksError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().clone()
    }
}

/// Builds a key set from `(kid, n)` pairs.
pub(crate) fn key_set(entries: &[(&str, &str)]) -> JsonWebKeySet {
    JsonWebKeySet {
        keys: entries
            .iter()
            .map(|(kid, n)| JsonWebKey {
                kty: "RSA".to_string(),
                kid: (*kid).to_string(),
                key_use: "sig".to_string(),
                n: (*n).to_string(),
                e: "AQAB".to_string(),
            })
            .collect(),
    }
}
