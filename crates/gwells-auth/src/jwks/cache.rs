//! The process-wide signing certificate cache.
//!
//! # State machine
//!
//! Every lookup classifies the cached record before doing any work:
//!
//! | State | Condition | Action |
//! |---|---|---|
//! | Empty | no record yet | refresh |
//! | Fresh-Match | `kid` matches and not expired | return cached record |
//! | Stale-Expired | expiry reached | refresh |
//! | Stale-KidMismatch | `kid` differs from the token's | refresh |
//!
//! # Refresh
//!
//! Refreshes are single-flight: the first caller that finds the record
//! unusable registers a shared future keyed by the requested `kid` and
//! spawns the fetch task that resolves it. Callers arriving while it runs
//! await the same future, so a key rotation under load costs one round trip
//! to the identity provider. The task runs to completion even if every caller
//! waiting on it goes away, and it leaves the in-flight map on every exit
//! path, panics included.
//!
//! The record lock is synchronous and never held across an `.await`.
//!
//! When a refresh fails the cached record is left as it was. If its `kid`
//! is the one requested, it is still handed out so that an identity provider
//! outage does not break verification of tokens signed with a known key.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use time::OffsetDateTime;
use tokio::sync::oneshot;

use super::{CertificateRecord, HttpKeyFetcher, JwksError, KeyFetcher, KeySelector};
use crate::config::AuthConfig;

type RefreshOutcome = Result<Arc<CertificateRecord>, JwksError>;
type Flight = Shared<BoxFuture<'static, RefreshOutcome>>;
type FlightMap = Arc<Mutex<HashMap<Option<String>, Flight>>>;

/// Holds at most one resolved signing certificate and refreshes it on demand.
pub struct CertificateCache {
    /// Source of key sets.
    fetcher: Arc<dyn KeyFetcher>,
    /// Turns a key set into a record.
    selector: KeySelector,
    /// The current record, `None` until the first successful refresh.
    record: Arc<RwLock<Option<Arc<CertificateRecord>>>>,
    /// Refreshes currently running, by requested `kid`.
    in_flight: FlightMap,
}

impl CertificateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(fetcher: Arc<dyn KeyFetcher>, selector: KeySelector) -> Self {
        Self {
            fetcher,
            selector,
            record: Arc::new(RwLock::new(None)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates an empty cache that fetches from the configured JWKS endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwksError> {
        let fetcher = HttpKeyFetcher::new(config)?;
        Ok(Self::new(
            Arc::new(fetcher),
            KeySelector::new(config.certificate_ttl),
        ))
    }

    /// Returns the cached record without refreshing it.
    #[must_use]
    pub fn current(&self) -> Option<Arc<CertificateRecord>> {
        self.record.read().clone()
    }

    /// Loads the first published key.
    ///
    /// Used at startup, before any token has named a `kid`.
    ///
    /// # Errors
    ///
    /// Returns the fetch or selection error when no record can be loaded.
    pub async fn warm_up(&self) -> RefreshOutcome {
        self.get_or_refresh(None).await
    }

    /// Returns a record able to verify a token signed with `token_kid`.
    ///
    /// A fresh matching record is returned from cache without any network
    /// call. Otherwise the key set is fetched (once for all concurrent
    /// callers) and the cache updated.
    ///
    /// # Errors
    ///
    /// Returns the refresh error unless the existing record still matches
    /// `token_kid`, in which case that record is returned instead.
    pub async fn get_or_refresh(&self, token_kid: Option<&str>) -> RefreshOutcome {
        if let Some(record) = self.fresh_record(token_kid) {
            tracing::trace!(kid = %record.kid, "Certificate cache hit");
            return Ok(record);
        }

        tracing::debug!(kid = ?token_kid, "Certificate cache miss");

        match self.join_refresh(token_kid).await {
            Ok(record) => Ok(record),
            Err(err) => self.fallback(token_kid, err),
        }
    }

    /// Returns the cached record if it is in the Fresh-Match state.
    fn fresh_record(&self, token_kid: Option<&str>) -> Option<Arc<CertificateRecord>> {
        self.record
            .read()
            .as_ref()
            .filter(|r| r.matches(token_kid) && r.is_fresh_at(OffsetDateTime::now_utc()))
            .cloned()
    }

    /// Awaits the running refresh for `token_kid`, starting one if needed.
    async fn join_refresh(&self, token_kid: Option<&str>) -> RefreshOutcome {
        let key = token_kid.map(str::to_owned);

        let (flight, sender) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(flight) = in_flight.get(&key) {
                tracing::debug!(kid = ?key, "Joining in-flight certificate refresh");
                (flight.clone(), None)
            } else {
                // A flight for this kid may have landed since the first check.
                if let Some(record) = self.fresh_record(token_kid) {
                    return Ok(record);
                }
                let (tx, rx) = oneshot::channel();
                let flight = async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(JwksError::Refresh("refresh task ended without a result".into()))
                    })
                }
                .boxed()
                .shared();
                in_flight.insert(key.clone(), flight.clone());
                (flight, Some(tx))
            }
        };

        if let Some(tx) = sender {
            self.spawn_refresh(key, tx);
        }

        flight.await
    }

    /// Spawns the fetch-select-replace task for `kid`.
    ///
    /// The task owns the refresh, so it completes even when every waiter is
    /// dropped, and clears its in-flight slot however it ends.
    fn spawn_refresh(&self, kid: Option<String>, tx: oneshot::Sender<RefreshOutcome>) {
        let fetcher = Arc::clone(&self.fetcher);
        let selector = self.selector;
        let record = Arc::clone(&self.record);
        let slot = FlightSlot {
            in_flight: Arc::clone(&self.in_flight),
            kid: kid.clone(),
        };

        tokio::spawn(async move {
            let outcome = match fetcher.fetch().await {
                Ok(set) => selector
                    .select(&set, kid.as_deref(), OffsetDateTime::now_utc())
                    .map(Arc::new),
                Err(err) => Err(err),
            };

            match &outcome {
                Ok(fresh) => {
                    *record.write() = Some(Arc::clone(fresh));
                    tracing::info!(kid = %fresh.kid, expiry = %fresh.expiry, "New signing certificate obtained");
                }
                Err(err) => {
                    tracing::warn!(kid = ?kid, error = %err, "Certificate refresh failed");
                }
            }

            // Waiters see the outcome only after the slot is free.
            drop(slot);
            let _ = tx.send(outcome);
        });
    }

    /// Falls back to the existing record when it still matches `token_kid`.
    fn fallback(&self, token_kid: Option<&str>, err: JwksError) -> RefreshOutcome {
        match self.current() {
            Some(previous) if previous.matches(token_kid) => {
                tracing::warn!(
                    kid = %previous.kid,
                    expiry = %previous.expiry,
                    error = %err,
                    "Using previously cached certificate after failed refresh"
                );
                Ok(previous)
            }
            _ => Err(err),
        }
    }

    /// Replaces the record directly, bypassing the fetcher.
    #[cfg(test)]
    pub(crate) fn seed(&self, record: CertificateRecord) {
        *self.record.write() = Some(Arc::new(record));
    }
}

/// Removes a refresh from the in-flight map when its task ends.
struct FlightSlot {
    in_flight: FlightMap,
    kid: Option<String>,
}

impl Drop for FlightSlot {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.kid);
    }
}
