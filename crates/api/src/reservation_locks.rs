// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! In-process reservation locks.
//!
//! A commit holds one lock per `(business, technician, UTC date)` its
//! interval may touch. Keys are always acquired in sorted order, so two
//! commits that share technicians cannot deadlock. Entries are dropped from
//! the table once no guard or waiter refers to them.

use chrono::{Days, NaiveDate};
use fieldbook_domain::Interval;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Identifies one technician-day of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReservationKey {
    pub business_id: i64,
    pub technician_id: i64,
    /// UTC calendar date bucket.
    pub date: NaiveDate,
}

impl ReservationKey {
    /// Keys covering every technician for every UTC date `interval` touches,
    /// sorted and deduplicated.
    #[must_use]
    pub fn for_interval(business_id: i64, technician_ids: &[i64], interval: &Interval) -> Vec<Self> {
        let first: NaiveDate = interval.start().date_naive();
        // The end is exclusive; an interval ending at midnight stays in the
        // previous bucket.
        let last: NaiveDate = (interval.end() - chrono::Duration::seconds(1)).date_naive();

        let mut dates: Vec<NaiveDate> = vec![first];
        let mut day: NaiveDate = first;
        while day < last {
            match day.checked_add_days(Days::new(1)) {
                Some(next) => {
                    dates.push(next);
                    day = next;
                }
                None => break,
            }
        }

        let mut keys: Vec<Self> = technician_ids
            .iter()
            .flat_map(|technician_id| {
                dates.iter().map(move |date| Self {
                    business_id,
                    technician_id: *technician_id,
                    date: *date,
                })
            })
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Lock acquisition failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The total wait budget ran out before every key was held.
    #[error("timed out after {waited_ms}ms waiting for technician {technician_id} on {date}")]
    Timeout {
        technician_id: i64,
        date: NaiveDate,
        waited_ms: u128,
    },
}

/// Table of reservation locks shared by all coordinator calls.
#[derive(Debug, Default)]
pub struct ReservationLocks {
    entries: Mutex<HashMap<ReservationKey, Arc<AsyncMutex<()>>>>,
}

impl ReservationLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires every key, in sorted order, within `timeout` in total.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Timeout` naming the key that could not be taken.
    /// Keys acquired before the timeout are released.
    pub async fn acquire(
        self: &Arc<Self>,
        keys: &[ReservationKey],
        timeout: Duration,
    ) -> Result<ReservationGuard, LockError> {
        let started: Instant = Instant::now();
        let deadline: Instant = started + timeout;

        let mut sorted: Vec<ReservationKey> = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guard: ReservationGuard = ReservationGuard {
            locks: Arc::clone(self),
            held: Vec::with_capacity(sorted.len()),
        };

        for key in sorted {
            let mutex: Arc<AsyncMutex<()>> = self.entry(key);
            match tokio::time::timeout_at(deadline, mutex.lock_owned()).await {
                Ok(held) => guard.held.push((key, held)),
                Err(_) => {
                    self.prune(&[key]);
                    let waited_ms: u128 = started.elapsed().as_millis();
                    warn!(
                        technician_id = key.technician_id,
                        date = %key.date,
                        waited_ms,
                        "Reservation lock timed out"
                    );
                    return Err(LockError::Timeout {
                        technician_id: key.technician_id,
                        date: key.date,
                        waited_ms,
                    });
                }
            }
        }

        debug!(
            keys = guard.held.len(),
            waited_ms = started.elapsed().as_millis(),
            "Reservation locks acquired"
        );
        Ok(guard)
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    fn entry(&self, key: ReservationKey) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.table().entry(key).or_default())
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<ReservationKey, Arc<AsyncMutex<()>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops entries nobody holds or waits on.
    fn prune(&self, keys: &[ReservationKey]) {
        let mut table = self.table();
        for key in keys {
            if table.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
                table.remove(key);
            }
        }
    }
}

/// Holds a set of reservation locks until dropped.
#[derive(Debug)]
pub struct ReservationGuard {
    locks: Arc<ReservationLocks>,
    held: Vec<(ReservationKey, OwnedMutexGuard<()>)>,
}

impl ReservationGuard {
    /// The keys held, in acquisition order.
    #[must_use]
    pub fn keys(&self) -> Vec<ReservationKey> {
        self.held.iter().map(|(key, _)| *key).collect()
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        let keys: Vec<ReservationKey> = self.keys();
        self.held.clear();
        self.locks.prune(&keys);
    }
}
