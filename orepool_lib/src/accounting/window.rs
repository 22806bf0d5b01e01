// Copyright (C) 2025, 2026 Orepool Developers (see AUTHORS)
//
// This file is part of Orepool
//
// Orepool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Orepool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Orepool. If not, see <https://www.gnu.org/licenses/>.

//! Rolling-window share ledger.
//!
//! Shares contribute their submitted difficulty as weight for a fixed time
//! window after acceptance. All state lives behind one lock, so a snapshot
//! is a consistent cut: the weights and the total always come from the same
//! instant.

use super::WindowSnapshot;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

struct WindowInner {
    /// Per-miner share entries, oldest first
    entries: HashMap<String, VecDeque<(u64, u64)>>,
    /// Per-miner running weight sums, kept in lockstep with entries
    sums: HashMap<String, u64>,
    total_weight: u64,
}

pub struct WindowedShareLedger {
    window_secs: u64,
    inner: Mutex<WindowInner>,
}

impl WindowedShareLedger {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            inner: Mutex::new(WindowInner {
                entries: HashMap::new(),
                sums: HashMap::new(),
                total_weight: 0,
            }),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Credit an accepted share's weight to a miner at the given time
    pub fn credit(&self, address: &str, weight: u64, timestamp: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .entries
            .entry(address.to_string())
            .or_default()
            .push_back((timestamp, weight));
        *inner.sums.entry(address.to_string()).or_default() += weight;
        inner.total_weight += weight;
    }

    /// Total weight currently inside the window as of `now`
    pub fn total_weight(&self, now: u64) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        Self::expire_locked(&mut inner, self.window_secs, now);
        inner.total_weight
    }

    /// Weight of a single miner inside the window as of `now`
    pub fn miner_weight(&self, address: &str, now: u64) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        Self::expire_locked(&mut inner, self.window_secs, now);
        inner.sums.get(address).copied().unwrap_or(0)
    }

    /// Take a consistent cut of the window as of `now`. Expired shares are
    /// dropped first, so the snapshot contains only weights that are still
    /// eligible for distribution.
    pub fn snapshot(&self, now: u64) -> WindowSnapshot {
        let mut inner = self.inner.lock().unwrap();
        Self::expire_locked(&mut inner, self.window_secs, now);

        let mut weights: Vec<(String, u64)> = inner
            .sums
            .iter()
            .filter(|(_, weight)| **weight > 0)
            .map(|(address, weight)| (address.clone(), *weight))
            .collect();
        // Deterministic ordering so distribution rounding is reproducible
        weights.sort_by(|a, b| a.0.cmp(&b.0));

        WindowSnapshot {
            weights,
            total_weight: inner.total_weight,
            taken_at: now,
        }
    }

    /// Drop shares older than the window. Called on every read path and by
    /// the periodic expiry task so memory does not grow between reads.
    pub fn expire(&self, now: u64) {
        let mut inner = self.inner.lock().unwrap();
        Self::expire_locked(&mut inner, self.window_secs, now);
    }

    fn expire_locked(inner: &mut WindowInner, window_secs: u64, now: u64) {
        let cutoff = now.saturating_sub(window_secs);
        let mut expired_total = 0u64;

        for (address, entries) in inner.entries.iter_mut() {
            let mut expired = 0u64;
            while let Some((timestamp, weight)) = entries.front() {
                if *timestamp > cutoff {
                    break;
                }
                expired += weight;
                entries.pop_front();
            }
            if expired > 0 {
                if let Some(sum) = inner.sums.get_mut(address) {
                    *sum = sum.saturating_sub(expired);
                }
                expired_total += expired;
            }
        }

        inner.entries.retain(|_, entries| !entries.is_empty());
        inner.sums.retain(|_, sum| *sum > 0);
        inner.total_weight = inner.total_weight.saturating_sub(expired_total);

        if expired_total > 0 {
            debug!("Expired {} share weight from window", expired_total);
        }
    }
}

/// Spawn the periodic expiry task for the given ledger. Runs until the
/// process exits; expiry is idempotent so a missed tick only delays cleanup.
pub fn start_expiry_task(
    ledger: Arc<WindowedShareLedger>,
    time_provider: Arc<dyn crate::utils::time_provider::TimeProvider>,
    frequency: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frequency);
        loop {
            interval.tick().await;
            ledger.expire(time_provider.seconds_since_epoch());
        }
    })
}
