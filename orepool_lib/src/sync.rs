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

//! Periodic daemon polling for chain height and network difficulty.
//!
//! Share ingestion keeps running on the last known values when the daemon
//! is unreachable; only block candidacy is degraded, never share accounting.

use crate::gateway::DaemonGateway;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Last known chain state, shared with ingestion and the API
pub struct ChainState {
    height: AtomicU64,
    network_difficulty: AtomicU64,
    daemon_reachable: AtomicBool,
}

impl ChainState {
    pub fn new() -> Self {
        Self {
            height: AtomicU64::new(0),
            network_difficulty: AtomicU64::new(0),
            daemon_reachable: AtomicBool::new(false),
        }
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::Relaxed)
    }

    /// Zero until the first successful poll; the proof predicate treats a
    /// zero difficulty as never qualifying, so no block candidates are
    /// flagged before the daemon has been seen.
    pub fn network_difficulty(&self) -> u64 {
        self.network_difficulty.load(Ordering::Relaxed)
    }

    pub fn daemon_reachable(&self) -> bool {
        self.daemon_reachable.load(Ordering::Relaxed)
    }

    pub fn update(&self, height: u64, network_difficulty: u64) {
        self.height.store(height, Ordering::Relaxed);
        self.network_difficulty
            .store(network_difficulty, Ordering::Relaxed);
        self.daemon_reachable.store(true, Ordering::Relaxed);
    }

    pub fn mark_unreachable(&self) {
        self.daemon_reachable.store(false, Ordering::Relaxed);
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

/// One poll of the daemon. Failures leave the last known height and
/// difficulty in place and only flip the reachability flag.
pub async fn poll_once(gateway: &dyn DaemonGateway, chain_state: &ChainState) {
    match gateway.get_info().await {
        Ok(daemon_info) => {
            let was_unreachable = !chain_state.daemon_reachable();
            chain_state.update(daemon_info.height, daemon_info.difficulty);
            if was_unreachable {
                info!(
                    "Daemon reachable at height {} difficulty {}",
                    daemon_info.height, daemon_info.difficulty
                );
            }
        }
        Err(e) => {
            if chain_state.daemon_reachable() {
                warn!("Daemon unreachable, keeping last known chain state: {}", e);
            }
            chain_state.mark_unreachable();
        }
    }
}

/// Spawn the daemon polling task
pub fn start_daemon_sync(
    gateway: Arc<dyn DaemonGateway>,
    chain_state: Arc<ChainState>,
    frequency: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frequency);
        loop {
            interval.tick().await;
            poll_once(gateway.as_ref(), chain_state.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeDaemon;

    #[tokio::test]
    async fn test_poll_updates_chain_state() {
        let daemon = FakeDaemon::new();
        daemon.set_info(1234, 5_000_000);
        let chain_state = ChainState::new();

        poll_once(&daemon, &chain_state).await;

        assert_eq!(chain_state.height(), 1234);
        assert_eq!(chain_state.network_difficulty(), 5_000_000);
        assert!(chain_state.daemon_reachable());
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_last_known_values() {
        let daemon = FakeDaemon::new();
        daemon.set_info(1234, 5_000_000);
        let chain_state = ChainState::new();
        poll_once(&daemon, &chain_state).await;

        daemon.go_offline();
        poll_once(&daemon, &chain_state).await;

        // Last known values survive the outage
        assert_eq!(chain_state.height(), 1234);
        assert_eq!(chain_state.network_difficulty(), 5_000_000);
        assert!(!chain_state.daemon_reachable());
    }

    #[test]
    fn test_initial_state_has_zero_difficulty() {
        let chain_state = ChainState::new();
        assert_eq!(chain_state.network_difficulty(), 0);
        assert!(!chain_state.daemon_reachable());
    }
}
