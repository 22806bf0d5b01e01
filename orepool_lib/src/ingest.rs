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

//! Share ingestion: proof check, replay rejection, window credit and block
//! candidate detection for every submitted share.

use crate::accounting::predicate::ProofPredicate;
use crate::accounting::window::WindowedShareLedger;
use crate::error::{PoolError, RejectReason};
use crate::gateway::DaemonGateway;
use crate::notify::{NotificationBusHandle, PoolEvent};
use crate::store::{BlockRecord, ShareRecord, Store};
use crate::sync::ChainState;
use crate::utils::time_provider::TimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// A share submitted by a miner
#[derive(Debug, Clone)]
pub struct ShareSubmission {
    pub address: String,
    pub worker: String,
    pub hash: String,
    pub nonce: u64,
    /// Difficulty the miner claims the proof meets; becomes the share's
    /// window weight when accepted
    pub difficulty: u64,
}

/// The pool's verdict on a submission
#[derive(Debug, Clone, PartialEq)]
pub enum ShareOutcome {
    Accepted { block_candidate: bool },
    Rejected(RejectReason),
}

pub struct ShareIngestion {
    store: Arc<Store>,
    ledger: Arc<WindowedShareLedger>,
    predicate: Arc<dyn ProofPredicate>,
    chain_state: Arc<ChainState>,
    gateway: Arc<dyn DaemonGateway>,
    notifications: NotificationBusHandle,
    time_provider: Arc<dyn TimeProvider>,
    pool_difficulty: u64,
}

impl ShareIngestion {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        ledger: Arc<WindowedShareLedger>,
        predicate: Arc<dyn ProofPredicate>,
        chain_state: Arc<ChainState>,
        gateway: Arc<dyn DaemonGateway>,
        notifications: NotificationBusHandle,
        time_provider: Arc<dyn TimeProvider>,
        pool_difficulty: u64,
    ) -> Self {
        Self {
            store,
            ledger,
            predicate,
            chain_state,
            gateway,
            notifications,
            time_provider,
            pool_difficulty,
        }
    }

    /// Process one submitted share.
    ///
    /// An accepted share is durably recorded and credited to the window
    /// before the outcome is returned. When the hash also meets the network
    /// difficulty the share becomes a block candidate: the block is recorded
    /// pending and forwarded to the daemon. The daemon forward is best
    /// effort; confirmation polling settles the block's fate either way.
    pub async fn submit(&self, submission: ShareSubmission) -> Result<ShareOutcome, PoolError> {
        // The claimed difficulty must reach the pool floor and the proof
        // must actually meet what it claims
        if submission.difficulty < self.pool_difficulty
            || !self
                .predicate
                .meets_difficulty(&submission.hash, submission.difficulty)
        {
            return Ok(ShareOutcome::Rejected(RejectReason::InvalidProof));
        }

        let now = self.time_provider.seconds_since_epoch();
        let share = ShareRecord {
            address: submission.address.clone(),
            hash: submission.hash.clone(),
            nonce: submission.nonce,
            difficulty: submission.difficulty,
            timestamp: now,
            valid: true,
        };
        // The store insert is the replay boundary: the same (address, hash,
        // nonce) can be recorded and credited once, ever.
        if !self.store.record_share(&share, &submission.worker)? {
            return Ok(ShareOutcome::Rejected(RejectReason::DuplicateShare));
        }
        self.ledger
            .credit(&submission.address, submission.difficulty, now);

        let network_difficulty = self.chain_state.network_difficulty();
        let block_candidate = self
            .predicate
            .meets_difficulty(&submission.hash, network_difficulty);
        if block_candidate {
            self.handle_block_candidate(&submission, now).await?;
        }

        Ok(ShareOutcome::Accepted { block_candidate })
    }

    async fn handle_block_candidate(
        &self,
        submission: &ShareSubmission,
        now: u64,
    ) -> Result<(), PoolError> {
        let block = BlockRecord::new(
            submission.hash.clone(),
            submission.address.clone(),
            0,
            now,
        );
        // Concurrent submissions of the same qualifying hash collapse to the
        // first insert; only the winner forwards and announces.
        if !self.store.insert_block(&block)? {
            return Ok(());
        }
        info!(
            "Block candidate {} found by {}",
            submission.hash, submission.address
        );

        match self.gateway.submit_block(&submission.hash).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "Daemon refused block candidate {}, awaiting confirmation polling",
                    submission.hash
                );
            }
            Err(e) => {
                warn!(
                    "Could not forward block candidate {} to daemon: {}",
                    submission.hash, e
                );
            }
        }

        self.notifications
            .publish(PoolEvent::BlockFound {
                hash: submission.hash.clone(),
                finder: submission.address.clone(),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::predicate::TargetPredicate;
    use crate::notify::start_notification_bus;
    use crate::test_utils::FakeDaemon;
    use crate::utils::time_provider::TestTimeProvider;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<Store>,
        ledger: Arc<WindowedShareLedger>,
        chain_state: Arc<ChainState>,
        daemon: Arc<FakeDaemon>,
        ingestion: ShareIngestion,
    }

    fn fixture(pool_difficulty: u64) -> Fixture {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path().to_str().unwrap().to_string()).unwrap());
        let ledger = Arc::new(WindowedShareLedger::new(3600));
        let chain_state = Arc::new(ChainState::new());
        let daemon = Arc::new(FakeDaemon::new());
        let time_provider = Arc::new(TestTimeProvider::new(
            UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        ));
        let ingestion = ShareIngestion::new(
            store.clone(),
            ledger.clone(),
            Arc::new(TargetPredicate),
            chain_state.clone(),
            daemon.clone(),
            start_notification_bus(),
            time_provider,
            pool_difficulty,
        );
        Fixture {
            _dir: dir,
            store,
            ledger,
            chain_state,
            daemon,
            ingestion,
        }
    }

    fn submission(address: &str, hash: &str, nonce: u64) -> ShareSubmission {
        ShareSubmission {
            address: address.to_string(),
            worker: "rig0".to_string(),
            hash: hash.to_string(),
            nonce,
            difficulty: 1,
        }
    }

    #[tokio::test]
    async fn test_valid_share_is_accepted_and_credited() {
        let fixture = fixture(1);
        let hash = "00".repeat(32);

        let outcome = fixture
            .ingestion
            .submit(submission("addr_a", &hash, 1))
            .await
            .unwrap();
        // Network difficulty is still zero, so nothing is a block candidate
        assert_eq!(
            outcome,
            ShareOutcome::Accepted {
                block_candidate: false
            }
        );

        assert_eq!(fixture.ledger.miner_weight("addr_a", 1_700_000_000), 1);
        assert!(fixture
            .store
            .get_share("addr_a", &hash, 1)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_replayed_share_is_rejected() {
        let fixture = fixture(1);
        let hash = "00".repeat(32);

        fixture
            .ingestion
            .submit(submission("addr_a", &hash, 1))
            .await
            .unwrap();
        let outcome = fixture
            .ingestion
            .submit(submission("addr_a", &hash, 1))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::Rejected(RejectReason::DuplicateShare)
        );
        // Weight credited only once
        assert_eq!(fixture.ledger.miner_weight("addr_a", 1_700_000_000), 1);
    }

    #[tokio::test]
    async fn test_weak_proof_is_rejected_without_recording() {
        let fixture = fixture(1u64 << 32);
        let hash = format!("ff{}", "00".repeat(31));

        let outcome = fixture
            .ingestion
            .submit(submission("addr_a", &hash, 1))
            .await
            .unwrap();
        assert_eq!(outcome, ShareOutcome::Rejected(RejectReason::InvalidProof));
        assert!(fixture
            .store
            .get_share("addr_a", &hash, 1)
            .unwrap()
            .is_none());
        assert_eq!(fixture.ledger.miner_weight("addr_a", 1_700_000_000), 0);
    }

    #[tokio::test]
    async fn test_overstated_difficulty_claim_is_rejected() {
        let fixture = fixture(1);
        let hash = format!("ff{}", "00".repeat(31));

        let mut sub = submission("addr_a", &hash, 1);
        sub.difficulty = 1u64 << 32;
        let outcome = fixture.ingestion.submit(sub).await.unwrap();
        assert_eq!(outcome, ShareOutcome::Rejected(RejectReason::InvalidProof));
    }

    #[tokio::test]
    async fn test_block_candidate_is_recorded_and_forwarded() {
        let fixture = fixture(1);
        fixture.chain_state.update(100, 2);
        let hash = "00".repeat(32);

        let outcome = fixture
            .ingestion
            .submit(submission("addr_a", &hash, 1))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::Accepted {
                block_candidate: true
            }
        );

        let block = fixture.store.get_block(&hash).unwrap().unwrap();
        assert_eq!(block.finder, "addr_a");
        assert_eq!(block.status, crate::store::BlockStatus::Pending);
    }

    #[tokio::test]
    async fn test_block_candidate_survives_daemon_outage() {
        let fixture = fixture(1);
        fixture.chain_state.update(100, 2);
        fixture.daemon.go_offline();
        let hash = "00".repeat(32);

        // The forward fails but the share and the pending block still land
        let outcome = fixture
            .ingestion
            .submit(submission("addr_a", &hash, 1))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::Accepted {
                block_candidate: true
            }
        );
        assert!(fixture.store.get_block(&hash).unwrap().is_some());
    }
}
