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

//! Block lifecycle processing.
//!
//! Pending blocks are confirmed or orphaned by asking the daemon, confirmed
//! blocks are re-checked against the chain so a reorg claws back what was
//! credited but not yet paid. Every state transition goes through the
//! store's compare-and-set, so no matter how many pollers race, each block
//! is distributed at most once and clawed back at most once.

use crate::accounting::window::WindowedShareLedger;
use crate::error::PoolError;
use crate::gateway::DaemonGateway;
use crate::notify::{NotificationBusHandle, PoolEvent};
use crate::reward::RewardDistributor;
use crate::store::{BlockRecord, BlockStatus, Store};
use crate::utils::time_provider::TimeProvider;
use daemonrpc::{BlockId, DaemonRpcError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How many recent blocks each poll re-examines
const POLL_BLOCK_LIMIT: usize = 100;

pub struct BlockEventProcessor {
    store: Arc<Store>,
    gateway: Arc<dyn DaemonGateway>,
    ledger: Arc<WindowedShareLedger>,
    distributor: RewardDistributor,
    notifications: NotificationBusHandle,
    time_provider: Arc<dyn TimeProvider>,
    /// Used when the daemon reports a zero reward for a confirmed block
    fallback_reward: u64,
}

impl BlockEventProcessor {
    pub fn new(
        store: Arc<Store>,
        gateway: Arc<dyn DaemonGateway>,
        ledger: Arc<WindowedShareLedger>,
        distributor: RewardDistributor,
        notifications: NotificationBusHandle,
        time_provider: Arc<dyn TimeProvider>,
        fallback_reward: u64,
    ) -> Self {
        Self {
            store,
            gateway,
            ledger,
            distributor,
            notifications,
            time_provider,
            fallback_reward,
        }
    }

    /// One confirmation sweep over the recent blocks.
    ///
    /// Daemon transport errors leave blocks in their current state for the
    /// next sweep; only a definitive daemon answer moves a block.
    pub async fn run_once(&self) -> Result<(), PoolError> {
        let blocks = self.store.recent_blocks(POLL_BLOCK_LIMIT)?;
        for block in blocks {
            let result = match block.status {
                BlockStatus::Pending => self.check_pending(&block).await,
                BlockStatus::Confirmed => self.check_confirmed(&block).await,
                BlockStatus::Orphaned => Ok(()),
            };
            if let Err(e) = result {
                error!("Block {} check failed: {}", block.hash, e);
            }
        }
        Ok(())
    }

    async fn check_pending(&self, block: &BlockRecord) -> Result<(), PoolError> {
        match self.gateway.get_block(&BlockId::Hash(block.hash.clone())).await {
            Ok(daemon_block) => {
                let header = daemon_block.block_header;
                self.confirm_block(block, header.height, header.reward).await
            }
            Err(DaemonRpcError::RpcError { .. }) => {
                // The daemon was reached and does not know the hash
                self.orphan_block(block, BlockStatus::Pending).await
            }
            Err(e) => {
                warn!(
                    "Skipping pending block {} this sweep, daemon unavailable: {}",
                    block.hash, e
                );
                Ok(())
            }
        }
    }

    /// A confirmed block whose height now holds a different hash was
    /// reorged out.
    async fn check_confirmed(&self, block: &BlockRecord) -> Result<(), PoolError> {
        let Some(height) = block.height else {
            return Ok(());
        };
        match self.gateway.get_block(&BlockId::Height(height)).await {
            Ok(daemon_block) => {
                if daemon_block.block_header.hash != block.hash {
                    self.orphan_block(block, BlockStatus::Confirmed).await
                } else {
                    Ok(())
                }
            }
            Err(DaemonRpcError::RpcError { .. }) => {
                self.orphan_block(block, BlockStatus::Confirmed).await
            }
            Err(e) => {
                warn!(
                    "Skipping confirmed block {} this sweep, daemon unavailable: {}",
                    block.hash, e
                );
                Ok(())
            }
        }
    }

    async fn confirm_block(
        &self,
        block: &BlockRecord,
        height: u64,
        reward: u64,
    ) -> Result<(), PoolError> {
        let reward = if reward > 0 {
            reward
        } else {
            warn!(
                "Daemon reported zero reward for block {}, using configured fallback",
                block.hash
            );
            self.fallback_reward
        };

        // Confirmation and distribution commit as one store operation, so
        // exactly one caller wins and a failure leaves the block pending
        // for the next sweep to retry
        let snapshot = self.ledger.snapshot(self.time_provider.seconds_since_epoch());
        if !self
            .distributor
            .confirm_and_distribute(&block.hash, Some(height), reward, &snapshot)?
        {
            return Ok(());
        }

        info!("Block {} confirmed at height {}", block.hash, height);
        self.notifications
            .publish(PoolEvent::BlockConfirmed {
                hash: block.hash.clone(),
                height,
            })
            .await;
        Ok(())
    }

    async fn orphan_block(&self, block: &BlockRecord, from: BlockStatus) -> Result<(), PoolError> {
        if !self
            .store
            .set_block_status(&block.hash, from, BlockStatus::Orphaned, None)?
        {
            return Ok(());
        }

        if from == BlockStatus::Confirmed {
            let reversed = self.store.claw_back_block(&block.hash)?;
            let total: u64 = reversed.iter().map(|(_, amount)| amount).sum();
            warn!(
                "Block {} orphaned by reorg, clawed back {} from {} miners",
                block.hash,
                total,
                reversed.len()
            );
        } else {
            info!("Block {} orphaned before confirmation", block.hash);
        }

        self.notifications
            .publish(PoolEvent::BlockOrphaned {
                hash: block.hash.clone(),
            })
            .await;
        Ok(())
    }
}

/// Spawn the periodic confirmation sweep
pub fn start_block_event_processor(
    processor: Arc<BlockEventProcessor>,
    frequency: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frequency);
        loop {
            interval.tick().await;
            if let Err(e) = processor.run_once().await {
                error!("Block confirmation sweep failed: {}", e);
            }
        }
    })
}
