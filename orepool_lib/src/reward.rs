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

//! Reward distribution: splits a confirmed block's reward across the share
//! window in proportion to weight, after the pool fee.
//!
//! All arithmetic is integer. Per-miner amounts truncate, and the rounding
//! dust goes to the fee, so the credited amounts plus the fee always equal
//! the reward exactly.

use crate::accounting::WindowSnapshot;
use crate::error::PoolError;
use crate::store::Store;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Basis-point denominator: 10_000 bips = 100%
const BIPS_DENOMINATOR: u128 = 10_000;

/// The result of splitting a reward: per-miner credits and the pool fee
/// including rounding dust
#[derive(Debug, Clone, PartialEq)]
pub struct RewardSplit {
    pub credits: Vec<(String, u64)>,
    pub fee: u64,
}

/// Split a reward across the snapshot's weights.
///
/// Returns None when the window holds no weight. A confirmed block with an
/// empty window is an anomaly the caller must surface, not a division to
/// attempt.
pub fn split_reward(reward: u64, fee_bips: u16, snapshot: &WindowSnapshot) -> Option<RewardSplit> {
    if snapshot.total_weight == 0 {
        return None;
    }

    let fee = (reward as u128 * fee_bips as u128 / BIPS_DENOMINATOR) as u64;
    let distributable = reward - fee;

    let total_weight = snapshot.total_weight as u128;
    let mut credits = Vec::with_capacity(snapshot.weights.len());
    let mut credited = 0u64;
    for (address, weight) in &snapshot.weights {
        let amount = (distributable as u128 * *weight as u128 / total_weight) as u64;
        if amount > 0 {
            credits.push((address.clone(), amount));
        }
        credited += amount;
    }

    // Truncation dust joins the fee so the split is exact
    let dust = distributable - credited;
    Some(RewardSplit {
        credits,
        fee: fee + dust,
    })
}

/// Applies reward splits to the store for confirmed blocks
pub struct RewardDistributor {
    store: Arc<Store>,
    fee_bips: u16,
    /// Confirmed blocks that found an empty window
    anomalies: AtomicU64,
}

impl RewardDistributor {
    pub fn new(store: Arc<Store>, fee_bips: u16) -> Self {
        Self {
            store,
            fee_bips,
            anomalies: AtomicU64::new(0),
        }
    }

    pub fn anomaly_count(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    /// Split the reward over the snapshot and confirm the block with its
    /// credits in one atomic store operation, so a block is never left
    /// confirmed without its distribution. Returns true for the caller
    /// that won the pending to confirmed transition.
    pub fn confirm_and_distribute(
        &self,
        block_hash: &str,
        height: Option<u64>,
        reward: u64,
        snapshot: &WindowSnapshot,
    ) -> Result<bool, PoolError> {
        let (credits, fee) = match split_reward(reward, self.fee_bips, snapshot) {
            Some(split) => (split.credits, split.fee),
            None => (Vec::new(), 0),
        };

        let confirmed = self
            .store
            .confirm_block_distributed(block_hash, height, &credits, fee, reward)?;
        if !confirmed {
            return Ok(false);
        }

        if credits.is_empty() {
            self.anomalies.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Block {} confirmed with an empty share window, reward {} left undistributed",
                block_hash, reward
            );
        } else {
            info!(
                "Distributed block {}: reward {} to {} miners, fee {}",
                block_hash,
                reward,
                credits.len(),
                fee
            );
        }
        Ok(true)
    }
}
