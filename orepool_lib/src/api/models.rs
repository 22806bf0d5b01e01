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

use crate::accounting::window::WindowedShareLedger;
use crate::ingest::ShareIngestion;
use crate::notify::NotificationBusHandle;
use crate::store::Store;
use crate::sync::ChainState;
use crate::utils::time_provider::TimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for share submission
#[derive(Debug, Deserialize)]
pub struct SubmitShareRequest {
    pub address: String,
    #[serde(default)]
    pub worker: String,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u64,
}

/// Response model for share submission
#[derive(Debug, Serialize)]
pub struct SubmitShareResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub block_candidate: bool,
}

/// Response model for the miner endpoint
#[derive(Debug, Serialize)]
pub struct MinerResponse {
    pub address: String,
    pub worker: String,
    pub pending_balance: u64,
    pub total_paid: u64,
    pub window_weight: u64,
    pub last_seen: u64,
    pub formatted_last_seen: String,
    pub payments: Vec<PaymentResponse>,
}

/// Response model for one payment
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub amount: u64,
    pub tx_hash: Option<String>,
    pub status: String,
    pub created_at: u64,
}

/// Response model for one block
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub hash: String,
    pub height: Option<u64>,
    pub reward: u64,
    pub finder: String,
    pub status: String,
    pub found_at: u64,
    pub formatted_found_at: String,
}

/// Response model for pool stats
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub chain_height: u64,
    pub network_difficulty: u64,
    pub daemon_reachable: bool,
    pub active_miners: usize,
    pub window_weight: u64,
    /// Window weight divided by window length, a rough hashes-per-second
    pub pool_hashrate: u64,
    pub confirmed_blocks: usize,
}

/// Query parameters for blocks endpoint
#[derive(Debug, Deserialize)]
pub struct BlocksQuery {
    pub limit: Option<usize>,
}

/// Query parameters for the websocket endpoint
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub address: Option<String>,
}

/// Error response model
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<Store>,
    pub ledger: Arc<WindowedShareLedger>,
    pub chain_state: Arc<ChainState>,
    pub ingestion: Arc<ShareIngestion>,
    pub notifications: NotificationBusHandle,
    pub time_provider: Arc<dyn TimeProvider>,
}
