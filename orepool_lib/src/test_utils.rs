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

//! Test doubles shared by the unit tests.

use crate::gateway::DaemonGateway;
use async_trait::async_trait;
use daemonrpc::{BlockId, DaemonBlock, DaemonBlockHeader, DaemonInfo, DaemonRpcError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scripted outcome for a transfer call
#[derive(Debug, Clone)]
pub enum ScriptedTransfer {
    Succeed(String),
    Refuse,
    TransportError,
}

/// Scriptable in-memory daemon. Each call consults scripted state, so tests
/// control exactly what the chain and wallet report.
pub struct FakeDaemon {
    info: Mutex<Option<DaemonInfo>>,
    blocks: Mutex<HashMap<String, DaemonBlock>>,
    submit_accepts: Mutex<bool>,
    transfers: Mutex<VecDeque<ScriptedTransfer>>,
    transfer_calls: Mutex<Vec<(String, u64, u64)>>,
}

impl Default for FakeDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self {
            info: Mutex::new(Some(DaemonInfo {
                height: 1,
                difficulty: 1,
                network_kind: "testnet".to_string(),
            })),
            blocks: Mutex::new(HashMap::new()),
            submit_accepts: Mutex::new(true),
            transfers: Mutex::new(VecDeque::new()),
            transfer_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_info(&self, height: u64, difficulty: u64) {
        *self.info.lock().unwrap() = Some(DaemonInfo {
            height,
            difficulty,
            network_kind: "testnet".to_string(),
        });
    }

    /// All daemon calls fail with a transport error until set_info is called
    pub fn go_offline(&self) {
        *self.info.lock().unwrap() = None;
    }

    pub fn add_block(&self, hash: &str, height: u64, reward: u64) {
        let block = DaemonBlock {
            block_header: DaemonBlockHeader {
                height,
                hash: hash.to_string(),
                reward,
                timestamp: 0,
            },
            tx_hashes: Vec::new(),
        };
        let mut blocks = self.blocks.lock().unwrap();
        blocks.insert(hash.to_string(), block.clone());
        blocks.insert(height.to_string(), block);
    }

    pub fn remove_block(&self, hash: &str) {
        self.blocks.lock().unwrap().remove(hash);
    }

    pub fn set_submit_accepts(&self, accepts: bool) {
        *self.submit_accepts.lock().unwrap() = accepts;
    }

    /// Queue the outcome for the next unreserved transfer call
    pub fn script_transfer(&self, outcome: ScriptedTransfer) {
        self.transfers.lock().unwrap().push_back(outcome);
    }

    /// The (address, amount, fee) triples transfer was called with
    pub fn transfer_calls(&self) -> Vec<(String, u64, u64)> {
        self.transfer_calls.lock().unwrap().clone()
    }

    fn offline_error() -> DaemonRpcError {
        DaemonRpcError::Other("connection refused".to_string())
    }
}

#[async_trait]
impl DaemonGateway for FakeDaemon {
    async fn get_info(&self) -> Result<DaemonInfo, DaemonRpcError> {
        self.info
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(Self::offline_error)
    }

    async fn get_block(&self, id: &BlockId) -> Result<DaemonBlock, DaemonRpcError> {
        if self.info.lock().unwrap().is_none() {
            return Err(Self::offline_error());
        }
        let key = match id {
            BlockId::Height(height) => height.to_string(),
            BlockId::Hash(hash) => hash.clone(),
        };
        self.blocks
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(DaemonRpcError::RpcError {
                code: -2,
                message: "block not found".to_string(),
            })
    }

    async fn submit_block(&self, _hash: &str) -> Result<bool, DaemonRpcError> {
        if self.info.lock().unwrap().is_none() {
            return Err(Self::offline_error());
        }
        Ok(*self.submit_accepts.lock().unwrap())
    }

    async fn transfer(
        &self,
        address: &str,
        amount_atomic: u64,
        fee_atomic: u64,
    ) -> Result<Option<String>, DaemonRpcError> {
        self.transfer_calls
            .lock()
            .unwrap()
            .push((address.to_string(), amount_atomic, fee_atomic));
        match self.transfers.lock().unwrap().pop_front() {
            Some(ScriptedTransfer::Succeed(tx_hash)) => Ok(Some(tx_hash)),
            Some(ScriptedTransfer::Refuse) => Ok(None),
            Some(ScriptedTransfer::TransportError) => Err(Self::offline_error()),
            // Unscripted transfers succeed with a fixed hash
            None => Ok(Some("fake_tx_hash".to_string())),
        }
    }
}
