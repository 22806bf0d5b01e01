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

use async_trait::async_trait;
use daemonrpc::{BlockId, DaemonBlock, DaemonBlockHeader, DaemonInfo, DaemonRpcError};
use orepool_lib::gateway::DaemonGateway;
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory daemon whose chain the test scripts directly
pub struct ScriptedDaemon {
    pub info: Mutex<DaemonInfo>,
    pub blocks: Mutex<HashMap<String, DaemonBlock>>,
    pub transfer_calls: Mutex<Vec<(String, u64, u64)>>,
}

impl ScriptedDaemon {
    pub fn new(height: u64, difficulty: u64) -> Self {
        Self {
            info: Mutex::new(DaemonInfo {
                height,
                difficulty,
                network_kind: "testnet".to_string(),
            }),
            blocks: Mutex::new(HashMap::new()),
            transfer_calls: Mutex::new(Vec::new()),
        }
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
}

#[async_trait]
impl DaemonGateway for ScriptedDaemon {
    async fn get_info(&self) -> Result<DaemonInfo, DaemonRpcError> {
        Ok(self.info.lock().unwrap().clone())
    }

    async fn get_block(&self, id: &BlockId) -> Result<DaemonBlock, DaemonRpcError> {
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
        Ok(true)
    }

    async fn transfer(
        &self,
        address: &str,
        amount_atomic: u64,
        fee_atomic: u64,
    ) -> Result<Option<String>, DaemonRpcError> {
        let mut calls = self.transfer_calls.lock().unwrap();
        calls.push((address.to_string(), amount_atomic, fee_atomic));
        Ok(Some(format!("tx-{}", calls.len())))
    }
}
