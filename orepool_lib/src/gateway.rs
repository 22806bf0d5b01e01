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
use daemonrpc::{BlockId, DaemonBlock, DaemonInfo, DaemonRpcClient, DaemonRpcError};

/// The pool's view of the network daemon and its wallet.
///
/// The object-safe trait is the seam for tests: components take
/// `Arc<dyn DaemonGateway>` and the fakes decide what the chain says.
#[async_trait]
pub trait DaemonGateway: Send + Sync {
    async fn get_info(&self) -> Result<DaemonInfo, DaemonRpcError>;
    async fn get_block(&self, id: &BlockId) -> Result<DaemonBlock, DaemonRpcError>;
    /// Ok(false) means the daemon was reached and refused the block
    async fn submit_block(&self, hash: &str) -> Result<bool, DaemonRpcError>;
    /// Single attempt, never retried. Ok(None) means the daemon was reached
    /// and refused the transfer.
    async fn transfer(
        &self,
        address: &str,
        amount_atomic: u64,
        fee_atomic: u64,
    ) -> Result<Option<String>, DaemonRpcError>;
}

#[async_trait]
impl DaemonGateway for DaemonRpcClient {
    async fn get_info(&self) -> Result<DaemonInfo, DaemonRpcError> {
        DaemonRpcClient::get_info(self).await
    }

    async fn get_block(&self, id: &BlockId) -> Result<DaemonBlock, DaemonRpcError> {
        DaemonRpcClient::get_block(self, id).await
    }

    async fn submit_block(&self, hash: &str) -> Result<bool, DaemonRpcError> {
        DaemonRpcClient::submit_block(self, hash).await
    }

    async fn transfer(
        &self,
        address: &str,
        amount_atomic: u64,
        fee_atomic: u64,
    ) -> Result<Option<String>, DaemonRpcError> {
        DaemonRpcClient::transfer(self, address, amount_atomic, fee_atomic).await
    }
}
