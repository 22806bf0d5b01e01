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

use crate::store::StoreError;
use daemonrpc::DaemonRpcError;
use std::fmt;

/// Reasons a share submission is rejected. These are surfaced to the
/// submitting client and are not retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The (address, hash, nonce) key was seen before
    DuplicateShare,
    /// The proof does not satisfy the pool difficulty target, or is malformed
    InvalidProof,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateShare => write!(f, "duplicate share"),
            Self::InvalidProof => write!(f, "invalid proof"),
        }
    }
}

/// Error type for pool operations. All variants except storage corruption are
/// transient: callers either report them to the client for resubmission or
/// recover on the next scheduled run.
#[derive(Debug)]
pub enum PoolError {
    /// Storage cannot be reached; the caller's operation did not happen
    PersistenceUnavailable(StoreError),
    /// A daemon call failed at the transport level
    DaemonUnavailable(String),
    /// A transfer explicitly failed; the reservation has been rolled back
    PayoutFailure(String),
    /// A previously confirmed block was invalidated
    ReorgDetected(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersistenceUnavailable(err) => write!(f, "persistence unavailable: {err}"),
            Self::DaemonUnavailable(msg) => write!(f, "daemon unavailable: {msg}"),
            Self::PayoutFailure(msg) => write!(f, "payout failure: {msg}"),
            Self::ReorgDetected(hash) => write!(f, "reorg detected for block {hash}"),
        }
    }
}

impl std::error::Error for PoolError {}

impl From<StoreError> for PoolError {
    fn from(err: StoreError) -> Self {
        Self::PersistenceUnavailable(err)
    }
}

impl From<DaemonRpcError> for PoolError {
    fn from(err: DaemonRpcError) -> Self {
        Self::DaemonUnavailable(err.to_string())
    }
}
