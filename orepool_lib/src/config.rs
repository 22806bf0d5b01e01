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

use daemonrpc::DaemonRpcConfig;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    /// Pool fee in basis points, 100 = 1%
    pub fee_bips: u16,
    /// Wallet address the fee is accounted to
    pub pool_address: String,
    /// Share difficulty required for a submission to be accepted
    pub pool_difficulty: u64,
    /// Fallback block reward in atomic units, used when the daemon does not
    /// report a reward for a confirmed block
    pub block_reward_atomic: u64,
    /// Network fee budget passed to the wallet on transfers, atomic units
    pub transfer_fee_atomic: u64,
    /// How often to poll the daemon for height and difficulty
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Addresses exempt from payouts, with their reserved amounts
    #[serde(default)]
    pub premine: HashMap<String, u64>,
}

fn default_sync_interval_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    /// Length of the rolling share window in seconds
    pub window_secs: u64,
    /// How often expired shares are dropped from the window
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,
}

fn default_expiry_interval_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PayoutConfig {
    /// Minimum pending balance, in atomic units, before a payout is made
    pub min_payout_atomic: u64,
    /// Seconds between payout scheduler runs
    pub interval_secs: u64,
    /// Age in seconds after which a pending payment is reported as stale
    #[serde(default = "default_stale_payment_secs")]
    pub stale_payment_secs: u64,
}

fn default_stale_payment_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// The hostname for the HTTP API server
    pub hostname: String,
    /// The port for the HTTP API server
    pub port: u16,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    /// Log to file if specified
    pub file: Option<String>,
    /// Log level (defaults to "info")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log to console (defaults to true)
    pub console: Option<bool>,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pool: PoolConfig,
    pub window: WindowConfig,
    pub payout: PayoutConfig,
    pub store: StoreConfig,
    pub api: ApiConfig,
    pub daemonrpc: DaemonRpcConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A fee above 10_000 bips would exceed the whole reward
pub const MAX_FEE_BIPS: u16 = 10_000;

impl Config {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("OREPOOL").separator("_"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.pool.fee_bips > MAX_FEE_BIPS {
            return Err(config::ConfigError::Message(format!(
                "pool.fee_bips must be at most {MAX_FEE_BIPS}, got {}",
                self.pool.fee_bips
            )));
        }
        Ok(())
    }

    pub fn with_fee_bips(mut self, fee_bips: u16) -> Self {
        self.pool.fee_bips = fee_bips;
        self
    }

    pub fn with_pool_address(mut self, pool_address: String) -> Self {
        self.pool.pool_address = pool_address;
        self
    }

    pub fn with_pool_difficulty(mut self, pool_difficulty: u64) -> Self {
        self.pool.pool_difficulty = pool_difficulty;
        self
    }

    pub fn with_block_reward_atomic(mut self, block_reward_atomic: u64) -> Self {
        self.pool.block_reward_atomic = block_reward_atomic;
        self
    }

    pub fn with_window_secs(mut self, window_secs: u64) -> Self {
        self.window.window_secs = window_secs;
        self
    }

    pub fn with_min_payout_atomic(mut self, min_payout_atomic: u64) -> Self {
        self.payout.min_payout_atomic = min_payout_atomic;
        self
    }

    pub fn with_payout_interval_secs(mut self, interval_secs: u64) -> Self {
        self.payout.interval_secs = interval_secs;
        self
    }

    pub fn with_store_path(mut self, store_path: String) -> Self {
        self.store.path = store_path;
        self
    }

    pub fn with_api_hostname(mut self, api_hostname: String) -> Self {
        self.api.hostname = api_hostname;
        self
    }

    pub fn with_api_port(mut self, api_port: u16) -> Self {
        self.api.port = api_port;
        self
    }

    pub fn with_daemonrpc_url(mut self, daemon_url: String) -> Self {
        self.daemonrpc.url = daemon_url;
        self
    }

    pub fn with_daemonrpc_username(mut self, daemon_username: String) -> Self {
        self.daemonrpc.username = daemon_username;
        self
    }

    pub fn with_daemonrpc_password(mut self, daemon_password: String) -> Self {
        self.daemonrpc.password = daemon_password;
        self
    }
}
