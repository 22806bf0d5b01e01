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

use clap::Parser;
use daemonrpc::DaemonRpcClient;
use orepool_lib::accounting::predicate::TargetPredicate;
use orepool_lib::accounting::window::{WindowedShareLedger, start_expiry_task};
use orepool_lib::api::models::ApiState;
use orepool_lib::api::server::ApiServer;
use orepool_lib::block_event::{BlockEventProcessor, start_block_event_processor};
use orepool_lib::config::Config;
use orepool_lib::gateway::DaemonGateway;
use orepool_lib::ingest::ShareIngestion;
use orepool_lib::logging::setup_logging;
use orepool_lib::notify::start_notification_bus;
use orepool_lib::payout::{PayoutScheduler, start_payout_scheduler};
use orepool_lib::reward::RewardDistributor;
use orepool_lib::store::Store;
use orepool_lib::sync::{ChainState, start_daemon_sync};
use orepool_lib::utils::time_provider::{SystemTimeProvider, TimeProvider};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::signal::{ShutdownReason, setup_signal_handler};

mod signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env("OREPOOL_CONFIG"))]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    // hold guard to ensure logging is set up correctly
    let _guard = match setup_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            error!("Failed to set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Starting Orepool...");

    let exit_sender = tokio::sync::watch::Sender::new(ShutdownReason::None);
    let sig_handle = setup_signal_handler(exit_sender.clone());

    let store = match Store::new(config.store.path.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open store at {}: {e}", config.store.path);
            return ExitCode::FAILURE;
        }
    };

    let gateway: Arc<dyn DaemonGateway> = match DaemonRpcClient::new(&config.daemonrpc) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create daemon RPC client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let ledger = Arc::new(WindowedShareLedger::new(config.window.window_secs));
    let chain_state = Arc::new(ChainState::new());
    let notifications = start_notification_bus();

    let sync_handle = start_daemon_sync(
        gateway.clone(),
        chain_state.clone(),
        Duration::from_secs(config.pool.sync_interval_secs),
    );
    let expiry_handle = start_expiry_task(
        ledger.clone(),
        time_provider.clone(),
        Duration::from_secs(config.window.expiry_interval_secs),
    );

    let ingestion = Arc::new(ShareIngestion::new(
        store.clone(),
        ledger.clone(),
        Arc::new(TargetPredicate),
        chain_state.clone(),
        gateway.clone(),
        notifications.clone(),
        time_provider.clone(),
        config.pool.pool_difficulty,
    ));

    let processor = Arc::new(BlockEventProcessor::new(
        store.clone(),
        gateway.clone(),
        ledger.clone(),
        RewardDistributor::new(store.clone(), config.pool.fee_bips),
        notifications.clone(),
        time_provider.clone(),
        config.pool.block_reward_atomic,
    ));
    let processor_handle = start_block_event_processor(
        processor,
        Duration::from_secs(config.pool.sync_interval_secs),
    );

    // The pool's own address and premine addresses never receive payouts
    let mut exempt_addresses: std::collections::HashSet<String> =
        config.pool.premine.keys().cloned().collect();
    exempt_addresses.insert(config.pool.pool_address.clone());
    let scheduler = Arc::new(PayoutScheduler::new(
        store.clone(),
        gateway.clone(),
        notifications.clone(),
        time_provider.clone(),
        config.payout.min_payout_atomic,
        config.pool.transfer_fee_atomic,
        config.payout.stale_payment_secs,
        exempt_addresses,
    ));
    let (payout_shutdown_tx, payout_shutdown_rx) = tokio::sync::watch::channel(false);
    let payout_handle = start_payout_scheduler(
        scheduler,
        Duration::from_secs(config.payout.interval_secs),
        payout_shutdown_rx,
    );

    let api_server = ApiServer::new(
        ApiState {
            store,
            ledger,
            chain_state,
            ingestion,
            notifications,
            time_provider,
        },
        config.api.hostname.clone(),
        config.api.port,
    );
    let exit_sender_api = exit_sender.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server stopped: {e}");
            let _ = exit_sender_api.send(ShutdownReason::Error);
        }
    });
    info!(
        "API server started on host {} port {}",
        config.api.hostname, config.api.port
    );

    let mut exit_receiver = exit_sender.subscribe();
    let reason = if *exit_receiver.borrow() != ShutdownReason::None {
        *exit_receiver.borrow()
    } else {
        let _ = exit_receiver.changed().await;
        *exit_receiver.borrow()
    };

    info!("Orepool shutting down: {reason:?}");
    // Let any in-flight payout sweep settle before exiting
    let _ = payout_shutdown_tx.send(true);
    let _ = payout_handle.await;
    for handle in [sync_handle, expiry_handle, processor_handle, api_handle] {
        handle.abort();
    }
    let _ = sig_handle.await;

    if reason.is_requested() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
