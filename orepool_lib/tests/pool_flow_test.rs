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

//! End-to-end pool flow: shares in, block found and confirmed, reward
//! distributed, payout sent.

mod common;

use common::ScriptedDaemon;
use orepool_lib::accounting::COIN;
use orepool_lib::accounting::predicate::TargetPredicate;
use orepool_lib::accounting::window::WindowedShareLedger;
use orepool_lib::block_event::BlockEventProcessor;
use orepool_lib::ingest::{ShareIngestion, ShareOutcome, ShareSubmission};
use orepool_lib::notify::start_notification_bus;
use orepool_lib::payout::PayoutScheduler;
use orepool_lib::reward::RewardDistributor;
use orepool_lib::store::{BlockStatus, PaymentStatus, Store};
use orepool_lib::sync::{ChainState, poll_once};
use orepool_lib::utils::time_provider::TestTimeProvider;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn submission(address: &str, hash: String, nonce: u64) -> ShareSubmission {
    ShareSubmission {
        address: address.to_string(),
        worker: "rig0".to_string(),
        hash,
        nonce,
        difficulty: 1,
    }
}

/// A weak hash that passes pool difficulty 1 but not network difficulty
fn weak_hash(seed: u8) -> String {
    let mut bytes = [0xa0u8; 32];
    bytes[31] = seed;
    hex::encode(bytes)
}

/// A strong hash that also passes the network difficulty
fn strong_hash() -> String {
    "00".repeat(32)
}

#[tokio::test]
async fn test_share_to_payout_flow() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::new(dir.path().to_str().unwrap().to_string()).unwrap());
    let ledger = Arc::new(WindowedShareLedger::new(7200));
    let chain_state = Arc::new(ChainState::new());
    let daemon = Arc::new(ScriptedDaemon::new(100, 2));
    let notifications = start_notification_bus();
    let time_provider = Arc::new(TestTimeProvider::new(
        UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    ));

    let (_subscriber_id, mut events) = notifications.subscribe(None).await.unwrap();

    poll_once(daemon.as_ref(), chain_state.as_ref()).await;
    assert!(chain_state.daemon_reachable());

    let ingestion = ShareIngestion::new(
        store.clone(),
        ledger.clone(),
        Arc::new(TargetPredicate),
        chain_state.clone(),
        daemon.clone(),
        notifications.clone(),
        time_provider.clone(),
        1,
    );

    // addr_a and addr_b build up 300:700 weight, then addr_a finds a block
    for nonce in 0..3 {
        let outcome = ingestion
            .submit(submission("addr_a", weak_hash(nonce as u8), nonce))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::Accepted {
                block_candidate: false
            }
        );
    }
    for nonce in 0..7 {
        ingestion
            .submit(submission("addr_b", weak_hash(100 + nonce as u8), nonce))
            .await
            .unwrap();
    }
    let outcome = ingestion
        .submit(submission("addr_a", strong_hash(), 999))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ShareOutcome::Accepted {
            block_candidate: true
        }
    );

    let event = events.recv().await.unwrap();
    assert!(event.contains("blockFound"));

    // The daemon confirms the block at height 101 with a 50 coin reward
    daemon.add_block(&strong_hash(), 101, 50 * COIN);
    let processor = BlockEventProcessor::new(
        store.clone(),
        daemon.clone(),
        ledger.clone(),
        RewardDistributor::new(store.clone(), 100),
        notifications.clone(),
        time_provider.clone(),
        50 * COIN,
    );
    processor.run_once().await.unwrap();

    let block = store.get_block(&strong_hash()).unwrap().unwrap();
    assert_eq!(block.status, BlockStatus::Confirmed);
    assert_eq!(block.height, Some(101));

    // 1% fee off 50 coins, remainder split 4:7 over the window weights
    // (addr_a has 3 weak shares plus the block share)
    let distributable = 50 * COIN - COIN / 2;
    let expected_a = (distributable as u128 * 4 / 11) as u64;
    let expected_b = (distributable as u128 * 7 / 11) as u64;
    assert_eq!(
        store.get_miner("addr_a").unwrap().unwrap().pending_balance,
        expected_a
    );
    assert_eq!(
        store.get_miner("addr_b").unwrap().unwrap().pending_balance,
        expected_b
    );

    let event = events.recv().await.unwrap();
    assert!(event.contains("blockConfirmed"));

    // Payout sweep pays both miners and zeroes their balances
    let scheduler = PayoutScheduler::new(
        store.clone(),
        daemon.clone(),
        notifications.clone(),
        time_provider.clone(),
        COIN / 10,
        COIN / 100,
        3600,
        HashSet::new(),
    );
    let sent = scheduler.run_once().await.unwrap();
    assert_eq!(sent, 2);

    let miner_a = store.get_miner("addr_a").unwrap().unwrap();
    assert_eq!(miner_a.pending_balance, 0);
    assert_eq!(miner_a.total_paid, expected_a);
    let miner_b = store.get_miner("addr_b").unwrap().unwrap();
    assert_eq!(miner_b.pending_balance, 0);
    assert_eq!(miner_b.total_paid, expected_b);

    let payments = store.payments_for_address("addr_a", 10).unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Sent);
    assert_eq!(daemon.transfer_calls.lock().unwrap().len(), 2);

    // Balances stay settled on a repeat sweep
    let sent = scheduler.run_once().await.unwrap();
    assert_eq!(sent, 0);
}

#[tokio::test]
async fn test_orphaned_block_never_pays() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::new(dir.path().to_str().unwrap().to_string()).unwrap());
    let ledger = Arc::new(WindowedShareLedger::new(7200));
    let chain_state = Arc::new(ChainState::new());
    let daemon = Arc::new(ScriptedDaemon::new(100, 2));
    let notifications = start_notification_bus();
    let time_provider = Arc::new(TestTimeProvider::new(
        UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    ));

    poll_once(daemon.as_ref(), chain_state.as_ref()).await;
    let ingestion = ShareIngestion::new(
        store.clone(),
        ledger.clone(),
        Arc::new(TargetPredicate),
        chain_state.clone(),
        daemon.clone(),
        notifications.clone(),
        time_provider.clone(),
        1,
    );
    ingestion
        .submit(submission("addr_a", strong_hash(), 1))
        .await
        .unwrap();

    // The daemon never indexes the hash, so the candidate orphans
    let processor = BlockEventProcessor::new(
        store.clone(),
        daemon.clone(),
        ledger.clone(),
        RewardDistributor::new(store.clone(), 100),
        notifications.clone(),
        time_provider.clone(),
        50 * COIN,
    );
    processor.run_once().await.unwrap();

    let block = store.get_block(&strong_hash()).unwrap().unwrap();
    assert_eq!(block.status, BlockStatus::Orphaned);
    assert_eq!(store.get_miner("addr_a").unwrap().unwrap().pending_balance, 0);

    let scheduler = PayoutScheduler::new(
        store.clone(),
        daemon.clone(),
        notifications,
        time_provider,
        COIN / 10,
        COIN / 100,
        3600,
        HashSet::new(),
    );
    assert_eq!(scheduler.run_once().await.unwrap(), 0);
    assert!(daemon.transfer_calls.lock().unwrap().is_empty());
}
