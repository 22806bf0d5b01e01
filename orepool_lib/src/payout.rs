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

//! Payout scheduling.
//!
//! Funds movement is at most once. A payout first commits a reservation
//! (balance debit plus pending Payment row), then attempts one wallet
//! transfer. A definitive daemon refusal restores the funds; a transport
//! failure leaves the payment pending for operator review, because the
//! transfer may have gone through and restoring would double-pay.

use crate::error::PoolError;
use crate::gateway::DaemonGateway;
use crate::notify::{NotificationBusHandle, PoolEvent};
use crate::store::Store;
use crate::utils::time_provider::TimeProvider;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info};

pub struct PayoutScheduler {
    store: Arc<Store>,
    gateway: Arc<dyn DaemonGateway>,
    notifications: NotificationBusHandle,
    time_provider: Arc<dyn TimeProvider>,
    min_payout_atomic: u64,
    transfer_fee_atomic: u64,
    stale_payment_secs: u64,
    /// Addresses never paid out automatically
    exempt_addresses: HashSet<String>,
    // Guards against overlapping runs when a sweep outlasts the interval
    run_lock: Mutex<()>,
}

impl PayoutScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        gateway: Arc<dyn DaemonGateway>,
        notifications: NotificationBusHandle,
        time_provider: Arc<dyn TimeProvider>,
        min_payout_atomic: u64,
        transfer_fee_atomic: u64,
        stale_payment_secs: u64,
        exempt_addresses: HashSet<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifications,
            time_provider,
            min_payout_atomic,
            transfer_fee_atomic,
            stale_payment_secs,
            exempt_addresses,
            run_lock: Mutex::new(()),
        }
    }

    /// One payout sweep. Returns the number of payments sent.
    ///
    /// When a previous sweep is still running this one is skipped; the
    /// reservation makes overlap safe, the skip just avoids useless work.
    pub async fn run_once(&self) -> Result<usize, PoolError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            debug!("Payout sweep already running, skipping this tick");
            return Ok(0);
        };

        let now = self.time_provider.seconds_since_epoch();
        self.report_stale_payments(now)?;

        let eligible = self.store.miners_with_pending_at_least(self.min_payout_atomic)?;
        let mut sent = 0;
        for miner in eligible {
            if self.exempt_addresses.contains(&miner.address) {
                continue;
            }
            match self.pay_miner(&miner.address, now).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => error!("Payout to {} failed: {}", miner.address, e),
            }
        }
        if sent > 0 {
            info!("Payout sweep sent {} payments", sent);
        }
        Ok(sent)
    }

    async fn pay_miner(&self, address: &str, now: u64) -> Result<bool, PoolError> {
        let Some(payment) = self
            .store
            .reserve_payout(address, self.min_payout_atomic, now)?
        else {
            return Ok(false);
        };

        // Exactly one transfer attempt per reservation
        match self
            .gateway
            .transfer(address, payment.amount, self.transfer_fee_atomic)
            .await
        {
            Ok(Some(tx_hash)) => {
                self.store.settle_payment_sent(payment.id, &tx_hash)?;
                info!(
                    "Paid {} to {} in tx {}",
                    payment.amount, address, tx_hash
                );
                self.notifications
                    .publish(PoolEvent::PaymentSent {
                        address: address.to_string(),
                        amount: payment.amount,
                        tx_hash,
                    })
                    .await;
                Ok(true)
            }
            Ok(None) => {
                // Definitive refusal, funds go back to the pending balance
                self.store.settle_payment_failed(payment.id)?;
                Err(PoolError::PayoutFailure(format!(
                    "daemon refused transfer of {} to {}, balance restored",
                    payment.amount, address
                )))
            }
            Err(e) => {
                // Outcome unknown. The payment stays pending and is surfaced
                // by the stale report; restoring here could pay twice.
                error!(
                    "Transfer to {} did not settle, payment {} left pending: {}",
                    address, payment.id, e
                );
                Ok(false)
            }
        }
    }

    fn report_stale_payments(&self, now: u64) -> Result<(), PoolError> {
        let cutoff = now.saturating_sub(self.stale_payment_secs);
        for payment in self.store.stale_pending_payments(cutoff)? {
            error!(
                "Payment {} to {} for {} is stale since {}, needs operator review",
                payment.id, payment.address, payment.amount, payment.created_at
            );
        }
        Ok(())
    }
}

/// Spawn the periodic payout sweep.
///
/// The funds-moving task shuts down via the watch channel rather than an
/// abort, so a sweep in flight settles its reservations before exit.
pub fn start_payout_scheduler(
    scheduler: Arc<PayoutScheduler>,
    frequency: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frequency);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = scheduler.run_once().await {
                        error!("Payout sweep failed: {}", e);
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("Payout scheduler stopping");
                    break;
                }
            }
        }
    })
}
