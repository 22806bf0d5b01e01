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

//! Persistent store for miners, shares, blocks and payments.
//!
//! RocksDB is used as the underlying database, with column families so that
//! compactions are independent for each record type. Reads go directly to
//! the database. All mutations take the internal write mutex, so compound
//! operations (payout reservation, reward distribution, block state
//! compare-and-set) are atomic with respect to each other, and a WriteBatch
//! makes each compound operation atomic with respect to crashes.

use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options as RocksDbOptions, WriteBatch};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

pub mod column_families;

use column_families::ColumnFamily;

/// Error type for store operations
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Database error
    Database(String),
    /// Item not found
    NotFound(String),
    /// An operation was attempted against a record in the wrong state
    InvalidState(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {msg}"),
            StoreError::NotFound(msg) => write!(f, "Not found: {msg}"),
            StoreError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
        }
    }
}

impl Error for StoreError {}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// A miner known to the pool. Balances are in atomic units and are mutated
/// only through the store's compound operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerRecord {
    pub address: String,
    pub worker: String,
    /// Epoch seconds of the last accepted share
    pub last_seen: u64,
    /// Cumulative accepted share weight over the miner's lifetime
    pub total_share_weight: u64,
    /// Unpaid reward balance in atomic units, never negative by construction
    pub pending_balance: u64,
    /// Total paid out in atomic units
    pub total_paid: u64,
    pub created_at: u64,
}

/// An accepted or rejected share submission. Immutable once recorded; the
/// (address, hash, nonce) key is the replay-detection boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub address: String,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u64,
    pub timestamp: u64,
    pub valid: bool,
}

impl ShareRecord {
    /// Uniqueness key for replay detection. The address segment is length
    /// prefixed and the nonce fixed width, so no two distinct
    /// (address, hash, nonce) triples can produce the same bytes.
    pub fn key(address: &str, hash: &str, nonce: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(2 + address.len() + hash.len() + 8);
        key.extend_from_slice(&(address.len() as u16).to_be_bytes());
        key.extend_from_slice(address.as_bytes());
        key.extend_from_slice(hash.as_bytes());
        key.extend_from_slice(&nonce.to_be_bytes());
        key
    }
}

/// Lifecycle of a found block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    Pending,
    Confirmed,
    Orphaned,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Pending => write!(f, "pending"),
            BlockStatus::Confirmed => write!(f, "confirmed"),
            BlockStatus::Orphaned => write!(f, "orphaned"),
        }
    }
}

/// A block found by the pool, keyed by hash.
///
/// `credits` records the per-miner amounts of this block's distribution so
/// an orphan clawback can reverse exactly what was credited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Height is unknown until the daemon confirms the block
    pub height: Option<u64>,
    pub hash: String,
    /// Block reward in atomic units
    pub reward: u64,
    pub finder: String,
    pub status: BlockStatus,
    pub credits: Vec<(String, u64)>,
    /// Pool fee taken from this block's distribution, including rounding dust
    pub fee: u64,
    pub clawed_back: bool,
    pub found_at: u64,
}

impl BlockRecord {
    pub fn new(hash: String, finder: String, reward: u64, found_at: u64) -> Self {
        Self {
            height: None,
            hash,
            reward,
            finder,
            status: BlockStatus::Pending,
            credits: Vec::new(),
            fee: 0,
            clawed_back: false,
            found_at,
        }
    }
}

/// State of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Sent,
    Failed,
}

/// A payment created from a reserved pending balance. The reservation that
/// creates a payment is the at-most-once boundary for funds movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Monotonically increasing id allocated by the store, seeded from the
    /// last persisted payment on open so restarts never reuse an id
    pub id: u64,
    pub address: String,
    pub amount: u64,
    pub tx_hash: Option<String>,
    pub status: PaymentStatus,
    pub created_at: u64,
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| StoreError::Database(format!("serialize: {e}")))?;
    Ok(bytes)
}

fn deserialize<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StoreError> {
    ciborium::de::from_reader(bytes).map_err(|e| StoreError::Database(format!("deserialize: {e}")))
}

/// The pool's persistent store.
pub struct Store {
    path: String,
    db: DB,
    // Serializes all compound mutations. Reads are direct.
    write_lock: Mutex<()>,
    /// Next payment id, seeded from the highest persisted id on open
    payment_seq: AtomicU64,
}

impl Store {
    pub fn new(path: String) -> Result<Self, StoreError> {
        let mut opts = RocksDbOptions::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamily::all()
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(cf.as_str(), RocksDbOptions::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, descriptors)?;

        // Payment keys are big-endian ids, so the last key is the highest
        let payment_cf = db
            .cf_handle(&ColumnFamily::Payment)
            .ok_or_else(|| StoreError::Database("missing payment column family".to_string()))?;
        let next_id = match db.iterator_cf(payment_cf, IteratorMode::End).next() {
            Some(entry) => {
                let (key, _value) = entry?;
                let mut id_bytes = [0u8; 8];
                id_bytes.copy_from_slice(key.get(..8).unwrap_or(&[0u8; 8]));
                u64::from_be_bytes(id_bytes) + 1
            }
            None => 1,
        };

        Ok(Self {
            path,
            db,
            write_lock: Mutex::new(()),
            payment_seq: AtomicU64::new(next_id),
        })
    }

    fn next_payment_id(&self) -> u64 {
        self.payment_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn cf(&self, cf: ColumnFamily) -> &rocksdb::ColumnFamily {
        self.db.cf_handle(&cf).unwrap()
    }

    // ------------------------------------------------------------------
    // Miners

    pub fn get_miner(&self, address: &str) -> Result<Option<MinerRecord>, StoreError> {
        match self.db.get_cf(self.cf(ColumnFamily::Miner), address.as_bytes())? {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn all_miners(&self) -> Result<Vec<MinerRecord>, StoreError> {
        let mut miners = Vec::new();
        for entry in self
            .db
            .iterator_cf(self.cf(ColumnFamily::Miner), IteratorMode::Start)
        {
            let (_key, value) = entry?;
            miners.push(deserialize(&value)?);
        }
        Ok(miners)
    }

    /// Miners whose pending balance is at least `minimum`, in atomic units
    pub fn miners_with_pending_at_least(
        &self,
        minimum: u64,
    ) -> Result<Vec<MinerRecord>, StoreError> {
        let miners = self.all_miners()?;
        Ok(miners
            .into_iter()
            .filter(|m| m.pending_balance >= minimum)
            .collect())
    }

    /// Count of miners seen since the given epoch-seconds cutoff
    pub fn active_miner_count(&self, since: u64) -> Result<usize, StoreError> {
        Ok(self
            .all_miners()?
            .iter()
            .filter(|m| m.last_seen >= since)
            .count())
    }

    // ------------------------------------------------------------------
    // Shares

    /// Record a share and update the submitting miner in one atomic step.
    ///
    /// Returns false without any side effect when the (address, hash, nonce)
    /// key already exists: replays are rejected, not re-credited.
    pub fn record_share(&self, share: &ShareRecord, worker: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let key = ShareRecord::key(&share.address, &share.hash, share.nonce);
        if self
            .db
            .get_cf(self.cf(ColumnFamily::Share), &key)?
            .is_some()
        {
            return Ok(false);
        }

        let mut miner = match self.get_miner(&share.address)? {
            Some(miner) => miner,
            None => MinerRecord {
                address: share.address.clone(),
                worker: worker.to_string(),
                last_seen: share.timestamp,
                total_share_weight: 0,
                pending_balance: 0,
                total_paid: 0,
                created_at: share.timestamp,
            },
        };
        miner.worker = worker.to_string();
        miner.last_seen = share.timestamp;
        if share.valid {
            miner.total_share_weight += share.difficulty;
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(ColumnFamily::Share), &key, serialize(share)?);
        batch.put_cf(
            self.cf(ColumnFamily::Miner),
            share.address.as_bytes(),
            serialize(&miner)?,
        );
        self.db.write(batch)?;
        Ok(true)
    }

    pub fn get_share(
        &self,
        address: &str,
        hash: &str,
        nonce: u64,
    ) -> Result<Option<ShareRecord>, StoreError> {
        let key = ShareRecord::key(address, hash, nonce);
        match self.db.get_cf(self.cf(ColumnFamily::Share), &key)? {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Blocks

    fn block_index_key(found_at: u64, hash: &str) -> Vec<u8> {
        let mut key = found_at.to_be_bytes().to_vec();
        key.extend_from_slice(hash.as_bytes());
        key
    }

    /// Insert a block in pending state. Returns false when a block with the
    /// same hash already exists, so concurrent detections of the same
    /// qualifying hash collapse to one record.
    pub fn insert_block(&self, block: &BlockRecord) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        if self
            .db
            .get_cf(self.cf(ColumnFamily::Block), block.hash.as_bytes())?
            .is_some()
        {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(ColumnFamily::Block),
            block.hash.as_bytes(),
            serialize(block)?,
        );
        batch.put_cf(
            self.cf(ColumnFamily::BlockIndex),
            Self::block_index_key(block.found_at, &block.hash),
            block.hash.as_bytes(),
        );
        self.db.write(batch)?;
        Ok(true)
    }

    pub fn get_block(&self, hash: &str) -> Result<Option<BlockRecord>, StoreError> {
        match self.db.get_cf(self.cf(ColumnFamily::Block), hash.as_bytes())? {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Compare-and-set a block's lifecycle state.
    ///
    /// Returns true only for the caller that actually performed the
    /// transition; every other concurrent caller observes a no-op.
    pub fn set_block_status(
        &self,
        hash: &str,
        from: BlockStatus,
        to: BlockStatus,
        height: Option<u64>,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut block = self
            .get_block(hash)?
            .ok_or_else(|| StoreError::NotFound(format!("block {hash}")))?;
        if block.status != from {
            return Ok(false);
        }
        block.status = to;
        if height.is_some() {
            block.height = height;
        }
        self.db.put_cf(
            self.cf(ColumnFamily::Block),
            hash.as_bytes(),
            serialize(&block)?,
        )?;
        debug!("Block {} transitioned {} -> {}", hash, from, to);
        Ok(true)
    }

    /// Confirm a pending block and apply its reward distribution in one
    /// atomic batch: the pending to confirmed transition, the credits and
    /// fee on the block, and each miner's balance credit all commit
    /// together or not at all. A block can therefore never be observed
    /// confirmed but undistributed.
    ///
    /// Returns true only for the caller that performed the transition;
    /// a block that is no longer pending is a no-op. On error nothing is
    /// written and the block stays pending, so the next sweep retries.
    pub fn confirm_block_distributed(
        &self,
        hash: &str,
        height: Option<u64>,
        credits: &[(String, u64)],
        fee: u64,
        reward: u64,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut block = self
            .get_block(hash)?
            .ok_or_else(|| StoreError::NotFound(format!("block {hash}")))?;
        if block.status != BlockStatus::Pending {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        for (address, amount) in credits {
            let mut miner = self
                .get_miner(address)?
                .ok_or_else(|| StoreError::NotFound(format!("miner {address}")))?;
            miner.pending_balance += amount;
            batch.put_cf(
                self.cf(ColumnFamily::Miner),
                address.as_bytes(),
                serialize(&miner)?,
            );
        }

        block.status = BlockStatus::Confirmed;
        if height.is_some() {
            block.height = height;
        }
        block.credits = credits.to_vec();
        block.fee = fee;
        block.reward = reward;
        batch.put_cf(
            self.cf(ColumnFamily::Block),
            hash.as_bytes(),
            serialize(&block)?,
        );
        self.db.write(batch)?;
        debug!(
            "Block {} confirmed with {} credits totalling fee {}",
            hash,
            credits.len(),
            fee
        );
        Ok(true)
    }

    /// Reverse the unpaid credits of an orphaned block, at most once.
    ///
    /// Amounts already drained from the pending balance by a payout are not
    /// recoverable; for each credit we debit what is still pending, capped at
    /// the credited amount. Returns the amounts actually reversed.
    pub fn claw_back_block(&self, hash: &str) -> Result<Vec<(String, u64)>, StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut block = self
            .get_block(hash)?
            .ok_or_else(|| StoreError::NotFound(format!("block {hash}")))?;
        if block.status != BlockStatus::Orphaned {
            return Err(StoreError::InvalidState(format!(
                "clawback for block {hash} in state {}",
                block.status
            )));
        }
        if block.clawed_back {
            return Ok(Vec::new());
        }

        let mut batch = WriteBatch::default();
        let mut reversed = Vec::new();
        for (address, amount) in &block.credits {
            let mut miner = match self.get_miner(address)? {
                Some(miner) => miner,
                None => continue,
            };
            let debit = std::cmp::min(miner.pending_balance, *amount);
            if debit > 0 {
                miner.pending_balance -= debit;
                batch.put_cf(
                    self.cf(ColumnFamily::Miner),
                    address.as_bytes(),
                    serialize(&miner)?,
                );
                reversed.push((address.clone(), debit));
            }
        }

        block.clawed_back = true;
        batch.put_cf(
            self.cf(ColumnFamily::Block),
            hash.as_bytes(),
            serialize(&block)?,
        );
        self.db.write(batch)?;
        Ok(reversed)
    }

    /// The most recently found blocks, newest first
    pub fn recent_blocks(&self, limit: usize) -> Result<Vec<BlockRecord>, StoreError> {
        let mut blocks = Vec::new();
        for entry in self
            .db
            .iterator_cf(self.cf(ColumnFamily::BlockIndex), IteratorMode::End)
        {
            if blocks.len() >= limit {
                break;
            }
            let (_key, hash) = entry?;
            let hash = String::from_utf8_lossy(&hash).to_string();
            if let Some(block) = self.get_block(&hash)? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    pub fn confirmed_block_count(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for entry in self
            .db
            .iterator_cf(self.cf(ColumnFamily::Block), IteratorMode::Start)
        {
            let (_key, value) = entry?;
            let block: BlockRecord = deserialize(&value)?;
            if block.status == BlockStatus::Confirmed {
                count += 1;
            }
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Payments

    /// Reserve a payout for a miner: debit the full pending balance and
    /// insert a pending Payment in one atomic batch.
    ///
    /// This reservation is the at-most-once boundary. Once it commits, no
    /// concurrent scheduler run or retry can spend the same funds: the
    /// balance is already zero and the Payment row carries the amount.
    /// Returns None when the balance is below `minimum`.
    pub fn reserve_payout(
        &self,
        address: &str,
        minimum: u64,
        now: u64,
    ) -> Result<Option<Payment>, StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut miner = self
            .get_miner(address)?
            .ok_or_else(|| StoreError::NotFound(format!("miner {address}")))?;
        if miner.pending_balance < minimum || miner.pending_balance == 0 {
            return Ok(None);
        }

        let payment = Payment {
            id: self.next_payment_id(),
            address: address.to_string(),
            amount: miner.pending_balance,
            tx_hash: None,
            status: PaymentStatus::Pending,
            created_at: now,
        };
        miner.pending_balance = 0;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(ColumnFamily::Miner),
            address.as_bytes(),
            serialize(&miner)?,
        );
        batch.put_cf(
            self.cf(ColumnFamily::Payment),
            payment.id.to_be_bytes(),
            serialize(&payment)?,
        );
        self.db.write(batch)?;
        Ok(Some(payment))
    }

    pub fn get_payment(&self, id: u64) -> Result<Option<Payment>, StoreError> {
        match self
            .db
            .get_cf(self.cf(ColumnFamily::Payment), id.to_be_bytes())?
        {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Mark a pending payment sent and move its amount into the miner's
    /// total paid. A payment that is not pending is left untouched, so a
    /// retry cannot produce a second sent outcome for the same reservation.
    pub fn settle_payment_sent(&self, id: u64, tx_hash: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut payment = self
            .get_payment(id)?
            .ok_or_else(|| StoreError::NotFound(format!("payment {id}")))?;
        if payment.status != PaymentStatus::Pending {
            return Err(StoreError::InvalidState(format!(
                "payment {id} already settled"
            )));
        }
        payment.status = PaymentStatus::Sent;
        payment.tx_hash = Some(tx_hash.to_string());

        let mut miner = self
            .get_miner(&payment.address)?
            .ok_or_else(|| StoreError::NotFound(format!("miner {}", payment.address)))?;
        miner.total_paid += payment.amount;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(ColumnFamily::Payment),
            id.to_be_bytes(),
            serialize(&payment)?,
        );
        batch.put_cf(
            self.cf(ColumnFamily::Miner),
            payment.address.as_bytes(),
            serialize(&miner)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    /// Mark a pending payment failed and restore the reserved amount to the
    /// miner's pending balance. This is a compensating action, not a retry:
    /// the funds become eligible for a future scheduler run.
    pub fn settle_payment_failed(&self, id: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut payment = self
            .get_payment(id)?
            .ok_or_else(|| StoreError::NotFound(format!("payment {id}")))?;
        if payment.status != PaymentStatus::Pending {
            return Err(StoreError::InvalidState(format!(
                "payment {id} already settled"
            )));
        }
        payment.status = PaymentStatus::Failed;

        let mut miner = self
            .get_miner(&payment.address)?
            .ok_or_else(|| StoreError::NotFound(format!("miner {}", payment.address)))?;
        miner.pending_balance += payment.amount;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(ColumnFamily::Payment),
            id.to_be_bytes(),
            serialize(&payment)?,
        );
        batch.put_cf(
            self.cf(ColumnFamily::Miner),
            payment.address.as_bytes(),
            serialize(&miner)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    /// Most recent payments for an address, newest first
    pub fn payments_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Payment>, StoreError> {
        let mut payments = Vec::new();
        for entry in self
            .db
            .iterator_cf(self.cf(ColumnFamily::Payment), IteratorMode::End)
        {
            if payments.len() >= limit {
                break;
            }
            let (_key, value) = entry?;
            let payment: Payment = deserialize(&value)?;
            if payment.address == address {
                payments.push(payment);
            }
        }
        Ok(payments)
    }

    /// Payments stuck in pending state since before the cutoff. These signal
    /// a crash between reservation and settlement and need operator review.
    pub fn stale_pending_payments(&self, cutoff: u64) -> Result<Vec<Payment>, StoreError> {
        let mut payments = Vec::new();
        for entry in self
            .db
            .iterator_cf(self.cf(ColumnFamily::Payment), IteratorMode::Start)
        {
            let (_key, value) = entry?;
            let payment: Payment = deserialize(&value)?;
            if payment.status == PaymentStatus::Pending && payment.created_at < cutoff {
                payments.push(payment);
            }
        }
        Ok(payments)
    }
}
