//! In-process chain simulator for driving a claimable machine through time.
//!
//! Time only moves when [`DevChain::increase`] is called, and the whole chain
//! (machine state, event log and clock) can be saved with
//! [`DevChain::snapshot`] and rolled back with [`DevChain::revert`].

use claimable_claim::{
    Address, Call, ClaimError, ClaimEvent, ClaimManager, ClaimPolicy, StateSnapshot, Timestamp,
    VirtualClock,
};
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Default start time of a fresh chain (2023-11-14T22:13:20Z)
pub const GENESIS_TIME: Timestamp = 1_700_000_000;

/// Number of funded test accounts
pub const ACCOUNT_COUNT: usize = 5;

pub mod duration {
    pub const fn seconds(value: u64) -> u64 {
        value
    }

    pub const fn minutes(value: u64) -> u64 {
        value.saturating_mul(seconds(60))
    }

    pub const fn hours(value: u64) -> u64 {
        value.saturating_mul(minutes(60))
    }

    pub const fn days(value: u64) -> u64 {
        value.saturating_mul(hours(24))
    }
}

/// Deterministic test accounts; the first one deploys by convention
pub fn accounts() -> [Address; ACCOUNT_COUNT] {
    std::array::from_fn(|index| Address::repeat_byte(0xa0 + index as u8))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SnapshotId(u64);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DevChainError {
    #[error("Unknown snapshot {0}")]
    UnknownSnapshot(SnapshotId),
}

#[derive(Debug)]
struct ChainSnapshot {
    id: SnapshotId,
    state: StateSnapshot,
    timestamp: Timestamp,
}

/// A single claimable machine on a virtual clock
#[derive(Debug)]
pub struct DevChain {
    manager: ClaimManager,
    clock: VirtualClock,
    snapshots: Vec<ChainSnapshot>,
    next_snapshot: u64,
}

impl DevChain {
    /// Deploy at [`GENESIS_TIME`]
    pub fn deploy(
        owner: Address,
        claimers: impl IntoIterator<Item = Address>,
        expiration_time: Timestamp,
        policy: ClaimPolicy,
    ) -> Result<Self, ClaimError> {
        Self::deploy_at(GENESIS_TIME, owner, claimers, expiration_time, policy)
    }

    pub fn deploy_at(
        genesis: Timestamp,
        owner: Address,
        claimers: impl IntoIterator<Item = Address>,
        expiration_time: Timestamp,
        policy: ClaimPolicy,
    ) -> Result<Self, ClaimError> {
        let clock = VirtualClock::new(genesis);
        let manager = ClaimManager::deploy(
            owner,
            claimers,
            expiration_time,
            policy,
            Arc::new(clock.clone()),
        )?;

        Ok(Self {
            manager,
            clock,
            snapshots: Vec::new(),
            next_snapshot: 1,
        })
    }

    pub fn manager(&self) -> &ClaimManager {
        &self.manager
    }

    /// Time of the latest block
    pub fn timestamp(&self) -> Timestamp {
        self.manager.now()
    }

    /// Advance time by `seconds` and return the new timestamp
    pub fn increase(&self, seconds: u64) -> Timestamp {
        let now = self.clock.advance(seconds);
        info!(seconds, now, "Increased chain time");
        now
    }

    /// Submit a call at the current time
    pub fn send(&self, caller: Address, call: &Call) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.manager.call(caller, call)
    }

    pub fn snapshot(&mut self) -> SnapshotId {
        let id = SnapshotId(self.next_snapshot);
        self.next_snapshot += 1;

        let timestamp = self.timestamp();
        debug!(%id, timestamp, "Taking snapshot");
        self.snapshots.push(ChainSnapshot {
            id,
            state: self.manager.snapshot(),
            timestamp,
        });
        id
    }

    /// Restore state and time to `id`.
    ///
    /// The snapshot is consumed, along with any snapshot taken after it.
    pub fn revert(&mut self, id: SnapshotId) -> Result<(), DevChainError> {
        let position = self
            .snapshots
            .iter()
            .position(|snapshot| snapshot.id == id)
            .ok_or(DevChainError::UnknownSnapshot(id))?;

        let mut discarded = self.snapshots.drain(position..);
        let Some(snapshot) = discarded.next() else {
            return Err(DevChainError::UnknownSnapshot(id));
        };
        let later = discarded.count();

        debug!(%id, timestamp = snapshot.timestamp, later, "Reverting to snapshot");
        self.manager.restore(snapshot.state);
        self.clock.set(snapshot.timestamp);
        Ok(())
    }
}

/// Assert that a call was rejected and return the error
#[track_caller]
pub fn expect_rejected<T: Debug>(result: Result<T, ClaimError>) -> ClaimError {
    match result {
        Ok(value) => panic!("Expected call to be rejected, but it succeeded with {value:?}"),
        Err(error) => error,
    }
}

/// Assert that a call was rejected with the given error code
#[track_caller]
pub fn expect_rejected_with<T: Debug>(result: Result<T, ClaimError>, code: &str) -> ClaimError {
    let error = expect_rejected(result);
    assert_eq!(
        error.code(),
        code,
        "Call rejected with unexpected error: {error}"
    );
    error
}
