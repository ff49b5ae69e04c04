use crate::call::Call;
use crate::clock::Clock;
use crate::error::ClaimError;
use crate::event::ClaimEvent;
use crate::policy::ClaimPolicy;
use crate::state::{AuthorityState, Claimability, Claimable};
use crate::Timestamp;
use alloy_primitives::Address;
use async_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Saved machine state, restorable with [`ClaimManager::restore`]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StateSnapshot {
    claimable: Claimable,
    event_count: usize,
}

#[derive(Debug)]
struct ClaimManagerInner {
    claimable: Claimable,
    events: Vec<ClaimEvent>,
    subscribers: Vec<Sender<ClaimEvent>>,
}

impl ClaimManagerInner {
    fn new(claimable: Claimable) -> Self {
        Self {
            claimable,
            events: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    fn call(
        &mut self,
        caller: Address,
        now: Timestamp,
        call: &Call,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        let op = call.name();
        match self.claimable.execute(caller, now, call) {
            Ok(events) => {
                info!(%caller, op, now, events = events.len(), "Call committed");
                self.publish(&events);
                Ok(events)
            }
            Err(error) => {
                warn!(%caller, op, now, code = error.code(), %error, "Call rejected");
                Err(error)
            }
        }
    }

    /// Append to the event log and fan out, dropping closed subscribers
    fn publish(&mut self, events: &[ClaimEvent]) {
        for event in events {
            debug!(event = event.name(), ?event, "Emitting event");
        }
        self.events.extend_from_slice(events);

        let before_count = self.subscribers.len();
        self.subscribers
            .retain(|tx| events.iter().all(|event| tx.try_send(*event).is_ok()));

        let removed = before_count - self.subscribers.len();
        if removed > 0 {
            debug!(
                removed,
                remaining = self.subscribers.len(),
                "Dropped closed event subscribers"
            );
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            claimable: self.claimable.clone(),
            event_count: self.events.len(),
        }
    }

    fn restore(&mut self, snapshot: StateSnapshot) {
        debug!(
            event_count = snapshot.event_count,
            discarded = self.events.len().saturating_sub(snapshot.event_count),
            "Restoring claim state"
        );
        self.claimable = snapshot.claimable;
        self.events.truncate(snapshot.event_count);
    }
}

/// Shared handle to a claim state machine.
///
/// Each call takes the write lock for its whole duration and reads the time
/// from the manager's clock once, so authorization and mutation see a single
/// consistent state.
#[derive(Clone, Debug)]
pub struct ClaimManager {
    inner: Arc<RwLock<ClaimManagerInner>>,
    clock: Arc<dyn Clock>,
}

impl ClaimManager {
    pub fn new(claimable: Claimable, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClaimManagerInner::new(claimable))),
            clock,
        }
    }

    /// Deploy a new machine owned by `owner` and wrap it
    pub fn deploy(
        owner: Address,
        claimers: impl IntoIterator<Item = Address>,
        expiration_time: Timestamp,
        policy: ClaimPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ClaimError> {
        let claimable = Claimable::deploy(owner, claimers, expiration_time, policy)?;
        info!(
            %owner,
            expiration_time,
            claimers = claimable.claimers().len(),
            ping_interval = policy.ping_interval,
            reset_on_claim = policy.reset_on_claim,
            "Claimable deployed"
        );
        Ok(Self::new(claimable, clock))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Execute an encoded call at the clock's current time
    pub fn call(&self, caller: Address, call: &Call) -> Result<Vec<ClaimEvent>, ClaimError> {
        let mut inner = self.inner.write();
        let now = self.clock.now();
        inner.call(caller, now, call)
    }

    pub fn set_expiration_time(
        &self,
        caller: Address,
        expiration_time: Timestamp,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.call(caller, &Call::SetExpirationTime { expiration_time })
    }

    pub fn ping(&self, caller: Address) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.call(caller, &Call::Ping)
    }

    pub fn add_claimer(
        &self,
        caller: Address,
        claimer: Address,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.call(caller, &Call::AddClaimer { claimer })
    }

    pub fn remove_claimer(
        &self,
        caller: Address,
        claimer: Address,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.call(caller, &Call::RemoveClaimer { claimer })
    }

    pub fn set_claimers(
        &self,
        caller: Address,
        claimers: Vec<Address>,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.call(caller, &Call::SetClaimers { claimers })
    }

    pub fn claim(&self, caller: Address) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.call(caller, &Call::Claim)
    }

    pub fn is_claimer(&self, address: Address) -> bool {
        self.inner.read().claimable.is_claimer(address)
    }

    pub fn is_claimable(&self) -> Claimability {
        let inner = self.inner.read();
        inner.claimable.is_claimable(self.clock.now())
    }

    pub fn owner(&self) -> Address {
        self.inner.read().claimable.owner()
    }

    pub fn expiration_time(&self) -> Timestamp {
        self.inner.read().claimable.expiration_time()
    }

    pub fn policy(&self) -> ClaimPolicy {
        *self.inner.read().claimable.policy()
    }

    pub fn read(&self) -> AuthorityState {
        self.inner.read().claimable.read()
    }

    /// All events emitted so far, oldest first
    pub fn events(&self) -> Vec<ClaimEvent> {
        self.inner.read().events.clone()
    }

    /// Receive every event committed after this call
    pub fn subscribe(&self) -> Receiver<ClaimEvent> {
        let (tx, rx) = async_channel::unbounded();
        self.inner.write().subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.read().snapshot()
    }

    /// Roll the machine and its event log back to `snapshot`
    pub fn restore(&self, snapshot: StateSnapshot) {
        self.inner.write().restore(snapshot);
    }
}
