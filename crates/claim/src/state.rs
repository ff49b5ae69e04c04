use crate::call::Call;
use crate::error::ClaimError;
use crate::event::ClaimEvent;
use crate::policy::ClaimPolicy;
use crate::Timestamp;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Snapshot of the authority held by a [`Claimable`]
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AuthorityState {
    pub owner: Address,
    /// Empty set = claim is open to any caller
    pub claimers: BTreeSet<Address>,
    pub expiration_time: Timestamp,
}

/// Result of [`Claimable::is_claimable`]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claimability {
    pub open_to_all: bool,
    pub time_expired: bool,
}

impl Claimability {
    /// Whether a caller with the given listing status may claim right now
    pub fn allows(&self, is_listed: bool) -> bool {
        self.time_expired && (self.open_to_all || is_listed)
    }
}

/// Dead-man's-switch ownership state machine.
///
/// The owner keeps authority as long as it renews the expiration time. Once
/// `now >= expiration_time`, any listed claimer (or anyone, if the list is empty)
/// may take ownership with [`Claimable::claim`].
///
/// Every mutation checks authorization before touching state, so a rejected
/// call leaves the machine untouched and emits no events.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Claimable {
    state: AuthorityState,
    policy: ClaimPolicy,
}

impl Claimable {
    /// Deploy a new machine owned by `owner`
    pub fn deploy(
        owner: Address,
        claimers: impl IntoIterator<Item = Address>,
        expiration_time: Timestamp,
        policy: ClaimPolicy,
    ) -> Result<Self, ClaimError> {
        if owner == Address::ZERO {
            return Err(ClaimError::ZeroAddress);
        }

        let claimers = claimers.into_iter().collect::<BTreeSet<_>>();
        if claimers.contains(&Address::ZERO) {
            return Err(ClaimError::ZeroAddress);
        }

        Ok(Self {
            state: AuthorityState {
                owner,
                claimers,
                expiration_time,
            },
            policy,
        })
    }

    fn only_owner(&self, caller: Address) -> Result<(), ClaimError> {
        if caller != self.state.owner {
            return Err(ClaimError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_expiration_time(
        &mut self,
        caller: Address,
        expiration_time: Timestamp,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.only_owner(caller)?;

        self.state.expiration_time = expiration_time;
        Ok(vec![ClaimEvent::ExpirationUpdated { expiration_time }])
    }

    /// Renew the window: expiration becomes `now + ping_interval`
    pub fn ping(&mut self, caller: Address, now: Timestamp) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.only_owner(caller)?;

        let expiration_time = now.saturating_add(self.policy.ping_interval);
        self.state.expiration_time = expiration_time;
        Ok(vec![ClaimEvent::ExpirationUpdated { expiration_time }])
    }

    /// Adding an address that is already listed is a no-op and emits nothing
    pub fn add_claimer(
        &mut self,
        caller: Address,
        claimer: Address,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.only_owner(caller)?;
        if claimer == Address::ZERO {
            return Err(ClaimError::ZeroAddress);
        }

        if !self.state.claimers.insert(claimer) {
            return Ok(Vec::new());
        }
        Ok(vec![ClaimEvent::ClaimerAdded { claimer }])
    }

    /// Removing an address that is not listed is a no-op and emits nothing
    pub fn remove_claimer(
        &mut self,
        caller: Address,
        claimer: Address,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.only_owner(caller)?;

        if !self.state.claimers.remove(&claimer) {
            return Ok(Vec::new());
        }
        Ok(vec![ClaimEvent::ClaimerRemoved { claimer }])
    }

    /// Replace the whole claimer set.
    ///
    /// Emits `ClaimerRemoved` for dropped members in ascending order, then
    /// `ClaimerAdded` for new members in input order. Duplicates in `claimers`
    /// collapse to their first occurrence.
    pub fn set_claimers(
        &mut self,
        caller: Address,
        claimers: &[Address],
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        self.only_owner(caller)?;
        if claimers.contains(&Address::ZERO) {
            return Err(ClaimError::ZeroAddress);
        }

        let mut next = BTreeSet::new();
        let mut added = Vec::new();
        for &claimer in claimers {
            if next.insert(claimer) && !self.state.claimers.contains(&claimer) {
                added.push(claimer);
            }
        }

        let mut events = self
            .state
            .claimers
            .difference(&next)
            .map(|&claimer| ClaimEvent::ClaimerRemoved { claimer })
            .collect::<Vec<_>>();
        events.extend(
            added
                .into_iter()
                .map(|claimer| ClaimEvent::ClaimerAdded { claimer }),
        );

        self.state.claimers = next;
        Ok(events)
    }

    /// Take over ownership once the window has expired
    pub fn claim(&mut self, caller: Address, now: Timestamp) -> Result<Vec<ClaimEvent>, ClaimError> {
        let claimability = self.is_claimable(now);
        if !claimability.time_expired {
            return Err(ClaimError::NotYetClaimable {
                now,
                expiration_time: self.state.expiration_time,
            });
        }
        if !claimability.allows(self.is_claimer(caller)) {
            return Err(ClaimError::NotAuthorizedClaimer);
        }
        if caller == Address::ZERO {
            return Err(ClaimError::ZeroAddress);
        }

        let previous_owner = std::mem::replace(&mut self.state.owner, caller);
        let mut events = vec![ClaimEvent::OwnershipTransferred {
            previous_owner,
            new_owner: caller,
        }];

        if self.policy.reset_on_claim {
            events.extend(
                std::mem::take(&mut self.state.claimers)
                    .into_iter()
                    .map(|claimer| ClaimEvent::ClaimerRemoved { claimer }),
            );
            let expiration_time = now.saturating_add(self.policy.ping_interval);
            self.state.expiration_time = expiration_time;
            events.push(ClaimEvent::ExpirationUpdated { expiration_time });
        }

        Ok(events)
    }

    /// Dispatch an encoded call
    pub fn execute(
        &mut self,
        caller: Address,
        now: Timestamp,
        call: &Call,
    ) -> Result<Vec<ClaimEvent>, ClaimError> {
        match call {
            Call::SetExpirationTime { expiration_time } => {
                self.set_expiration_time(caller, *expiration_time)
            }
            Call::Ping => self.ping(caller, now),
            Call::AddClaimer { claimer } => self.add_claimer(caller, *claimer),
            Call::RemoveClaimer { claimer } => self.remove_claimer(caller, *claimer),
            Call::SetClaimers { claimers } => self.set_claimers(caller, claimers),
            Call::Claim => self.claim(caller, now),
        }
    }

    pub fn is_claimer(&self, address: Address) -> bool {
        self.state.claimers.contains(&address)
    }

    pub fn is_claimable(&self, now: Timestamp) -> Claimability {
        Claimability {
            open_to_all: self.state.claimers.is_empty(),
            time_expired: now >= self.state.expiration_time,
        }
    }

    pub fn owner(&self) -> Address {
        self.state.owner
    }

    pub fn expiration_time(&self) -> Timestamp {
        self.state.expiration_time
    }

    pub fn claimers(&self) -> &BTreeSet<Address> {
        &self.state.claimers
    }

    pub fn policy(&self) -> &ClaimPolicy {
        &self.policy
    }

    pub fn read(&self) -> AuthorityState {
        self.state.clone()
    }
}
