use crate::Timestamp;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Notification emitted by a committed mutation
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClaimEvent {
    ExpirationUpdated {
        expiration_time: Timestamp,
    },
    ClaimerAdded {
        claimer: Address,
    },
    ClaimerRemoved {
        claimer: Address,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl ClaimEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClaimEvent::ExpirationUpdated { .. } => "ExpirationUpdated",
            ClaimEvent::ClaimerAdded { .. } => "ClaimerAdded",
            ClaimEvent::ClaimerRemoved { .. } => "ClaimerRemoved",
            ClaimEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}
