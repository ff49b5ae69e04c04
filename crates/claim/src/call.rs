use crate::Timestamp;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// An encoded mutating operation, as submitted by a caller
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    SetExpirationTime { expiration_time: Timestamp },
    Ping,
    AddClaimer { claimer: Address },
    RemoveClaimer { claimer: Address },
    SetClaimers { claimers: Vec<Address> },
    Claim,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::SetExpirationTime { .. } => "set_expiration_time",
            Call::Ping => "ping",
            Call::AddClaimer { .. } => "add_claimer",
            Call::RemoveClaimer { .. } => "remove_claimer",
            Call::SetClaimers { .. } => "set_claimers",
            Call::Claim => "claim",
        }
    }
}
