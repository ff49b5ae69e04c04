use crate::Timestamp;
use thiserror::Error;

/// Rejections raised by the claim state machine
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ClaimError {
    #[error("Caller is not the owner")]
    Unauthorized,

    #[error("Caller is not an authorized claimer")]
    NotAuthorizedClaimer,

    #[error("Not yet claimable: now {now} is before expiration {expiration_time}")]
    NotYetClaimable {
        now: Timestamp,
        expiration_time: Timestamp,
    },

    #[error("Zero address is not allowed")]
    ZeroAddress,
}

impl ClaimError {
    /// Stable error code, used by hosts and scenario files to match rejections
    pub fn code(&self) -> &'static str {
        match self {
            ClaimError::Unauthorized => "Unauthorized",
            ClaimError::NotAuthorizedClaimer => "NotAuthorizedClaimer",
            ClaimError::NotYetClaimable { .. } => "NotYetClaimable",
            ClaimError::ZeroAddress => "ZeroAddress",
        }
    }
}
