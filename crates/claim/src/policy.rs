use serde::{Deserialize, Serialize};

/// Default renewal window for `ping`: 30 days
pub const DEFAULT_PING_INTERVAL: u64 = 30 * 24 * 60 * 60;

/// Deployment-time knobs of the claim state machine
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimPolicy {
    /// Seconds a `ping` pushes the expiration past the current time
    pub ping_interval: u64,

    /// Clear the claimer set and start a fresh window after a successful claim
    pub reset_on_claim: bool,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            reset_on_claim: false,
        }
    }
}

impl ClaimPolicy {
    pub fn new(ping_interval: u64) -> Self {
        Self {
            ping_interval,
            ..Default::default()
        }
    }

    pub fn with_reset_on_claim(mut self, reset_on_claim: bool) -> Self {
        self.reset_on_claim = reset_on_claim;
        self
    }
}
