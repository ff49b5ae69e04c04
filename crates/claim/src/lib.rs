pub mod call;
pub mod clock;
pub mod error;
pub mod event;
pub mod manager;
pub mod policy;
pub mod state;

// Re-export public types
pub use alloy_primitives::Address;
pub use call::Call;
pub use clock::{Clock, SystemClock, VirtualClock};
pub use error::ClaimError;
pub use event::ClaimEvent;
pub use manager::{ClaimManager, StateSnapshot};
pub use policy::{ClaimPolicy, DEFAULT_PING_INTERVAL};
pub use state::{AuthorityState, Claimability, Claimable};

/// Unix time in seconds
pub type Timestamp = u64;
