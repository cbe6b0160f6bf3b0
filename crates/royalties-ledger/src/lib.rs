//! # royalties-ledger
//!
//! Royalty accounting between a single creator and the holders of a
//! collection of claim slots.
//!
//! Everything the ledger holds on the payment asset counts as collected. A
//! fixed quarter of the lifetime total belongs to the creator, the remaining
//! three quarters are split evenly across the current collection size. Claims
//! pay out the difference between lifetime entitlement and what was already
//! paid, so repeated claims never double-pay.
//!
//! ## Modules
//!
//! - [`split`] — Fixed creator/community split arithmetic
//! - [`state`] — Durable counters and derived balances
//! - [`collaborators`] — Payment asset, slot registry and transfer hook seams
//! - [`engine`] — Claims, batch claims and administrative mutators
//! - [`config`] — Construction parameters loaded from TOML

use std::fmt;

use royalties_types::{Address, SlotId};

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod split;
pub mod state;

pub use collaborators::{AssetError, PaymentAsset, SlotRegistry, TransferHook};
pub use config::LedgerConfig;
pub use engine::RoyaltyLedger;
pub use state::LedgerState;

/// Role a caller must hold for a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The administrative owner of the ledger.
    Owner,
    /// The current creator beneficiary.
    Creator,
    /// The registry owner of a specific slot.
    SlotOwner(SlotId),
    /// The slot registry the ledger is wired to.
    Registry,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Creator => f.write_str("creator"),
            Role::SlotOwner(slot) => write!(f, "owner of slot {slot}"),
            Role::Registry => f.write_str("slot registry"),
        }
    }
}

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoyaltyError {
    /// The caller does not hold the role the operation requires.
    #[error("{caller} is not the {role}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The role that was required.
        role: Role,
    },

    /// A collection size of zero, or larger than the current one.
    #[error("invalid collection size {requested}: must be between 1 and {max}")]
    InvalidSize {
        /// The size that was asked for.
        requested: u64,
        /// The largest size allowed at that point.
        max: u64,
    },

    /// The payment asset refused the payout. No counters were changed.
    #[error("payout transfer failed: {0}")]
    TransferFailed(#[source] AssetError),

    /// A multiplication, addition or division left the representable range.
    #[error("arithmetic overflow in royalty calculation")]
    ArithmeticOverflow,

    /// A restored state snapshot violates its own invariants.
    #[error("inconsistent ledger state: {0}")]
    InconsistentState(String),

    /// Construction parameters could not be loaded or are invalid.
    #[error("invalid ledger configuration: {0}")]
    Config(String),
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, RoyaltyError>;
