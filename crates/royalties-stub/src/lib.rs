//! # royalties-stub
//!
//! In-memory collaborators for the royalty ledger.
//!
//! The ledger only talks to its payment asset and slot registry through the
//! traits in [`royalties_ledger::collaborators`]. This crate provides simple
//! single-process implementations of both, plus the deploy step that wires a
//! ledger into a registry, so the whole system can run inside one process for
//! development and integration testing.
//!
//! Handles are `Rc<RefCell<_>>` and cheap to clone. Everything runs on one
//! thread, one operation at a time.
//!
//! ## Modules
//!
//! - [`asset`] — Fungible balance ledger
//! - [`registry`] — Slot ownership registry that calls the transfer hook
//! - [`deploy`] — Build a ledger from config and register it as the hook

use royalties_ledger::RoyaltyError;
use royalties_types::{Address, SlotId};

pub mod asset;
pub mod deploy;
pub mod registry;

pub use asset::{MemoryAsset, SharedAsset};
pub use deploy::{deploy, SharedLedger, StubLedger};
pub use registry::{MemoryRegistry, SharedRegistry};

/// Error types for the in-memory collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StubError {
    /// The slot has never been minted.
    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),

    /// The caller does not own the slot it tried to move.
    #[error("{caller} does not own slot {slot}")]
    NotOwner {
        /// The slot being moved.
        slot: SlotId,
        /// The rejected caller.
        caller: Address,
    },

    /// Only the registry admin may perform this call.
    #[error("{0} is not the registry admin")]
    NotAdmin(Address),

    /// A handle was borrowed while a call on it was still in progress.
    #[error("re-entrant call into {0}")]
    Reentrant(&'static str),

    /// The designated transfer hook has been dropped.
    #[error("royalties hook no longer exists")]
    HookDropped,

    /// Supply or balance arithmetic overflowed.
    #[error("arithmetic overflow in stub collaborator")]
    Overflow,

    /// The royalty ledger rejected the operation.
    #[error("royalty ledger: {0}")]
    Ledger(#[from] RoyaltyError),
}

/// Convenience result type for stub operations.
pub type Result<T> = std::result::Result<T, StubError>;
