//! # royalties-types
//!
//! Shared domain types used across the royalties workspace.
//!
//! ## Modules
//!
//! - [`address`] — Account identities (`0x`-prefixed, 20 bytes)
//! - [`slot`] — Claim slot identifiers

pub mod address;
pub mod slot;

pub use address::{Address, AddressParseError};
pub use slot::SlotId;

/// Amount of the payment asset in its smallest unit.
pub type Amount = u128;

/// Numerator of the creator's fixed share of everything collected.
pub const CREATOR_SHARE_NUMERATOR: Amount = 1;

/// Numerator of the community pool's fixed share of everything collected.
pub const COMMUNITY_SHARE_NUMERATOR: Amount = 3;

/// Common denominator for both shares (creator 1/4, community 3/4).
pub const SHARE_DENOMINATOR: Amount = 4;

/// Collection size used when a deployment does not specify one.
pub const DEFAULT_COLLECTION_SIZE: u64 = 10_000;
