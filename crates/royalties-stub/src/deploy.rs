//! Deploy-time wiring.
//!
//! Mirrors a production deployment: construct the ledger from its
//! configuration, then have the registry admin designate it as the registry's
//! royalties hook so every slot transfer settles the previous owner first.
//!
//! The returned [`SharedLedger`] is the only strong handle to the ledger. The
//! registry refers to it weakly, so the caller must keep it alive for as long
//! as slot transfers should settle royalties.

use std::cell::RefCell;
use std::rc::Rc;

use royalties_ledger::{LedgerConfig, RoyaltyLedger};
use royalties_types::Address;

use crate::asset::SharedAsset;
use crate::registry::SharedRegistry;
use crate::Result;

/// A ledger wired to the in-memory collaborators.
pub type StubLedger = RoyaltyLedger<SharedAsset, SharedRegistry>;

/// Shared handle to a deployed [`StubLedger`].
pub type SharedLedger = Rc<RefCell<StubLedger>>;

/// Build a ledger and register it as `registry`'s transfer hook.
///
/// # Errors
///
/// - [`StubError::Ledger`](crate::StubError::Ledger) if the configuration is invalid
/// - [`StubError::NotAdmin`](crate::StubError::NotAdmin) if `registry_admin`
///   is not the registry's admin
pub fn deploy(
    config: &LedgerConfig,
    asset: &SharedAsset,
    registry: &SharedRegistry,
    registry_admin: &Address,
) -> Result<SharedLedger> {
    let ledger = RoyaltyLedger::new(config, asset.clone(), registry.clone())?;
    let ledger = Rc::new(RefCell::new(ledger));
    registry.set_royalties_hook(registry_admin, &ledger)?;
    tracing::info!(ledger = %config.ledger_address, "royalty ledger deployed");
    Ok(ledger)
}
