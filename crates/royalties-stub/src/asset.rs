//! In-memory fungible payment asset.
//!
//! A plain balance map with `mint` for funding test accounts. Transfers of
//! more than the sender holds fail with [`AssetError::InsufficientFunds`] and
//! change nothing. A single transfer failure can be scheduled with
//! [`MemoryAsset::fail_next_transfer`] to exercise payout error paths.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use royalties_ledger::{AssetError, PaymentAsset};
use royalties_types::{Address, Amount};

use crate::{Result, StubError};

/// Balance ledger for a single fungible asset.
#[derive(Debug, Clone, Default)]
pub struct MemoryAsset {
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
    fail_next: Option<String>,
}

impl MemoryAsset {
    /// Create an asset with no balances and zero supply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` out of thin air for `to`.
    ///
    /// # Errors
    ///
    /// - [`StubError::Overflow`] if the total supply would overflow
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<()> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(StubError::Overflow)?;
        // bounded by supply
        let balance = self.balance(to) + amount;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        tracing::trace!(to = %to, amount, "asset minted");
        Ok(())
    }

    /// Balance held by `owner`. Zero for unknown accounts.
    pub fn balance(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Sum of everything ever minted.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Make the next non-empty transfer fail with [`AssetError::Rejected`].
    pub fn fail_next_transfer(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }
}

impl PaymentAsset for MemoryAsset {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.balance(owner)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> std::result::Result<(), AssetError> {
        if let Some(reason) = self.fail_next.take() {
            tracing::warn!(from = %from, to = %to, amount, reason = %reason, "asset transfer rejected");
            return Err(AssetError::Rejected(reason));
        }
        let available = self.balance(from);
        if available < amount {
            return Err(AssetError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        self.balances.insert(*from, available - amount);
        // bounded by supply
        let credited = self.balance(to) + amount;
        self.balances.insert(*to, credited);
        tracing::trace!(from = %from, to = %to, amount, "asset transferred");
        Ok(())
    }
}

/// Shared handle to a [`MemoryAsset`].
///
/// Every clone sees the same balances, so one handle can be given to the
/// ledger while tests keep another to make deposits and inspect balances.
#[derive(Debug, Clone, Default)]
pub struct SharedAsset(Rc<RefCell<MemoryAsset>>);

impl SharedAsset {
    /// Create a handle to a fresh, empty asset.
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`MemoryAsset::mint`].
    pub fn mint(&self, to: &Address, amount: Amount) -> Result<()> {
        self.inner_mut()?.mint(to, amount)
    }

    /// See [`MemoryAsset::balance`].
    pub fn balance(&self, owner: &Address) -> Amount {
        self.0.borrow().balance(owner)
    }

    /// See [`MemoryAsset::total_supply`].
    pub fn total_supply(&self) -> Amount {
        self.0.borrow().total_supply()
    }

    /// Push `amount` from `from` to `to`. This is how deposits reach a ledger.
    ///
    /// # Errors
    ///
    /// - [`StubError::Ledger`] wrapping [`RoyaltyError::TransferFailed`](royalties_ledger::RoyaltyError::TransferFailed)
    ///   if the asset refuses the transfer
    pub fn send(&self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.inner_mut()?
            .transfer(from, to, amount)
            .map_err(|e| StubError::Ledger(royalties_ledger::RoyaltyError::TransferFailed(e)))
    }

    /// See [`MemoryAsset::fail_next_transfer`].
    pub fn fail_next_transfer(&self, reason: impl Into<String>) -> Result<()> {
        self.inner_mut()?.fail_next_transfer(reason);
        Ok(())
    }

    fn inner_mut(&self) -> Result<std::cell::RefMut<'_, MemoryAsset>> {
        self.0
            .try_borrow_mut()
            .map_err(|_| StubError::Reentrant("payment asset"))
    }
}

impl PaymentAsset for SharedAsset {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.balance(owner)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> std::result::Result<(), AssetError> {
        self.0
            .try_borrow_mut()
            .map_err(|_| AssetError::Rejected("payment asset is busy".to_string()))?
            .transfer(from, to, amount)
    }
}
