//! Seams to the external collaborators.
//!
//! The ledger never owns the payment asset or the slot registry. It reads
//! balances and ownership through these traits and issues transfers through
//! [`PaymentAsset::transfer`]. The registry, in turn, holds the ledger as a
//! [`TransferHook`] and calls it synchronously before any slot changes hands.

use royalties_types::{Address, Amount, SlotId};

/// Error types reported by a payment asset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// The sender does not hold enough of the asset.
    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Balance of the sender.
        available: Amount,
        /// Amount the transfer asked for.
        required: Amount,
    },

    /// The asset refused the transfer for another reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// A fungible payment asset (ERC20-style balance ledger).
pub trait PaymentAsset {
    /// Current balance held by `owner`.
    fn balance_of(&self, owner: &Address) -> Amount;

    /// Move `amount` from `from` to `to`.
    ///
    /// Must fail loudly, leaving every balance unchanged, when `from` holds
    /// less than `amount`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError>;
}

/// An ownership registry for claim slots (NFT-style).
pub trait SlotRegistry {
    /// Identity the registry uses when it calls [`TransferHook::before_slot_transfer`].
    fn address(&self) -> Address;

    /// Current owner of `slot`, or `None` if the slot does not exist.
    fn owner_of(&self, slot: SlotId) -> Option<Address>;
}

/// Receiver of ownership-change notifications from a [`SlotRegistry`].
///
/// A registry designates exactly one hook and calls it before committing
/// any ownership change. An error aborts that change.
pub trait TransferHook {
    /// Settle `slot` in favor of `previous_owner` before it moves.
    ///
    /// `caller` is the identity of the registry making the call. Returns the
    /// amount paid out, which may be zero.
    fn before_slot_transfer(
        &mut self,
        caller: &Address,
        slot: SlotId,
        previous_owner: &Address,
    ) -> crate::Result<Amount>;
}
