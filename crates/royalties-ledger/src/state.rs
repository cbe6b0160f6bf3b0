//! Durable ledger counters.
//!
//! [`LedgerState`] holds everything the ledger must remember between calls:
//! the two role addresses, the collection size and the cumulative payout
//! counters. Collected value itself is never stored. Callers pass in
//! `total_collected`, which the engine derives from the asset balance plus
//! [`LedgerState::total_paid`].
//!
//! Counters only ever grow. Mutation happens in two steps so a payout can be
//! made atomic around the external transfer: [`LedgerState::prepare_creator_payout`]
//! or [`LedgerState::prepare_slot_payouts`] compute the new counter values with
//! checked arithmetic, and [`LedgerState::commit`] writes them once the
//! transfer has succeeded.

use std::collections::BTreeMap;

use royalties_types::{Address, Amount, SlotId};
use serde::{Deserialize, Serialize};

use crate::split;
use crate::{Result, RoyaltyError};

/// The ledger's durable record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    owner_address: Address,
    creator_address: Address,
    collection_size: u64,
    creator_claimed_total: Amount,
    /// Always equal to the sum of `claimed_by_slot`.
    community_claimed_total: Amount,
    claimed_by_slot: BTreeMap<SlotId, Amount>,
    claimed_by_address: BTreeMap<Address, Amount>,
}

/// Counter values computed ahead of a payout, written by [`LedgerState::commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPayout {
    payee: Address,
    amount: Amount,
    payee_total: Amount,
    creator_total: Option<Amount>,
    community_total: Amount,
    slot_totals: Vec<(SlotId, Amount)>,
    slot_amounts: Vec<(SlotId, Amount)>,
}

impl PendingPayout {
    /// The address receiving the payout.
    pub fn payee(&self) -> &Address {
        &self.payee
    }

    /// Total amount to transfer.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Amount attributed to each slot, in claim order, duplicates included.
    pub fn slot_amounts(&self) -> &[(SlotId, Amount)] {
        &self.slot_amounts
    }
}

impl LedgerState {
    /// Create a fresh state with zeroed counters.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::InvalidSize`] if `collection_size` is zero
    pub fn new(owner_address: Address, creator_address: Address, collection_size: u64) -> Result<Self> {
        let state = Self {
            owner_address,
            creator_address,
            collection_size,
            creator_claimed_total: 0,
            community_claimed_total: 0,
            claimed_by_slot: BTreeMap::new(),
            claimed_by_address: BTreeMap::new(),
        };
        state.validate()?;
        Ok(state)
    }

    /// Check the structural invariants of a state, e.g. one restored from storage.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::InvalidSize`] if the collection size is zero
    /// - [`RoyaltyError::InconsistentState`] if the cached community total
    ///   disagrees with the per-slot counters
    pub fn validate(&self) -> Result<()> {
        if self.collection_size == 0 {
            return Err(RoyaltyError::InvalidSize {
                requested: 0,
                max: u64::MAX,
            });
        }
        let summed = self
            .claimed_by_slot
            .values()
            .try_fold(0 as Amount, |acc, v| acc.checked_add(*v))
            .ok_or(RoyaltyError::ArithmeticOverflow)?;
        if summed != self.community_claimed_total {
            return Err(RoyaltyError::InconsistentState(format!(
                "slot claims sum to {summed}, community total is {}",
                self.community_claimed_total
            )));
        }
        Ok(())
    }

    /// Administrative owner.
    pub fn owner_address(&self) -> &Address {
        &self.owner_address
    }

    /// Current creator beneficiary.
    pub fn creator_address(&self) -> &Address {
        &self.creator_address
    }

    /// Current divisor of the community pool.
    pub fn collection_size(&self) -> u64 {
        self.collection_size
    }

    /// Cumulative amount ever paid to the creator role, across all creators.
    pub fn creator_claimed_total(&self) -> Amount {
        self.creator_claimed_total
    }

    /// Cumulative amount ever paid against any slot.
    pub fn community_claimed_total(&self) -> Amount {
        self.community_claimed_total
    }

    /// Cumulative amount paid against `slot`. Zero if never claimed.
    pub fn slot_claimed(&self, slot: SlotId) -> Amount {
        self.claimed_by_slot.get(&slot).copied().unwrap_or(0)
    }

    /// Cumulative amount paid to `address`, creator and community payouts combined.
    pub fn address_claimed(&self, address: &Address) -> Amount {
        self.claimed_by_address.get(address).copied().unwrap_or(0)
    }

    /// Everything ever disbursed by the ledger.
    pub fn total_paid(&self) -> Result<Amount> {
        self.creator_claimed_total
            .checked_add(self.community_claimed_total)
            .ok_or(RoyaltyError::ArithmeticOverflow)
    }

    /// Lifetime collected value given what the ledger currently holds.
    pub fn total_collected(&self, held: Amount) -> Result<Amount> {
        held.checked_add(self.total_paid()?)
            .ok_or(RoyaltyError::ArithmeticOverflow)
    }

    /// The creator role's lifetime entitlement.
    pub fn creator_entitlement(&self, total_collected: Amount) -> Result<Amount> {
        split::creator_share(total_collected)
    }

    /// Creator entitlement not yet paid out.
    pub fn creator_balance(&self, total_collected: Amount) -> Result<Amount> {
        self.creator_entitlement(total_collected)?
            .checked_sub(self.creator_claimed_total)
            .ok_or(RoyaltyError::ArithmeticOverflow)
    }

    /// Lifetime entitlement of every slot under the current collection size.
    pub fn slot_lifetime_entitlement(&self, total_collected: Amount) -> Result<Amount> {
        split::per_slot_share(total_collected, self.collection_size)
    }

    /// Entitlement of `slot` not yet paid out.
    pub fn slot_balance(&self, total_collected: Amount, slot: SlotId) -> Result<Amount> {
        self.slot_lifetime_entitlement(total_collected)?
            .checked_sub(self.slot_claimed(slot))
            .ok_or(RoyaltyError::ArithmeticOverflow)
    }

    /// Stage a payout of the full creator balance to `payee`.
    pub fn prepare_creator_payout(&self, total_collected: Amount, payee: Address) -> Result<PendingPayout> {
        let amount = self.creator_balance(total_collected)?;
        Ok(PendingPayout {
            payee,
            amount,
            payee_total: self.credit(&payee, amount)?,
            creator_total: Some(
                self.creator_claimed_total
                    .checked_add(amount)
                    .ok_or(RoyaltyError::ArithmeticOverflow)?,
            ),
            community_total: self.community_claimed_total,
            slot_totals: Vec::new(),
            slot_amounts: Vec::new(),
        })
    }

    /// Stage payouts of each slot's balance to `payee`, strictly in order.
    ///
    /// Each step sees the claims staged by the steps before it, so a slot
    /// listed twice pays its balance once and zero the second time.
    pub fn prepare_slot_payouts(
        &self,
        total_collected: Amount,
        payee: Address,
        slots: &[SlotId],
    ) -> Result<PendingPayout> {
        let entitlement = self.slot_lifetime_entitlement(total_collected)?;
        let mut staged: BTreeMap<SlotId, Amount> = BTreeMap::new();
        let mut slot_amounts = Vec::with_capacity(slots.len());
        let mut amount: Amount = 0;

        for &slot in slots {
            let claimed = staged
                .get(&slot)
                .copied()
                .unwrap_or_else(|| self.slot_claimed(slot));
            let owed = entitlement
                .checked_sub(claimed)
                .ok_or(RoyaltyError::ArithmeticOverflow)?;
            staged.insert(slot, entitlement);
            slot_amounts.push((slot, owed));
            amount = amount
                .checked_add(owed)
                .ok_or(RoyaltyError::ArithmeticOverflow)?;
        }

        Ok(PendingPayout {
            payee,
            amount,
            payee_total: self.credit(&payee, amount)?,
            creator_total: None,
            community_total: self
                .community_claimed_total
                .checked_add(amount)
                .ok_or(RoyaltyError::ArithmeticOverflow)?,
            slot_totals: staged.into_iter().collect(),
            slot_amounts,
        })
    }

    /// Write staged counter values. Infallible by construction.
    pub(crate) fn commit(&mut self, pending: PendingPayout) {
        if let Some(total) = pending.creator_total {
            self.creator_claimed_total = total;
        }
        self.community_claimed_total = pending.community_total;
        for (slot, total) in pending.slot_totals {
            self.claimed_by_slot.insert(slot, total);
        }
        if pending.amount > 0 || self.claimed_by_address.contains_key(&pending.payee) {
            self.claimed_by_address.insert(pending.payee, pending.payee_total);
        }
    }

    /// Shrink the collection.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::InvalidSize`] unless `1 <= new_size <= collection_size`
    pub(crate) fn set_collection_size(&mut self, new_size: u64) -> Result<()> {
        if new_size == 0 || new_size > self.collection_size {
            return Err(RoyaltyError::InvalidSize {
                requested: new_size,
                max: self.collection_size,
            });
        }
        self.collection_size = new_size;
        Ok(())
    }

    pub(crate) fn set_creator_address(&mut self, creator: Address) {
        self.creator_address = creator;
    }

    fn credit(&self, payee: &Address, amount: Amount) -> Result<Amount> {
        self.address_claimed(payee)
            .checked_add(amount)
            .ok_or(RoyaltyError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(size: u64) -> LedgerState {
        LedgerState::new(Address::derive("owner"), Address::derive("creator"), size)
            .expect("state")
    }

    #[test]
    fn test_new_rejects_zero_size() {
        assert!(matches!(
            LedgerState::new(Address::derive("owner"), Address::derive("creator"), 0),
            Err(RoyaltyError::InvalidSize { requested: 0, .. })
        ));
    }

    #[test]
    fn test_total_collected_adds_payouts() {
        let mut s = state(4);
        let pending = s.prepare_creator_payout(100, Address::derive("creator")).expect("prepare");
        assert_eq!(pending.amount(), 25);
        s.commit(pending);
        // 75 left in the ledger, 25 already paid
        assert_eq!(s.total_collected(75).expect("total"), 100);
        assert_eq!(s.creator_balance(100).expect("balance"), 0);
    }

    #[test]
    fn test_slot_payout_updates_counters() {
        let mut s = state(4);
        let user = Address::derive("user");
        let pending = s
            .prepare_slot_payouts(100, user, &[SlotId(1)])
            .expect("prepare");
        // floor(75 / 4) = 18
        assert_eq!(pending.amount(), 18);
        s.commit(pending);
        assert_eq!(s.slot_claimed(SlotId(1)), 18);
        assert_eq!(s.address_claimed(&user), 18);
        assert_eq!(s.community_claimed_total(), 18);
        assert_eq!(s.slot_balance(100, SlotId(1)).expect("balance"), 0);
        assert_eq!(s.slot_balance(100, SlotId(2)).expect("balance"), 18);
    }

    #[test]
    fn test_duplicate_slot_pays_once() {
        let s = state(4);
        let pending = s
            .prepare_slot_payouts(100, Address::derive("user"), &[SlotId(3), SlotId(3), SlotId(2)])
            .expect("prepare");
        assert_eq!(
            pending.slot_amounts(),
            &[(SlotId(3), 18), (SlotId(3), 0), (SlotId(2), 18)]
        );
        assert_eq!(pending.amount(), 36);
    }

    #[test]
    fn test_prepare_does_not_mutate() {
        let s = state(4);
        let before = s.clone();
        let _ = s
            .prepare_slot_payouts(100, Address::derive("user"), &[SlotId(1)])
            .expect("prepare");
        assert_eq!(s, before);
    }

    #[test]
    fn test_zero_payout_leaves_address_map_untouched() {
        let mut s = state(4);
        let pending = s.prepare_creator_payout(0, Address::derive("creator")).expect("prepare");
        s.commit(pending);
        assert_eq!(s, state(4));
    }

    #[test]
    fn test_set_collection_size_bounds() {
        let mut s = state(1000);
        assert_eq!(
            s.set_collection_size(2000),
            Err(RoyaltyError::InvalidSize {
                requested: 2000,
                max: 1000
            })
        );
        assert!(s.set_collection_size(0).is_err());
        s.set_collection_size(1000).expect("same size is allowed");
        s.set_collection_size(500).expect("shrink");
        assert_eq!(s.collection_size(), 500);
    }

    #[test]
    fn test_shrink_raises_slot_entitlement() {
        let mut s = state(1000);
        let before = s.slot_lifetime_entitlement(10_000).expect("before");
        s.set_collection_size(500).expect("shrink");
        let after = s.slot_lifetime_entitlement(10_000).expect("after");
        assert_eq!(before, 7);
        assert_eq!(after, 15);
    }

    #[test]
    fn test_validate_catches_inconsistent_cache() {
        let mut s = state(2);
        s.claimed_by_slot.insert(SlotId(1), 5);
        assert!(matches!(s.validate(), Err(RoyaltyError::InconsistentState(_))));
        s.community_claimed_total = 5;
        s.validate().expect("consistent");
    }

    #[test]
    fn test_serde_snapshot() {
        let mut s = state(10);
        let pending = s
            .prepare_slot_payouts(1_000, Address::derive("user"), &[SlotId(7)])
            .expect("prepare");
        s.commit(pending);
        let json = serde_json::to_string(&s).expect("serialize");
        let restored: LedgerState = serde_json::from_str(&json).expect("deserialize");
        restored.validate().expect("valid");
        assert_eq!(restored, s);
    }
}
