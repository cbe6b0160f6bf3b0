//! In-memory slot ownership registry.
//!
//! Slots are minted sequentially starting at id 1. Every ownership change
//! first calls the designated [`TransferHook`] synchronously, passing the
//! previous owner, and only commits if the hook succeeds. Minting does not
//! call the hook. At most one hook is active at a time and only the registry
//! admin may designate it.
//!
//! The registry keeps only a weak reference to its hook. The ledger already
//! holds a registry handle, so a strong one would keep both alive forever.
//! Once the hook is dropped, transfers fail with [`StubError::HookDropped`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use royalties_ledger::{SlotRegistry, TransferHook};
use royalties_types::{Address, SlotId};

use crate::{Result, StubError};

/// Weak handle to the hook a registry notifies.
pub type HookHandle = Weak<RefCell<dyn TransferHook>>;

/// Ownership table for a collection of slots.
pub struct MemoryRegistry {
    address: Address,
    admin: Address,
    owners: BTreeMap<SlotId, Address>,
    hook: Option<HookHandle>,
}

impl fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("address", &self.address)
            .field("admin", &self.admin)
            .field("slots", &self.owners.len())
            .field("hooked", &self.hook.is_some())
            .finish()
    }
}

impl MemoryRegistry {
    /// Create an empty registry identified by `address` and administered by `admin`.
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            admin,
            owners: BTreeMap::new(),
            hook: None,
        }
    }

    /// The identity allowed to designate the hook.
    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Number of slots minted so far.
    pub fn slot_count(&self) -> u64 {
        self.owners.len() as u64
    }

    /// Mint the next slot to `to`.
    pub fn mint(&mut self, to: &Address) -> SlotId {
        let slot = SlotId(self.slot_count() + 1);
        self.owners.insert(slot, *to);
        tracing::trace!(%slot, to = %to, "slot minted");
        slot
    }
}

impl SlotRegistry for MemoryRegistry {
    fn address(&self) -> Address {
        self.address
    }

    fn owner_of(&self, slot: SlotId) -> Option<Address> {
        self.owners.get(&slot).copied()
    }
}

/// Shared handle to a [`MemoryRegistry`].
#[derive(Debug, Clone)]
pub struct SharedRegistry(Rc<RefCell<MemoryRegistry>>);

impl SharedRegistry {
    /// Create a handle to an empty registry. See [`MemoryRegistry::new`].
    pub fn new(address: Address, admin: Address) -> Self {
        Self(Rc::new(RefCell::new(MemoryRegistry::new(address, admin))))
    }

    /// See [`MemoryRegistry::mint`].
    pub fn mint(&self, to: &Address) -> Result<SlotId> {
        Ok(self.inner_mut()?.mint(to))
    }

    /// See [`MemoryRegistry::slot_count`].
    pub fn slot_count(&self) -> u64 {
        self.0.borrow().slot_count()
    }

    /// Designate the single hook notified before every ownership change,
    /// replacing any previous one.
    ///
    /// # Errors
    ///
    /// - [`StubError::NotAdmin`] if `caller` is not the registry admin
    pub fn set_royalties_hook<H>(&self, caller: &Address, hook: &Rc<RefCell<H>>) -> Result<()>
    where
        H: TransferHook + 'static,
    {
        let mut inner = self.inner_mut()?;
        if caller != inner.admin() {
            return Err(StubError::NotAdmin(*caller));
        }
        let hook: HookHandle = Rc::<RefCell<H>>::downgrade(hook);
        let replaced = inner.hook.replace(hook).is_some();
        tracing::info!(registry = %inner.address, replaced, "royalties hook designated");
        Ok(())
    }

    /// Move `slot` from `from` to `to`, settling royalties for `from` first.
    ///
    /// # Errors
    ///
    /// - [`StubError::UnknownSlot`] if the slot was never minted
    /// - [`StubError::NotOwner`] unless `caller` and `from` are the current owner
    /// - [`StubError::Ledger`] if the hook fails; ownership is unchanged
    /// - [`StubError::HookDropped`] if the designated hook no longer exists
    pub fn transfer_from(&self, caller: &Address, from: &Address, to: &Address, slot: SlotId) -> Result<()> {
        let (registry, hook) = {
            let inner = self.0.borrow();
            let owner = inner.owner_of(slot).ok_or(StubError::UnknownSlot(slot))?;
            if owner != *from || caller != from {
                return Err(StubError::NotOwner {
                    slot,
                    caller: *caller,
                });
            }
            (inner.address, inner.hook.clone())
        };

        // the registry borrow is released so the hook may read ownership
        if let Some(hook) = hook {
            let hook = hook.upgrade().ok_or(StubError::HookDropped)?;
            let paid = hook
                .try_borrow_mut()
                .map_err(|_| StubError::Reentrant("transfer hook"))?
                .before_slot_transfer(&registry, slot, from)?;
            tracing::debug!(%slot, paid, "hook settled slot before transfer");
        }

        self.inner_mut()?.owners.insert(slot, *to);
        tracing::info!(%slot, from = %from, to = %to, "slot transferred");
        Ok(())
    }

    fn inner_mut(&self) -> Result<std::cell::RefMut<'_, MemoryRegistry>> {
        self.0
            .try_borrow_mut()
            .map_err(|_| StubError::Reentrant("slot registry"))
    }
}

impl SlotRegistry for SharedRegistry {
    fn address(&self) -> Address {
        self.0.borrow().address()
    }

    fn owner_of(&self, slot: SlotId) -> Option<Address> {
        self.0.borrow().owner_of(slot)
    }
}
