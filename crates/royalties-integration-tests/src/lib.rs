//! Integration test crate for the royalties workspace.
//!
//! Holds the shared fixture used by the scenarios under `tests/`: a payment
//! asset, a slot registry and a ledger deployed against them, all in memory.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p royalties-integration-tests
//! ```

use royalties_ledger::LedgerConfig;
use royalties_stub::{deploy, SharedAsset, SharedLedger, SharedRegistry};
use royalties_types::{Address, Amount, SlotId};

/// One whole token in base units (18 decimals).
pub const ETHER: Amount = 1_000_000_000_000_000_000;

/// Install a test-friendly tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Parties and collaborators of a deployed ledger.
pub struct Fixture {
    /// Ledger owner, also the funded account that sends deposits.
    pub owner: Address,
    pub creator: Address,
    pub user: Address,
    pub user2: Address,
    /// Admin of the slot registry.
    pub registry_admin: Address,
    pub asset: SharedAsset,
    pub registry: SharedRegistry,
    pub ledger: SharedLedger,
    pub ledger_address: Address,
}

impl Fixture {
    /// Deploy a ledger with `collection_size` slots, fund the owner with
    /// 1000 tokens, and mint slot 1 to `user` and slot 2 to `user2`.
    pub fn new(collection_size: u64) -> Self {
        init_tracing();

        let owner = Address::derive("owner");
        let creator = Address::derive("creator");
        let user = Address::derive("user");
        let user2 = Address::derive("user2");
        let registry_admin = creator;
        let ledger_address = Address::derive("royalties");

        let asset = SharedAsset::new();
        asset.mint(&owner, 1_000 * ETHER).expect("fund owner");

        let registry = SharedRegistry::new(Address::derive("registry"), registry_admin);
        registry.mint(&user).expect("mint slot 1");
        registry.mint(&user2).expect("mint slot 2");

        let config = LedgerConfig {
            ledger_address,
            owner_address: owner,
            creator_address: creator,
            initial_collection_size: collection_size,
        };
        let ledger = deploy(&config, &asset, &registry, &registry_admin).expect("deploy ledger");

        Self {
            owner,
            creator,
            user,
            user2,
            registry_admin,
            asset,
            registry,
            ledger,
            ledger_address,
        }
    }

    /// Push `amount` from the owner's account to the ledger.
    pub fn deposit(&self, amount: Amount) {
        self.asset
            .send(&self.owner, &self.ledger_address, amount)
            .expect("deposit");
    }

    /// What the ledger currently holds.
    pub fn held(&self) -> Amount {
        self.asset.balance(&self.ledger_address)
    }

    /// Balance of `slot` as reported by the ledger.
    pub fn slot_balance(&self, slot: u64) -> Amount {
        self.ledger
            .borrow()
            .slot_balance(SlotId(slot))
            .expect("slot balance")
    }

    /// Mint `count` more slots to `to`, returning their ids.
    pub fn mint_slots(&self, to: &Address, count: usize) -> Vec<SlotId> {
        (0..count)
            .map(|_| self.registry.mint(to).expect("mint slot"))
            .collect()
    }
}

/// Convert plain ids into slot ids.
pub fn slots(ids: &[u64]) -> Vec<SlotId> {
    ids.iter().copied().map(SlotId).collect()
}
