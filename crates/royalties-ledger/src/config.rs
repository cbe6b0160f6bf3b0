//! Construction parameters.
//!
//! A ledger is built once from a [`LedgerConfig`] plus handles to its payment
//! asset and slot registry. The configuration is usually kept in a TOML file:
//!
//! ```toml
//! ledger_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
//! owner_address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//! creator_address = "0xe7f506aaf42540b91bc6e5d2e109378d66de63ee"
//! initial_collection_size = 10000
//! ```

use std::path::Path;

use royalties_types::{Address, DEFAULT_COLLECTION_SIZE};
use serde::{Deserialize, Serialize};

use crate::{Result, RoyaltyError};

/// Parameters fixed at ledger construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The ledger's own account on the payment asset. Deposits are sent here.
    pub ledger_address: Address,
    /// Administrative owner. Only this identity may shrink the collection or
    /// reassign the creator.
    pub owner_address: Address,
    /// Initial creator beneficiary.
    pub creator_address: Address,
    /// Number of slots the community pool is divided across.
    #[serde(default = "default_collection_size")]
    pub initial_collection_size: u64,
}

fn default_collection_size() -> u64 {
    DEFAULT_COLLECTION_SIZE
}

impl LedgerConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Config`] if the document does not parse or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LedgerConfig =
            toml::from_str(content).map_err(|e| RoyaltyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Config`] if the file cannot be read, parsed or validated
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RoyaltyError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded ledger config");
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| RoyaltyError::Config(e.to_string()))
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// - [`RoyaltyError::Config`] if the collection size is zero or any of
    ///   the configured addresses is the zero address
    pub fn validate(&self) -> Result<()> {
        if self.initial_collection_size == 0 {
            return Err(RoyaltyError::Config(
                "initial_collection_size must be at least 1".to_string(),
            ));
        }
        for (field, address) in [
            ("ledger_address", &self.ledger_address),
            ("owner_address", &self.owner_address),
            ("creator_address", &self.creator_address),
        ] {
            if address.is_zero() {
                return Err(RoyaltyError::Config(format!(
                    "{field} must not be the zero address"
                )));
            }
        }
        Ok(())
    }
}
