//! Fixed creator/community split.
//!
//! Collected value is divided with integer floor division:
//!
//! ```text
//! creator        = floor(total * 1 / 4)
//! community_pool = floor(total * 3 / 4)
//! per_slot       = floor(community_pool / collection_size)
//! ```
//!
//! Remainders are never distributed. They stay in the ledger's balance and
//! become part of the next total.

use royalties_types::{Amount, COMMUNITY_SHARE_NUMERATOR, CREATOR_SHARE_NUMERATOR, SHARE_DENOMINATOR};

use crate::{Result, RoyaltyError};

/// `floor(amount * numerator / denominator)` with overflow checks.
fn scale(amount: Amount, numerator: Amount, denominator: Amount) -> Result<Amount> {
    amount
        .checked_mul(numerator)
        .and_then(|v| v.checked_div(denominator))
        .ok_or(RoyaltyError::ArithmeticOverflow)
}

/// The creator's lifetime share of `total_collected`.
pub fn creator_share(total_collected: Amount) -> Result<Amount> {
    scale(total_collected, CREATOR_SHARE_NUMERATOR, SHARE_DENOMINATOR)
}

/// The community pool's lifetime share of `total_collected`.
pub fn community_pool(total_collected: Amount) -> Result<Amount> {
    scale(total_collected, COMMUNITY_SHARE_NUMERATOR, SHARE_DENOMINATOR)
}

/// One slot's lifetime share of `total_collected` for a given collection size.
///
/// # Errors
///
/// - [`RoyaltyError::InvalidSize`] if `collection_size` is zero
/// - [`RoyaltyError::ArithmeticOverflow`] on overflow
pub fn per_slot_share(total_collected: Amount, collection_size: u64) -> Result<Amount> {
    if collection_size == 0 {
        return Err(RoyaltyError::InvalidSize {
            requested: 0,
            max: u64::MAX,
        });
    }
    let pool = community_pool(total_collected)?;
    pool.checked_div(Amount::from(collection_size))
        .ok_or(RoyaltyError::ArithmeticOverflow)
}
