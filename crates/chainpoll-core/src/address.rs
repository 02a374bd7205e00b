//! Address string normalization.

use crate::error::FilterError;
use crate::types::Address;

/// Prefix used by XDC Network explorers and wallets in place of `0x`.
pub const XDC_PREFIX: &str = "xdc";

/// Normalize a contract address string into 20 bytes.
///
/// A leading `xdc` (any case) is rewritten to `0x`; surrounding whitespace is
/// ignored. What remains must be exactly 40 hex digits, optionally prefixed.
pub fn normalize_address(raw: &str) -> Result<Address, FilterError> {
    let trimmed = raw.trim();
    let rewritten = match trimmed.get(..XDC_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(XDC_PREFIX) => {
            format!("0x{}", &trimmed[XDC_PREFIX.len()..])
        }
        _ => trimmed.to_string(),
    };

    rewritten
        .parse::<Address>()
        .map_err(|e| FilterError::InvalidAddress {
            address: raw.to_string(),
            reason: e.to_string(),
        })
}
