//! String formatting utilities.
//!
//! Provides functions for formatting principals and hex strings for
//! storage keys and log output.

use alloy_primitives::Address;

/// Formats an address as a lowercase "0x"-prefixed hex string.
///
/// Used for storage keys and log output, where a single canonical
/// spelling matters (EIP-55 checksum casing would make equal addresses
/// produce distinct keys).
pub fn address_hex(addr: &Address) -> String {
	format!("0x{}", hex::encode(addr.as_slice()))
}
