//! The signed authorization intent and its EIP-712 struct hash.
//!
//! A [`PermitIntent`] is the structured message an owner signs to grant a
//! spender an allowance. It is constructed per verification call and
//! discarded immediately afterwards; only its hash participates in the
//! signature check.

use crate::utils::Eip712AbiEncoder;
use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

/// ERC-2612 permit type string. The constant tag versions the struct layout:
/// exactly these five fields, in this order, as fixed 32-byte words.
pub const PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

/// An authorization intent: owner grants spender an allowance of `value`,
/// valid while `deadline` has not passed, bound to the owner's `nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitIntent {
	/// The principal granting the allowance; must have signed the intent.
	pub owner: Address,
	/// The principal being authorized to spend.
	pub spender: Address,
	/// The allowance amount being granted.
	pub value: U256,
	/// The owner's replay-protection counter at signing time.
	pub nonce: U256,
	/// Inclusive expiry, Unix seconds.
	pub deadline: U256,
}

impl PermitIntent {
	/// Computes the EIP-712 struct hash of this intent:
	/// keccak256(abi.encode(typeHash, owner, spender, value, nonce, deadline)).
	///
	/// Deterministic; any field change produces a different hash with
	/// overwhelming probability.
	pub fn struct_hash(&self) -> B256 {
		let permit_type_hash = keccak256(PERMIT_TYPE.as_bytes());
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&permit_type_hash);
		enc.push_address(&self.owner);
		enc.push_address(&self.spender);
		enc.push_u256(self.value);
		enc.push_u256(self.nonce);
		enc.push_u256(self.deadline);
		keccak256(enc.finish())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::b256;

	fn sample_intent() -> PermitIntent {
		PermitIntent {
			owner: Address::repeat_byte(0x01),
			spender: Address::repeat_byte(0x02),
			value: U256::from(100u64),
			nonce: U256::ZERO,
			deadline: U256::from(1_900_000_000u64),
		}
	}

	#[test]
	fn permit_typehash_matches_published_constant() {
		assert_eq!(
			keccak256(PERMIT_TYPE.as_bytes()),
			b256!("6e71edae12b1b97f4d1f60370fef10105fa2faae0126114a169c64845d6126c9")
		);
	}

	#[test]
	fn struct_hash_is_deterministic() {
		assert_eq!(sample_intent().struct_hash(), sample_intent().struct_hash());
	}

	#[test]
	fn struct_hash_changes_with_every_field() {
		let base = sample_intent().struct_hash();

		let mut intent = sample_intent();
		intent.owner = Address::repeat_byte(0x03);
		assert_ne!(base, intent.struct_hash());

		let mut intent = sample_intent();
		intent.spender = Address::repeat_byte(0x03);
		assert_ne!(base, intent.struct_hash());

		let mut intent = sample_intent();
		intent.value = U256::from(101u64);
		assert_ne!(base, intent.struct_hash());

		let mut intent = sample_intent();
		intent.nonce = U256::from(1u64);
		assert_ne!(base, intent.struct_hash());

		let mut intent = sample_intent();
		intent.deadline = U256::from(1_900_000_001u64);
		assert_ne!(base, intent.struct_hash());
	}
}
