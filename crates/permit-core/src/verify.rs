//! Challenge digest construction and ECDSA signer recovery.
//!
//! Recovery is deliberately split from the owner comparison: this module
//! answers "who signed this digest" and nothing more. Whether that signer
//! is the claimed owner is the engine's gate, which keeps the cryptographic
//! primitive pure and the policy decision testable on its own.

use crate::PermitError;
use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use permit_types::{compute_final_digest, PermitSignature};

/// Combines the domain separator and struct hash into the challenge digest
/// the owner actually signs: keccak256(0x19 || 0x01 || domain || struct).
pub fn challenge_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
	compute_final_digest(domain_separator, struct_hash)
}

/// Recovers the address that signed the given prehashed digest.
///
/// Fails with [`PermitError::InvalidSignatureEncoding`] when a component is
/// algebraically out of range (unknown v, zero or out-of-field r/s,
/// non-canonical high s, or an r that is not a valid curve x-coordinate).
/// On success the returned address is whatever identity the algebra implies;
/// it has NOT been compared against any claimed owner.
pub fn recover_signer(digest: &B256, signature: &PermitSignature) -> Result<Address, PermitError> {
	let parity = signature
		.validate()
		.map_err(|e| PermitError::InvalidSignatureEncoding(e.to_string()))?;

	let sig = EcdsaSignature::from_scalars(signature.r.0, signature.s.0)
		.map_err(|e| PermitError::InvalidSignatureEncoding(format!("invalid scalar: {}", e)))?;
	let recovery_id = RecoveryId::from_byte(parity).ok_or_else(|| {
		PermitError::InvalidSignatureEncoding(format!("invalid recovery id {}", parity))
	})?;

	let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
		.map_err(|e| PermitError::InvalidSignatureEncoding(format!("recovery failed: {}", e)))?;
	Ok(Address::from_public_key(&key))
}
