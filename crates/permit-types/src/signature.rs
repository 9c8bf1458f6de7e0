//! The v/r/s ECDSA signature supplied with a permit call.
//!
//! Signatures are caller-supplied and never stored. Validation here covers
//! only the algebraic form of the components; whether the signature actually
//! matches the claimed owner is decided later, by the engine's signer gate.

use alloy_primitives::{b256, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// secp256k1 curve order divided by two. Signatures with `s` above this
/// bound are non-canonical (EIP-2) and rejected as malformed.
const SECP256K1N_HALF: B256 =
	b256!("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0");

/// Errors describing a malformed signature component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureFormatError {
	/// The recovery id is outside {0, 1, 27, 28}.
	#[error("invalid recovery id {0}, expected 0, 1, 27 or 28")]
	InvalidV(u8),
	/// The r component is zero.
	#[error("signature r component is zero")]
	ZeroR,
	/// The s component is zero.
	#[error("signature s component is zero")]
	ZeroS,
	/// The s component is above the curve-order half (non-canonical form).
	#[error("signature s component exceeds the curve-order half")]
	HighS,
}

/// An ECDSA signature as the (v, r, s) triple carried by permit calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
	/// Recovery id: 0/1 (parity form) or 27/28 (Ethereum legacy form).
	pub v: u8,
	/// The r component, 32 bytes big-endian.
	pub r: B256,
	/// The s component, 32 bytes big-endian.
	pub s: B256,
}

impl PermitSignature {
	pub fn new(v: u8, r: B256, s: B256) -> Self {
		Self { v, r, s }
	}

	/// Validates the algebraic form of the components and returns the
	/// normalized recovery parity (0 or 1).
	///
	/// Accepts both the raw parity encoding {0, 1} and the Ethereum legacy
	/// encoding {27, 28}; anything else is malformed. Enforces nonzero r/s
	/// and the EIP-2 low-s canonical form.
	pub fn validate(&self) -> Result<u8, SignatureFormatError> {
		let parity = match self.v {
			0 | 1 => self.v,
			27 | 28 => self.v - 27,
			other => return Err(SignatureFormatError::InvalidV(other)),
		};
		if self.r == B256::ZERO {
			return Err(SignatureFormatError::ZeroR);
		}
		if self.s == B256::ZERO {
			return Err(SignatureFormatError::ZeroS);
		}
		let s = U256::from_be_bytes(self.s.0);
		if s > U256::from_be_bytes(SECP256K1N_HALF.0) {
			return Err(SignatureFormatError::HighS);
		}
		Ok(parity)
	}
}
