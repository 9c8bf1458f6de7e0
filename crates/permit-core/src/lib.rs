//! Core engine for signature-based delegated authorization.
//!
//! This module provides the orchestration logic that turns a signed
//! authorization intent into a recorded allowance: the cached EIP-712
//! domain binding, the per-owner nonce ledger, ECDSA signer recovery,
//! and the gated verification sequence that ties them together.

use alloy_primitives::{Address, U256};
use thiserror::Error;

pub mod domain;
pub mod engine;
pub mod event_bus;
pub mod nonce;
pub mod verify;

pub use domain::DomainBinder;
pub use engine::PermitEngine;
pub use event_bus::EventBus;
pub use nonce::NonceLedger;
pub use verify::{challenge_digest, recover_signer};

/// Errors that can occur while processing an authorization attempt.
///
/// All variants are terminal results of a single call; the engine never
/// retries on its own. A stale nonce has no variant of its own: it makes
/// the struct hash differ from what the owner signed, so it surfaces as
/// [`PermitError::SignerMismatch`].
#[derive(Debug, Error)]
pub enum PermitError {
	/// The signed deadline has passed. Recoverable by re-signing with a
	/// fresh deadline.
	#[error("Permit expired: deadline {deadline} has passed")]
	Expired { deadline: U256 },
	/// A signature component is algebraically out of range.
	#[error("Invalid signature encoding: {0}")]
	InvalidSignatureEncoding(String),
	/// The signature is well-formed but was not produced by the claimed
	/// owner over this exact intent.
	#[error("Signer mismatch: recovered {recovered}, claimed owner {owner}")]
	SignerMismatch { recovered: Address, owner: Address },
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}
