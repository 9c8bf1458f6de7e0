//! Common types module for the permit engine.
//!
//! This module defines the core data types and structures shared across
//! the engine crates: the signed authorization intent, the v/r/s signature
//! with canonical-form validation, approval events, and the EIP-712
//! hashing utilities everything else is built on.

/// Approval event types published on the engine's event bus.
pub mod events;
/// The authorization intent and its EIP-712 struct hash.
pub mod intent;
/// The v/r/s ECDSA signature and its canonical-form validation.
pub mod signature;
/// Utility functions for hashing and formatting.
pub mod utils;

// Re-export all types for convenient access
pub use events::*;
pub use intent::*;
pub use signature::*;
pub use utils::{address_hex, compute_domain_hash, compute_final_digest, Eip712AbiEncoder};

// Re-export the primitives the public API is expressed in
pub use alloy_primitives::{Address, B256, U256};
