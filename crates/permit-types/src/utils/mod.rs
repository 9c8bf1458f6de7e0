//! Utility functions shared across the permit engine.

pub mod eip712;
pub mod formatting;

pub use eip712::{compute_domain_hash, compute_final_digest, Eip712AbiEncoder};
pub use formatting::address_hex;
