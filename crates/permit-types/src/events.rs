//! Event types for observers of the permit engine.
//!
//! Events flow through a broadcast bus so that audit and indexing
//! collaborators can react to applied permits. Delivery is best-effort:
//! the engine's own state never depends on an event being received.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Events published by the permit engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermitEvent {
	/// An allowance was granted (or overwritten) after a successful permit.
	Approval {
		owner: Address,
		spender: Address,
		value: U256,
	},
}
