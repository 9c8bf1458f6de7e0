//! Per-owner nonce ledger with atomic reservation.
//!
//! Each owner has a strictly increasing counter, starting at zero. A permit
//! must be signed over the owner's current counter value; reserving it
//! consumes it permanently, whether or not the rest of the verification
//! succeeds. Counters are persisted write-through so they survive restarts.

use crate::PermitError;
use alloy_primitives::{Address, U256};
use permit_storage::{StorageError, StorageService};
use permit_types::address_hex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage namespace for persisted counters.
const NONCE_NAMESPACE: &str = "nonces";

/// Tracks one monotonic counter per owner.
///
/// Reservation holds the write lock across the read-increment-persist
/// sequence, so two concurrent reservations for the same owner can never
/// observe the same counter value.
pub struct NonceLedger {
	storage: Arc<StorageService>,
	cache: RwLock<HashMap<Address, U256>>,
}

impl NonceLedger {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			cache: RwLock::new(HashMap::new()),
		}
	}

	/// Returns the owner's current (next expected) nonce. Read-only.
	pub async fn current(&self, owner: &Address) -> Result<U256, PermitError> {
		if let Some(value) = self.cache.read().await.get(owner) {
			return Ok(*value);
		}
		self.load(owner).await
	}

	/// Returns the owner's current nonce and advances the stored counter,
	/// as one atomic step. The returned value is consumed and will never
	/// be issued again (short of U256 wrap-around, which is treated as
	/// unreachable).
	pub async fn reserve_next(&self, owner: &Address) -> Result<U256, PermitError> {
		let mut cache = self.cache.write().await;
		let current = match cache.get(owner) {
			Some(value) => *value,
			None => self.load(owner).await?,
		};
		let next = current.wrapping_add(U256::from(1u64));

		// Persist before exposing the new value; a storage failure must not
		// leave the cache ahead of durable state.
		self.storage
			.store(NONCE_NAMESPACE, &address_hex(owner), &next)
			.await
			.map_err(|e| PermitError::Storage(e.to_string()))?;
		cache.insert(*owner, next);

		tracing::debug!(
			owner = %address_hex(owner),
			nonce = %current,
			"Reserved nonce"
		);
		Ok(current)
	}

	/// Reads the persisted counter, defaulting to zero for unseen owners.
	async fn load(&self, owner: &Address) -> Result<U256, PermitError> {
		match self
			.storage
			.retrieve::<U256>(NONCE_NAMESPACE, &address_hex(owner))
			.await
		{
			Ok(value) => Ok(value),
			Err(StorageError::NotFound) => Ok(U256::ZERO),
			Err(e) => Err(PermitError::Storage(e.to_string())),
		}
	}
}
