//! The authorization orchestrator.
//!
//! [`PermitEngine`] is the single entry point that mutates engine state.
//! One call runs the gated sequence: reserve the owner's nonce, check the
//! deadline, hash the intent, recover the signer, compare it to the claimed
//! owner, and only then write the allowance and publish the approval event.
//! Every gate failure is terminal for that call; the reserved nonce is never
//! returned.

use crate::{challenge_digest, recover_signer, DomainBinder, EventBus, NonceLedger, PermitError};
use alloy_primitives::{Address, B256, U256};
use permit_storage::{StorageError, StorageService};
use permit_types::{address_hex, PermitEvent, PermitIntent, PermitSignature};
use std::sync::Arc;

/// Storage namespace for the allowance table.
const ALLOWANCE_NAMESPACE: &str = "allowances";

/// Composite storage id for one (owner, spender) allowance entry.
fn allowance_id(owner: &Address, spender: &Address) -> String {
	format!("{}:{}", address_hex(owner), address_hex(spender))
}

/// Signer gate: the recovered identity must equal the claimed owner.
///
/// The zero principal is excluded from valid owners, so a degenerate
/// signature recovering to the zero address can never pass — not even for
/// a (forged) claim that the owner is the zero address itself.
fn check_signer(recovered: Address, owner: Address) -> Result<(), PermitError> {
	if recovered == Address::ZERO || recovered != owner {
		return Err(PermitError::SignerMismatch { recovered, owner });
	}
	Ok(())
}

/// Engine that verifies signed authorization intents and records the
/// resulting allowances.
///
/// Holds its collaborators by composition: the cached domain binding, the
/// nonce ledger and the storage service are capabilities the engine calls
/// into, not behavior it inherits.
pub struct PermitEngine {
	/// Cached EIP-712 domain binding for this deployment.
	domain: DomainBinder,
	/// Per-owner replay-protection counters.
	nonces: NonceLedger,
	/// Storage service holding the allowance table.
	storage: Arc<StorageService>,
	/// Event bus for approval notifications.
	event_bus: EventBus,
}

impl PermitEngine {
	/// Creates an engine over the given domain binding and storage.
	///
	/// The nonce ledger shares the storage service, so counters and
	/// allowances persist together.
	pub fn new(domain: DomainBinder, storage: Arc<StorageService>) -> Self {
		tracing::info!(
			name = domain.name(),
			version = domain.version(),
			chain_id = domain.chain_id(),
			verifying_contract = %address_hex(domain.verifying_contract()),
			"Initialized permit engine"
		);
		Self {
			domain,
			nonces: NonceLedger::new(Arc::clone(&storage)),
			storage,
			event_bus: EventBus::default(),
		}
	}

	/// Verifies a signed authorization intent and, on success, records the
	/// allowance (owner, spender) -> value.
	///
	/// The owner's current nonce is consumed by every attempt, successful
	/// or not; an owner whose permit was rejected must re-sign over the new
	/// counter value.
	pub async fn permit(
		&self,
		owner: Address,
		spender: Address,
		value: U256,
		deadline: U256,
		signature: PermitSignature,
	) -> Result<(), PermitError> {
		let now = U256::from(chrono::Utc::now().timestamp().max(0) as u64);
		self.permit_at(owner, spender, value, deadline, signature, now)
			.await
	}

	/// Runs the gated verification sequence against an explicit clock value.
	async fn permit_at(
		&self,
		owner: Address,
		spender: Address,
		value: U256,
		deadline: U256,
		signature: PermitSignature,
		now: U256,
	) -> Result<(), PermitError> {
		// Irreversible: the nonce is consumed no matter how this attempt
		// ends. There is no rollback path.
		let nonce = self.nonces.reserve_next(&owner).await?;

		// Deadline is inclusive: now == deadline still passes.
		if now > deadline {
			tracing::warn!(
				owner = %address_hex(&owner),
				%deadline,
				%now,
				"Rejected permit: expired"
			);
			return Err(PermitError::Expired { deadline });
		}

		let intent = PermitIntent {
			owner,
			spender,
			value,
			nonce,
			deadline,
		};
		let digest = challenge_digest(self.domain.separator(), &intent.struct_hash());

		let recovered = recover_signer(&digest, &signature).inspect_err(|e| {
			tracing::warn!(owner = %address_hex(&owner), error = %e, "Rejected permit");
		})?;

		check_signer(recovered, owner).inspect_err(|_| {
			tracing::warn!(
				owner = %address_hex(&owner),
				recovered = %address_hex(&recovered),
				"Rejected permit: signer mismatch"
			);
		})?;

		// Single final mutation: overwrite any prior allowance for the pair.
		self.storage
			.store(ALLOWANCE_NAMESPACE, &allowance_id(&owner, &spender), &value)
			.await
			.map_err(|e| PermitError::Storage(e.to_string()))?;

		self.event_bus.publish(PermitEvent::Approval {
			owner,
			spender,
			value,
		});
		tracing::info!(
			owner = %address_hex(&owner),
			spender = %address_hex(&spender),
			%value,
			%nonce,
			"Applied permit"
		);
		Ok(())
	}

	/// Returns the allowance recorded for (owner, spender), zero if absent.
	pub async fn allowance(&self, owner: &Address, spender: &Address) -> Result<U256, PermitError> {
		match self
			.storage
			.retrieve::<U256>(ALLOWANCE_NAMESPACE, &allowance_id(owner, spender))
			.await
		{
			Ok(value) => Ok(value),
			Err(StorageError::NotFound) => Ok(U256::ZERO),
			Err(e) => Err(PermitError::Storage(e.to_string())),
		}
	}

	/// Returns the owner's current nonce (the value the next permit must be
	/// signed over).
	pub async fn nonce_of(&self, owner: &Address) -> Result<U256, PermitError> {
		self.nonces.current(owner).await
	}

	/// The domain separator signatures are verified against.
	pub fn domain_separator(&self) -> &B256 {
		self.domain.separator()
	}

	/// The domain binding in full.
	pub fn domain(&self) -> &DomainBinder {
		&self.domain
	}

	/// The event bus approvals are published on.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use k256::ecdsa::SigningKey;
	use permit_storage::{FileStorage, MemoryStorage};
	use permit_types::compute_final_digest;
	use tempfile::TempDir;

	const FAR_DEADLINE: u64 = 4_000_000_000; // year 2096

	fn signer(seed: u8) -> (SigningKey, Address) {
		let key = SigningKey::from_slice(&[seed; 32]).unwrap();
		let address = Address::from_public_key(key.verifying_key());
		(key, address)
	}

	fn engine() -> PermitEngine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		PermitEngine::new(
			DomainBinder::new("Permit Engine", "1", 1, Address::repeat_byte(0x11)),
			storage,
		)
	}

	fn sign_intent(key: &SigningKey, separator: &B256, intent: &PermitIntent) -> PermitSignature {
		let digest = compute_final_digest(separator, &intent.struct_hash());
		let (sig, recovery_id) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
		let (r, s) = sig.split_bytes();
		PermitSignature::new(
			27 + recovery_id.to_byte(),
			B256::from_slice(r.as_slice()),
			B256::from_slice(s.as_slice()),
		)
	}

	fn intent(owner: Address, spender: Address, value: u64, nonce: u64) -> PermitIntent {
		PermitIntent {
			owner,
			spender,
			value: U256::from(value),
			nonce: U256::from(nonce),
			deadline: U256::from(FAR_DEADLINE),
		}
	}

	#[tokio::test]
	async fn test_valid_permit_is_applied() {
		let engine = engine();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &intent);

		engine
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap();

		assert_eq!(engine.nonce_of(&owner).await.unwrap(), U256::from(1u64));
		assert_eq!(
			engine.allowance(&owner, &spender).await.unwrap(),
			U256::from(100u64)
		);
	}

	#[tokio::test]
	async fn test_approval_event_is_published() {
		let engine = engine();
		let mut events = engine.event_bus().subscribe();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &intent);
		engine
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap();

		assert_eq!(
			events.recv().await.unwrap(),
			PermitEvent::Approval {
				owner,
				spender,
				value: U256::from(100u64),
			}
		);
	}

	#[tokio::test]
	async fn test_deadline_is_inclusive() {
		let engine = engine();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &intent);

		// now == deadline is accepted
		engine
			.permit_at(
				owner,
				spender,
				intent.value,
				intent.deadline,
				sig,
				intent.deadline,
			)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_expired_permit_still_consumes_nonce() {
		let engine = engine();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &intent);

		let now = intent.deadline + U256::from(1u64);
		let err = engine
			.permit_at(owner, spender, intent.value, intent.deadline, sig, now)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::Expired { .. }));

		// The attempt burned the nonce even though nothing was verified.
		assert_eq!(engine.nonce_of(&owner).await.unwrap(), U256::from(1u64));
		assert_eq!(engine.allowance(&owner, &spender).await.unwrap(), U256::ZERO);
	}

	#[tokio::test]
	async fn test_replay_fails_with_signer_mismatch() {
		let engine = engine();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &intent);

		engine
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap();

		// Identical message again: the nonce has advanced, so the struct
		// hash the attacker replays is no longer what the owner signed.
		let err = engine
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::SignerMismatch { .. }));
		assert_eq!(engine.nonce_of(&owner).await.unwrap(), U256::from(2u64));
	}

	#[tokio::test]
	async fn test_cross_domain_signature_is_rejected() {
		let mainnet = engine();
		let other = PermitEngine::new(
			DomainBinder::new("Permit Engine", "1", 5, Address::repeat_byte(0x11)),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
		);
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, other.domain_separator(), &intent);

		let err = mainnet
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::SignerMismatch { .. }));
	}

	#[tokio::test]
	async fn test_tampered_fields_are_rejected() {
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		// Tampering with the amount
		let engine1 = engine();
		let signed = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine1.domain_separator(), &signed);
		let err = engine1
			.permit(owner, spender, U256::from(101u64), signed.deadline, sig)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::SignerMismatch { .. }));

		// Tampering with the spender
		let engine2 = engine();
		let sig = sign_intent(&key, engine2.domain_separator(), &signed);
		let err = engine2
			.permit(
				owner,
				Address::repeat_byte(0x03),
				signed.value,
				signed.deadline,
				sig,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::SignerMismatch { .. }));

		// Tampering with the deadline
		let engine3 = engine();
		let sig = sign_intent(&key, engine3.domain_separator(), &signed);
		let err = engine3
			.permit(
				owner,
				spender,
				signed.value,
				signed.deadline + U256::from(1u64),
				sig,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::SignerMismatch { .. }));
	}

	#[tokio::test]
	async fn test_wrong_signer_is_rejected() {
		let engine = engine();
		let (thief_key, _) = signer(0x43);
		let (_, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let sig = sign_intent(&thief_key, engine.domain_separator(), &intent);

		let err = engine
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap_err();
		match err {
			PermitError::SignerMismatch { recovered, owner: claimed } => {
				assert_ne!(recovered, claimed);
			}
			other => panic!("unexpected error: {}", other),
		}
	}

	#[tokio::test]
	async fn test_malformed_signature_still_consumes_nonce() {
		let engine = engine();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let intent = intent(owner, spender, 100, 0);
		let mut sig = sign_intent(&key, engine.domain_separator(), &intent);
		sig.v = 9;

		let err = engine
			.permit(owner, spender, intent.value, intent.deadline, sig)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::InvalidSignatureEncoding(_)));
		assert_eq!(engine.nonce_of(&owner).await.unwrap(), U256::from(1u64));
	}

	#[tokio::test]
	async fn test_second_permit_overwrites_allowance() {
		let engine = engine();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);

		let first = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &first);
		engine
			.permit(owner, spender, first.value, first.deadline, sig)
			.await
			.unwrap();

		// Fresh signature over nonce 1 and a smaller amount
		let second = intent(owner, spender, 50, 1);
		let sig = sign_intent(&key, engine.domain_separator(), &second);
		engine
			.permit(owner, spender, second.value, second.deadline, sig)
			.await
			.unwrap();

		// Overwrite, not additive
		assert_eq!(
			engine.allowance(&owner, &spender).await.unwrap(),
			U256::from(50u64)
		);
	}

	#[tokio::test]
	async fn test_state_survives_restart_with_file_backend() {
		let dir = TempDir::new().unwrap();
		let (key, owner) = signer(0x42);
		let spender = Address::repeat_byte(0x02);
		let domain = DomainBinder::new("Permit Engine", "1", 1, Address::repeat_byte(0x11));

		{
			let storage = Arc::new(StorageService::new(Box::new(FileStorage::new(dir.path()))));
			let engine = PermitEngine::new(domain.clone(), storage);
			let intent = intent(owner, spender, 100, 0);
			let sig = sign_intent(&key, engine.domain_separator(), &intent);
			engine
				.permit(owner, spender, intent.value, intent.deadline, sig)
				.await
				.unwrap();
		}

		// A new engine over the same directory sees the advanced nonce and
		// the recorded allowance.
		let storage = Arc::new(StorageService::new(Box::new(FileStorage::new(dir.path()))));
		let engine = PermitEngine::new(domain, storage);
		assert_eq!(engine.nonce_of(&owner).await.unwrap(), U256::from(1u64));
		assert_eq!(
			engine.allowance(&owner, &spender).await.unwrap(),
			U256::from(100u64)
		);

		// And a replay against the restarted engine still fails.
		let replayed = intent(owner, spender, 100, 0);
		let sig = sign_intent(&key, engine.domain_separator(), &replayed);
		let err = engine
			.permit(owner, spender, replayed.value, replayed.deadline, sig)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::SignerMismatch { .. }));
	}

	#[test]
	fn test_zero_recovered_signer_never_matches() {
		let owner = Address::repeat_byte(0x01);

		// Ordinary mismatch
		assert!(matches!(
			check_signer(Address::ZERO, owner),
			Err(PermitError::SignerMismatch { .. })
		));

		// Even a claim that the owner IS the zero address cannot be
		// satisfied by a degenerate zero recovery.
		assert!(matches!(
			check_signer(Address::ZERO, Address::ZERO),
			Err(PermitError::SignerMismatch { .. })
		));

		// A matching nonzero signer passes.
		assert!(check_signer(owner, owner).is_ok());
	}

	#[tokio::test]
	async fn test_allowance_defaults_to_zero() {
		let engine = engine();
		assert_eq!(
			engine
				.allowance(&Address::repeat_byte(0x01), &Address::repeat_byte(0x02))
				.await
				.unwrap(),
			U256::ZERO
		);
	}
}
