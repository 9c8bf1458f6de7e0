//! Domain binding for the verifying instance.
//!
//! The domain separator ties every signature to one protocol name, version,
//! chain identity and verifying contract. It is computed once when the
//! engine is built and cached for the lifetime of the instance; a signature
//! produced against a different deployment or network hashes to a different
//! challenge digest and fails the signer gate.

use alloy_primitives::{Address, B256};
use permit_config::{ConfigError, DomainConfig};
use permit_types::compute_domain_hash;

/// A cached EIP-712 domain separator together with the values it binds.
#[derive(Debug, Clone)]
pub struct DomainBinder {
	name: String,
	version: String,
	chain_id: u64,
	verifying_contract: Address,
	separator: B256,
}

impl DomainBinder {
	/// Computes the domain separator for the given identity values.
	pub fn new(name: &str, version: &str, chain_id: u64, verifying_contract: Address) -> Self {
		let separator = compute_domain_hash(name, version, chain_id, &verifying_contract);
		Self {
			name: name.to_string(),
			version: version.to_string(),
			chain_id,
			verifying_contract,
			separator,
		}
	}

	/// Builds a binder from validated domain configuration.
	pub fn from_config(config: &DomainConfig) -> Result<Self, ConfigError> {
		let contract = config.verifying_address()?;
		Ok(Self::new(
			&config.name,
			&config.version,
			config.chain_id,
			contract,
		))
	}

	/// The cached domain separator.
	pub fn separator(&self) -> &B256 {
		&self.separator
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn version(&self) -> &str {
		&self.version
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn verifying_contract(&self) -> &Address {
		&self.verifying_contract
	}
}
