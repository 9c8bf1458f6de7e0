//! Configuration module for the permit engine.
//!
//! This module provides structures and utilities for managing engine
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set before the engine starts.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the permit engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// EIP-712 domain the engine verifies signatures against.
	pub domain: DomainConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Domain configuration for EIP-712 signature verification.
///
/// These four values fix the domain separator for the lifetime of the
/// engine instance; two deployments that differ in any of them reject
/// each other's signatures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
	/// Protocol name bound into the domain separator.
	pub name: String,
	/// Protocol version bound into the domain separator.
	pub version: String,
	/// Chain/network identity.
	pub chain_id: u64,
	/// Verifying instance identity, 20-byte hex address.
	pub verifying_contract: String,
}

impl DomainConfig {
	/// Parses the configured verifying contract into an address.
	pub fn verifying_address(&self) -> Result<Address, ConfigError> {
		self.verifying_contract.parse::<Address>().map_err(|e| {
			ConfigError::Validation(format!(
				"Invalid verifying_contract '{}': {}",
				self.verifying_contract, e
			))
		})
	}
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	/// Volatile in-memory storage, for development and tests.
	Memory,
	/// File-per-key persistent storage.
	File,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which backend implementation to use.
	pub backend: StorageBackend,
	/// Directory for the file backend. Required when backend = "file".
	pub path: Option<String>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	pub enabled: bool,
	/// Host address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to listen on.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

impl Config {
	/// Loads configuration from a TOML file and validates it.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml(&contents)
	}

	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.domain.name.is_empty() {
			return Err(ConfigError::Validation(
				"domain.name must not be empty".into(),
			));
		}
		if self.domain.version.is_empty() {
			return Err(ConfigError::Validation(
				"domain.version must not be empty".into(),
			));
		}
		if self.domain.chain_id == 0 {
			return Err(ConfigError::Validation(
				"domain.chain_id must be nonzero".into(),
			));
		}
		let contract = self.domain.verifying_address()?;
		if contract == Address::ZERO {
			return Err(ConfigError::Validation(
				"domain.verifying_contract must not be the zero address".into(),
			));
		}
		if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
			return Err(ConfigError::Validation(
				"storage.path is required for the file backend".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn valid_toml() -> String {
		r#"
[domain]
name = "Permit Engine"
version = "1"
chain_id = 1
verifying_contract = "0x1111111111111111111111111111111111111111"

[storage]
backend = "memory"

[api]
enabled = true
"#
		.to_string()
	}

	#[test]
	fn test_valid_config_parses() {
		let config = Config::from_toml(&valid_toml()).unwrap();
		assert_eq!(config.domain.chain_id, 1);
		assert_eq!(config.storage.backend, StorageBackend::Memory);
		let api = config.api.unwrap();
		assert!(api.enabled);
		// Defaults apply when host/port are omitted
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let toml = valid_toml().replace("chain_id = 1", "chain_id = 0");
		let err = Config::from_toml(&toml).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_empty_name_rejected() {
		let toml = valid_toml().replace("name = \"Permit Engine\"", "name = \"\"");
		assert!(Config::from_toml(&toml).is_err());
	}

	#[test]
	fn test_malformed_contract_rejected() {
		let toml = valid_toml().replace(
			"0x1111111111111111111111111111111111111111",
			"not-an-address",
		);
		assert!(Config::from_toml(&toml).is_err());
	}

	#[test]
	fn test_zero_contract_rejected() {
		let toml = valid_toml().replace(
			"0x1111111111111111111111111111111111111111",
			"0x0000000000000000000000000000000000000000",
		);
		assert!(Config::from_toml(&toml).is_err());
	}

	#[test]
	fn test_file_backend_requires_path() {
		let toml = valid_toml().replace("backend = \"memory\"", "backend = \"file\"");
		assert!(Config::from_toml(&toml).is_err());

		let toml = valid_toml().replace(
			"backend = \"memory\"",
			"backend = \"file\"\npath = \"./data\"",
		);
		assert!(Config::from_toml(&toml).is_ok());
	}
}
