//! File-based storage backend implementation for the permit engine.
//!
//! This module provides a persistent implementation of the StorageInterface
//! trait, storing each key as one file under a configured directory. Keys
//! are hex-encoded to produce filesystem-safe names, and writes go through
//! a temporary file plus rename so a crash never leaves a half-written
//! value behind.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// File-based storage implementation.
///
/// Values persist across process restarts; this is the backend the nonce
/// ledger and allowance table use in production.
pub struct FileStorage {
	/// Directory that holds one file per key.
	storage_dir: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at the given directory.
	///
	/// The directory is created on first write if it does not exist.
	pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
		Self {
			storage_dir: storage_dir.into(),
		}
	}

	/// Maps a storage key to its backing file path.
	///
	/// Keys are hex-encoded so separators and other unsafe characters in
	/// composite keys ("namespace:id") cannot escape the storage directory.
	fn file_path(&self, key: &str) -> PathBuf {
		self.storage_dir.join(format!("{}.json", hex::encode(key)))
	}

	/// Ensures the storage directory exists.
	async fn ensure_dir(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.storage_dir)
			.await
			.map_err(|e| StorageError::Backend(format!("Failed to create storage dir: {}", e)))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);
		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => {
				tracing::warn!(key, error = %e, "Read failed");
				Err(StorageError::Backend(format!("Read failed: {}", e)))
			}
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.ensure_dir().await?;

		let path = self.file_path(key);
		let tmp = path.with_extension("tmp");

		fs::write(&tmp, &value).await.map_err(|e| {
			tracing::warn!(key, error = %e, "Write failed");
			StorageError::Backend(format!("Write failed: {}", e))
		})?;
		fs::rename(&tmp, &path).await.map_err(|e| {
			tracing::warn!(key, error = %e, "Rename failed");
			StorageError::Backend(format!("Rename failed: {}", e))
		})?;

		tracing::debug!(key, len = value.len(), "Stored value");
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);
		match fs::remove_file(&path).await {
			Ok(()) => {
				tracing::debug!(key, "Deleted value");
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => {
				tracing::warn!(key, error = %e, "Delete failed");
				Err(StorageError::Backend(format!("Delete failed: {}", e)))
			}
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(&self.file_path(key))
			.await
			.map_err(|e| StorageError::Backend(format!("Stat failed: {}", e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_persist_and_reload() {
		let dir = TempDir::new().unwrap();

		let storage = FileStorage::new(dir.path());
		storage
			.set_bytes("nonces:0xabc", b"{\"counter\":3}".to_vec())
			.await
			.unwrap();

		// A fresh instance over the same directory sees the value.
		let reopened = FileStorage::new(dir.path());
		let bytes = reopened.get_bytes("nonces:0xabc").await.unwrap();
		assert_eq!(bytes, b"{\"counter\":3}".to_vec());
	}

	#[tokio::test]
	async fn test_missing_key() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path());

		assert!(!storage.exists("nope").await.unwrap());
		assert!(matches!(
			storage.get_bytes("nope").await,
			Err(StorageError::NotFound)
		));
		// Deleting a missing key is not an error
		storage.delete("nope").await.unwrap();
	}

	#[tokio::test]
	async fn test_keys_with_separators() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path());

		// Composite keys must not be interpreted as paths
		let key = "allowances:0xaaa:0xbbb";
		storage.set_bytes(key, b"42".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"42".to_vec());
	}
}
