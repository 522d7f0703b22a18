//! File-based storage backend implementation for the workflow service.
//!
//! Each record lives in its own JSON file under the configured root
//! directory, with the colon-separated key mapped onto a directory path.
//! All mutations are serialized through a single async mutex, which is what
//! makes compare-and-swap atomic for this backend; the deployment model is
//! one service process per store root.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// File-based storage implementation.
pub struct FileStorage {
	/// Root directory holding all record files.
	root: PathBuf,
	/// Serializes mutations so compare-and-swap is race-free.
	write_lock: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at the given directory.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			write_lock: Mutex::new(()),
		}
	}

	/// Maps a storage key onto a file path below the root.
	///
	/// Key components are separated by ':'; each becomes one directory
	/// level, with the final component carrying a `.json` suffix. Path
	/// separators inside components are rejected up front.
	fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
		if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
			return Err(StorageError::Backend(format!("Invalid key: {}", key)));
		}
		let mut path = self.root.clone();
		let components: Vec<&str> = key.split(':').collect();
		for component in &components[..components.len() - 1] {
			path.push(component);
		}
		path.push(format!("{}.json", components[components.len() - 1]));
		Ok(path)
	}

	/// Reconstructs the storage key from a file path below the root.
	fn key_for(&self, path: &Path) -> Option<String> {
		let relative = path.strip_prefix(&self.root).ok()?;
		let mut components: Vec<String> = relative
			.components()
			.map(|c| c.as_os_str().to_string_lossy().into_owned())
			.collect();
		let last = components.pop()?;
		components.push(last.strip_suffix(".json")?.to_string());
		Some(components.join(":"))
	}

	async fn read_if_exists(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn write_atomic(&self, path: &Path, value: &[u8]) -> Result<(), StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}
		let tmp = path.with_extension("json.tmp");
		fs::write(&tmp, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp, path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.path_for(key)?;
		self.read_if_exists(&path)
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		let _guard = self.write_lock.lock().await;
		self.write_atomic(&path, &value).await
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<Vec<u8>>,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		let _guard = self.write_lock.lock().await;
		let current = self.read_if_exists(&path).await?;
		match (current, expected) {
			(None, None) => self.write_atomic(&path, &value).await,
			(Some(current), Some(expected)) if current == expected => {
				self.write_atomic(&path, &value).await
			},
			(None, Some(_)) => Err(StorageError::NotFound),
			_ => Err(StorageError::Conflict(format!(
				"concurrent update on key {}",
				key
			))),
		}
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		let _guard = self.write_lock.lock().await;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.path_for(key)?;
		Ok(fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?)
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let mut keys = Vec::new();
		let mut pending = vec![self.root.clone()];

		while let Some(dir) = pending.pop() {
			let mut entries = match fs::read_dir(&dir).await {
				Ok(entries) => entries,
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
				Err(e) => return Err(StorageError::Backend(e.to_string())),
			};
			while let Some(entry) = entries
				.next_entry()
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?
			{
				let path = entry.path();
				if path.is_dir() {
					pending.push(path);
				} else if path.extension().is_some_and(|ext| ext == "json") {
					if let Some(key) = self.key_for(&path) {
						if key.starts_with(prefix) {
							keys.push(key);
						}
					}
				}
			}
		}

		keys.sort();
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("storage_path", FieldType::String)],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory the record files live under (required)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("storage_path is required".into()))?;

	Ok(Box::new(FileStorage::new(storage_path)))
}

/// Registry entry for the file storage backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
