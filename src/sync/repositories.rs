use crate::ledger::{LedgerVersion, TransactionRecord};
use crate::sync::StoreError;

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upper bound on records returned by one listing call.
pub const MAX_PAGE_SIZE: usize = 50;

/// Repository for decoded transaction records.
///
/// `store` must be an upsert: the sync loop retries whole batches and may hand the same
/// version over more than once.
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
	/// Highest stored version, 0 when nothing has been stored.
	async fn latest_stored_version(&self) -> Result<LedgerVersion, StoreError>;
	async fn store(&self, record: &TransactionRecord) -> Result<(), StoreError>;
	async fn get_version(
		&self,
		version: LedgerVersion,
	) -> Result<Option<TransactionRecord>, StoreError>;
	/// Most recent records first.
	async fn list_versions(
		&self,
		offset: usize,
		limit: usize,
	) -> Result<Vec<TransactionRecord>, StoreError>;
	/// Most recent records sent or received by `address` first.
	async fn list_by_address(
		&self,
		address: &str,
		offset: usize,
		limit: usize,
	) -> Result<Vec<TransactionRecord>, StoreError>;
}

/// File-based implementation of TransactionStore
///
/// One JSON file per version under `transactions/`, plus `ledger.meta.json` carrying the
/// highest stored version so that resuming does not need a directory scan.
pub struct FileTransactionStore {
	data_dir: PathBuf,
}

impl FileTransactionStore {
	pub async fn open(data_dir: PathBuf) -> Result<Self, StoreError> {
		tokio::fs::create_dir_all(data_dir.join("transactions")).await?;
		info!("Opened transaction store at {:?}", data_dir);
		Ok(Self { data_dir })
	}

	fn get_record_filename(&self, version: LedgerVersion) -> PathBuf {
		self.data_dir
			.join("transactions")
			.join(format!("transaction_{}.json", version))
	}

	fn get_metadata_filename(&self) -> PathBuf {
		self.data_dir.join("ledger.meta.json")
	}

	fn parse_version(path: &Path) -> Option<LedgerVersion> {
		path.file_name()
			.and_then(|f| f.to_str())
			.and_then(|f| f.strip_prefix("transaction_"))
			.and_then(|s| s.strip_suffix(".json"))
			.and_then(|s| s.parse::<u64>().ok())
	}

	/// Write `content` next to `path` and rename it into place.
	async fn write_atomically(path: &Path, content: &[u8]) -> Result<(), StoreError> {
		let tmp = path.with_extension("json.tmp");
		tokio::fs::write(&tmp, content).await?;
		tokio::fs::rename(&tmp, path).await?;
		Ok(())
	}

	/// All stored versions, most recent first.
	async fn stored_versions(&self) -> Result<Vec<LedgerVersion>, StoreError> {
		let mut entries = tokio::fs::read_dir(self.data_dir.join("transactions")).await?;
		let mut versions = Vec::new();

		while let Some(entry) = entries.next_entry().await? {
			if let Some(version) = Self::parse_version(&entry.path()) {
				versions.push(version);
			}
		}

		versions.sort_by_key(|version| std::cmp::Reverse(*version));
		Ok(versions)
	}

	async fn load(&self, version: LedgerVersion) -> Result<Option<TransactionRecord>, StoreError> {
		let filename = self.get_record_filename(version);
		match tokio::fs::read_to_string(&filename).await {
			Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}
}

#[async_trait::async_trait]
impl TransactionStore for FileTransactionStore {
	async fn latest_stored_version(&self) -> Result<LedgerVersion, StoreError> {
		let metadata_filename = self.get_metadata_filename();

		let meta_content = match tokio::fs::read_to_string(&metadata_filename).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(e.into()),
		};

		let metadata: serde_json::Value = serde_json::from_str(&meta_content)?;
		match metadata.get("latest_version").and_then(|v| v.as_u64()) {
			Some(version) => Ok(version),
			None => {
				warn!(
					"{:?} has no latest_version, rebuilding it from stored records",
					metadata_filename
				);
				Ok(self.stored_versions().await?.first().copied().unwrap_or(0))
			}
		}
	}

	async fn store(&self, record: &TransactionRecord) -> Result<(), StoreError> {
		let filename = self.get_record_filename(record.version);
		let content = serde_json::to_vec_pretty(record)?;
		Self::write_atomically(&filename, &content).await?;

		// Metadata only moves forward; re-storing an old version leaves it alone.
		if record.version > self.latest_stored_version().await? {
			let metadata = serde_json::json!({
				"latest_version": record.version,
				"timestamp": chrono::Utc::now().to_rfc3339(),
			});
			Self::write_atomically(
				&self.get_metadata_filename(),
				&serde_json::to_vec_pretty(&metadata)?,
			)
			.await?;
		}

		debug!("Saved transaction {} to {:?}", record.version, filename);
		Ok(())
	}

	async fn get_version(
		&self,
		version: LedgerVersion,
	) -> Result<Option<TransactionRecord>, StoreError> {
		self.load(version).await
	}

	async fn list_versions(
		&self,
		offset: usize,
		limit: usize,
	) -> Result<Vec<TransactionRecord>, StoreError> {
		let mut records = Vec::new();
		for version in self
			.stored_versions()
			.await?
			.into_iter()
			.skip(offset)
			.take(limit.min(MAX_PAGE_SIZE))
		{
			if let Some(record) = self.load(version).await? {
				records.push(record);
			}
		}
		Ok(records)
	}

	async fn list_by_address(
		&self,
		address: &str,
		offset: usize,
		limit: usize,
	) -> Result<Vec<TransactionRecord>, StoreError> {
		let limit = limit.min(MAX_PAGE_SIZE);
		let mut skipped = 0;
		let mut records = Vec::new();

		for version in self.stored_versions().await? {
			if records.len() == limit {
				break;
			}
			let Some(record) = self.load(version).await? else {
				continue;
			};
			if !record.involves(address) {
				continue;
			}
			if skipped < offset {
				skipped += 1;
				continue;
			}
			records.push(record);
		}

		Ok(records)
	}
}
