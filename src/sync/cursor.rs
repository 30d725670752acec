//! Loop-local synchronization state.
//!
//! `SyncCursor` carries the consecutive failure count between iterations and the local version
//! observed by the last one. The local version is re-read from the store at the start of every
//! iteration and is never used to skip that read, so nothing here has to survive a restart.

use crate::ledger::LedgerVersion;
use tracing::info;

/// Number of transactions to request for a delta of `remote - local`.
///
/// Saturates to 0 if the store is somehow ahead of the node.
pub fn fetch_limit(remote: LedgerVersion, local: LedgerVersion, batch_cap: u64) -> u64 {
	remote.saturating_sub(local).min(batch_cap)
}

#[derive(Debug, Clone, Default)]
pub struct SyncCursor {
	consecutive_failures: u32,
	last_known_local_version: LedgerVersion,
	/// Transactions stored since the loop started.
	transactions_stored: u64,
	/// Stored count at the last progress log line.
	last_logged_stored: u64,
}

impl SyncCursor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn consecutive_failures(&self) -> u32 {
		self.consecutive_failures
	}

	pub fn last_known_local_version(&self) -> LedgerVersion {
		self.last_known_local_version
	}

	pub fn observe_local_version(&mut self, version: LedgerVersion) {
		self.last_known_local_version = version;
	}

	pub fn record_failure(&mut self) -> u32 {
		self.consecutive_failures = self.consecutive_failures.saturating_add(1);
		self.consecutive_failures
	}

	pub fn reset_failures(&mut self) {
		self.consecutive_failures = 0;
	}

	/// True once the failure count is strictly greater than `threshold`.
	pub fn is_exhausted(&self, threshold: u32) -> bool {
		self.consecutive_failures > threshold
	}

	pub fn record_stored(&mut self, last_version: LedgerVersion, count: u64) {
		self.last_known_local_version = last_version;
		self.transactions_stored += count;
	}

	/// Log progress every 1000 stored transactions or when forced
	pub fn log_progress(&mut self, force: bool) {
		let since_last_log = self.transactions_stored - self.last_logged_stored;
		if force || since_last_log >= 1000 {
			info!(
				"Sync progress: {} transactions stored, local ledger at version {}",
				self.transactions_stored, self.last_known_local_version
			);
			self.last_logged_stored = self.transactions_stored;
		}
	}
}
