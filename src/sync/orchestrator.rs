//! Ledger sync orchestrator.
//!
//! This module defines the `SyncOrchestrator`, which keeps the transaction store in step with the
//! ledger node. Each iteration:
//!
//! 1. reads the node's latest version,
//! 2. reads the highest version already stored,
//! 3. requests the delta starting right after it, capped at the batch size,
//! 4. decodes the whole batch, then stores it one record at a time in version order.
//!
//! Any failure abandons the iteration without touching the cursor's local version; the next
//! iteration re-reads it from the store, so a partially stored batch simply resumes where it
//! stopped. Failures are counted across iterations and reset by any successful iteration. When
//! the count exceeds the configured threshold the loop sends one alert and stops.

use crate::ledger::ProgramDigests;
use crate::ledger::transaction_decoder::decode_transactions;
use crate::rpc::LedgerClient;
use crate::sync::{
	Notifier, SyncError, TransactionStore,
	cursor::{SyncCursor, fetch_limit},
};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Sync loop settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Maximum transactions requested per iteration.
	pub batch_cap: u64,
	/// Consecutive failures tolerated before halting.
	pub failure_threshold: u32,
	/// Pause after a failure or when there is nothing new.
	pub retry_pause: Duration,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			batch_cap: 1000,
			failure_threshold: 10,
			retry_pause: Duration::from_millis(250),
		}
	}
}

/// Result of one successful iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
	/// The store already holds the node's latest version.
	UpToDate,
	/// `count` records were stored, covering `first..=last`.
	Synced { first: u64, last: u64, count: u64 },
}

pub struct SyncOrchestrator {
	client: LedgerClient,
	store: Arc<dyn TransactionStore>,
	notifier: Arc<dyn Notifier>,
	digests: ProgramDigests,
	config: SyncConfig,
	cursor: SyncCursor,
}

impl SyncOrchestrator {
	pub fn new(
		client: LedgerClient,
		store: Arc<dyn TransactionStore>,
		notifier: Arc<dyn Notifier>,
		digests: ProgramDigests,
		config: SyncConfig,
	) -> Self {
		Self {
			client,
			store,
			notifier,
			digests,
			config,
			cursor: SyncCursor::new(),
		}
	}

	/// Run one iteration without applying the failure policy.
	pub async fn run_iteration(&mut self) -> Result<IterationOutcome, SyncError> {
		let remote_latest = self.client.latest_version().await?;
		let local_latest = self.store.latest_stored_version().await?;
		self.cursor.observe_local_version(local_latest);

		if local_latest > remote_latest {
			warn!(
				"Store is ahead of the node (local {}, remote {}), waiting for the node",
				local_latest, remote_latest
			);
		}

		let limit = fetch_limit(remote_latest, local_latest, self.config.batch_cap);
		if limit == 0 {
			debug!("Up to date at version {}", local_latest);
			return Ok(IterationOutcome::UpToDate);
		}

		let start_version = local_latest + 1;
		debug!(
			"Fetching {} transactions from version {} (node at {})",
			limit, start_version, remote_latest
		);
		// Between 1 and `limit` transactions, or an error.
		let transactions = self.client.get_transactions(start_version, limit).await?;

		let records = decode_transactions(start_version, &transactions, &self.digests)
			.map_err(|source| SyncError::DecodeError {
				start_version,
				source,
			})?;

		for record in &records {
			self.store.store(record).await?;
			info!("Stored transaction at version {}", record.version);
		}

		let count = records.len() as u64;
		let last = start_version + count - 1;
		self.cursor.record_stored(last, count);

		Ok(IterationOutcome::Synced {
			first: start_version,
			last,
			count,
		})
	}

	/// Synchronize until the failure threshold is exceeded.
	///
	/// Only returns on that terminal condition, after the alert has been sent.
	pub async fn run(&mut self) -> Result<(), SyncError> {
		info!(
			"Starting ledger sync (batch cap {}, failure threshold {})",
			self.config.batch_cap, self.config.failure_threshold
		);

		loop {
			if self.cursor.is_exhausted(self.config.failure_threshold) {
				let failures = self.cursor.consecutive_failures();
				error!("Ledger sync failed {} times in a row, halting", failures);
				self.cursor.log_progress(true);
				self.notifier
					.alert(&format!(
						"ledger sync failed {} times in a row, last stored version {}",
						failures,
						self.cursor.last_known_local_version()
					))
					.await;
				return Err(SyncError::RetriesExhausted { failures });
			}

			match self.run_iteration().await {
				Ok(IterationOutcome::UpToDate) => {
					self.cursor.reset_failures();
					self.pause().await;
				}
				Ok(IterationOutcome::Synced { first, last, count }) => {
					self.cursor.reset_failures();
					debug!("Synced {} transactions ({}..={})", count, first, last);
					self.cursor.log_progress(false);
				}
				Err(e) => {
					let failures = self.cursor.record_failure();
					match &e {
						SyncError::RpcError(rpc) if !rpc.is_retryable() => {
							error!("Node sent a malformed response ({} in a row): {}", failures, e)
						}
						_ => warn!("Sync iteration failed ({} in a row): {}", failures, e),
					}
					self.pause().await;
				}
			}
		}
	}

	async fn pause(&self) {
		tokio::time::sleep(self.config.retry_pause).await;
	}
}
