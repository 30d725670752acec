use crate::ledger::{DecodeError, LedgerVersion};
use crate::rpc::RpcError;

/// Errors raised by transaction stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
}

/// Errors raised by the sync loop
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("RPC error: {0}")]
	RpcError(#[from] RpcError),

	#[error("Failed to decode batch starting at version {start_version}: {source}")]
	DecodeError {
		start_version: LedgerVersion,
		#[source]
		source: DecodeError,
	},

	#[error("Store error: {0}")]
	StoreError(#[from] StoreError),

	#[error("Giving up after {failures} consecutive failures")]
	RetriesExhausted { failures: u32 },
}
