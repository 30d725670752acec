//! Ledger Synchronization Module
//!
//! This module keeps a local transaction store in step with the ledger node:
//!
//! - `orchestrator`: the poll loop. It computes the delta between the node and the store,
//!   fetches and decodes it, and applies the failure policy.
//! - `cursor`: loop-local state (failure count, last observed local version) and the fetch
//!   limit rule.
//! - `repositories`: the transaction store contract and its file-based implementation.
//! - `notifier`: best-effort operator alerts sent when the loop gives up.

/// Failure counter and fetch limit
pub mod cursor;
/// Operator alerts
pub mod notifier;
/// Main coordinator for the sync process
pub mod orchestrator;
/// Transaction record persistence
pub mod repositories;
/// Store and sync error types
pub mod types;

pub use notifier::{
	LogNotifier, Notifier, TELEGRAM_API_BASE, TelegramCredentials, TelegramNotifier,
};
pub use orchestrator::*;
pub use repositories::{FileTransactionStore, MAX_PAGE_SIZE, TransactionStore};
pub use types::*;
