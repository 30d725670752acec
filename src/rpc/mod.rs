//! Ledger node RPC integration
//!
//! This module provides the transport and wire types for the node's single
//! `UpdateToLatestLedger` call, which carries batched transaction-range and
//! account-state requests and always answers with the node's latest ledger version.

/// gRPC transport and typed request helpers
mod client;
/// Protobuf messages and error types
mod types;

pub use client::{DEFAULT_RPC_TIMEOUT, GrpcLedgerRpc, LedgerClient, LedgerRpc};
pub use types::*;
