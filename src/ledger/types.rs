use crate::rpc::RpcError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger version: position in the ledger's total order of committed transactions.
pub type LedgerVersion = u64;

/// Byte length of an account address and of an authentication key.
pub const ADDRESS_LENGTH: usize = 32;

pub type AccountAddress = [u8; ADDRESS_LENGTH];

/// Raw transaction as signed by the sender, protobuf `types.RawTransaction`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawTransaction {
	#[prost(bytes = "vec", tag = "1")]
	pub sender_account: Vec<u8>,
	#[prost(uint64, tag = "2")]
	pub sequence_number: u64,
	#[prost(oneof = "raw_transaction::Payload", tags = "3, 4, 8, 9")]
	pub payload: Option<raw_transaction::Payload>,
	#[prost(uint64, tag = "5")]
	pub max_gas_amount: u64,
	#[prost(uint64, tag = "6")]
	pub gas_unit_price: u64,
	/// Seconds since the Unix epoch.
	#[prost(uint64, tag = "7")]
	pub expiration_time: u64,
}

pub mod raw_transaction {
	/// Execution unit carried by a raw transaction.
	#[derive(Clone, PartialEq, prost::Oneof)]
	pub enum Payload {
		#[prost(message, tag = "3")]
		Program(super::Program),
		#[prost(message, tag = "4")]
		WriteSet(super::WriteSet),
		#[prost(message, tag = "8")]
		Script(super::Script),
		#[prost(message, tag = "9")]
		Module(super::Module),
	}
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Program {
	#[prost(bytes = "vec", tag = "1")]
	pub code: Vec<u8>,
	#[prost(message, repeated, tag = "2")]
	pub arguments: Vec<TransactionArgument>,
	#[prost(bytes = "vec", repeated, tag = "3")]
	pub modules: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Script {
	#[prost(bytes = "vec", tag = "1")]
	pub code: Vec<u8>,
	#[prost(message, repeated, tag = "2")]
	pub arguments: Vec<TransactionArgument>,
}

/// Typed program argument. `data` holds the raw value: 8 little-endian bytes for `U64`,
/// the account address for `Address`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionArgument {
	#[prost(enumeration = "transaction_argument::ArgType", tag = "1")]
	pub r#type: i32,
	#[prost(bytes = "vec", tag = "2")]
	pub data: Vec<u8>,
}

pub mod transaction_argument {
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
	#[repr(i32)]
	pub enum ArgType {
		U64 = 0,
		Address = 1,
		String = 2,
		ByteArray = 3,
	}
}

/// Direct state writes, used by genesis and system transactions.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteSet {
	#[prost(message, repeated, tag = "1")]
	pub write_set: Vec<WriteOp>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteOp {
	#[prost(message, optional, tag = "1")]
	pub access_path: Option<AccessPath>,
	#[prost(bytes = "vec", tag = "2")]
	pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccessPath {
	#[prost(bytes = "vec", tag = "1")]
	pub address: Vec<u8>,
	#[prost(bytes = "vec", tag = "2")]
	pub path: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Module {
	#[prost(bytes = "vec", tag = "1")]
	pub code: Vec<u8>,
}

/// Classification of a program-carrying transaction by its bytecode digest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionKind {
	#[serde(rename = "mint_transaction")]
	Mint,
	#[serde(rename = "peer_to_peer_transaction")]
	PeerToPeer,
	#[serde(rename = "unknown")]
	Unknown,
}

/// Decoded ledger transaction, the unit handed to the transaction store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
	pub version: LedgerVersion,
	pub expiration_at: DateTime<Utc>,
	/// Hex-encoded sender address.
	pub source: String,
	/// Hex-encoded recipient, only when the program carries an address argument.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub destination: Option<String>,
	#[serde(rename = "type")]
	pub kind: TransactionKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<u64>,
	pub gas_price: u64,
	pub max_gas: u64,
	pub sequence_number: u64,
	/// Hex-encoded sender public key.
	pub public_key: String,
	/// Lowercase hex MD5 of the program bytecode. Only used for classification.
	#[serde(skip)]
	pub program_digest: Option<String>,
}

impl TransactionRecord {
	/// Whether `address` (hex) sent or received this transaction.
	pub fn involves(&self, address: &str) -> bool {
		self.source.eq_ignore_ascii_case(address)
			|| self
				.destination
				.as_deref()
				.is_some_and(|destination| destination.eq_ignore_ascii_case(address))
	}
}

/// Snapshot of one account, decoded from its state blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountState {
	pub address: String,
	pub authentication_key: String,
	pub balance: u64,
	pub sent_event_count: u64,
	pub received_event_count: u64,
	pub sequence_number: u64,
}

/// Errors raised while decoding transactions and account blobs
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("Invalid hex in {field}: {source}")]
	HexError {
		field: &'static str,
		#[source]
		source: hex::FromHexError,
	},

	#[error("Raw transaction does not match schema: {0}")]
	SchemaError(#[from] prost::DecodeError),

	#[error("Invalid {field}: expected {expected} bytes, got {actual}")]
	InvalidLength {
		field: &'static str,
		expected: usize,
		actual: usize,
	},

	#[error("Expiration time {0} is outside the representable range")]
	ExpirationOutOfRange(u64),

	#[error("Account blob does not contain the {layout} resource marker")]
	MarkerNotFound { layout: &'static str },

	#[error("Account blob truncated at offset {offset}: need {needed} hex chars, {available} left")]
	Truncated {
		offset: usize,
		needed: usize,
		available: usize,
	},
}

impl DecodeError {
	pub fn hex(field: &'static str) -> impl FnOnce(hex::FromHexError) -> Self {
		move |source| DecodeError::HexError { field, source }
	}
}

/// Errors surfaced by account state queries
#[derive(Debug, thiserror::Error)]
pub enum AccountStateError {
	#[error("Invalid account address: {0}")]
	InvalidAddress(String),

	#[error("RPC error: {0}")]
	RpcError(#[from] RpcError),

	#[error("Decode error: {0}")]
	DecodeError(#[from] DecodeError),
}
