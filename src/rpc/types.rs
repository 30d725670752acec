//! Protobuf messages of the admission control `UpdateToLatestLedger` call
//!
//! Only the fields this crate reads are declared. Proofs, signatures and events are skipped by
//! the decoder as unknown fields.

/// Fully qualified gRPC method of the single ledger call.
pub const UPDATE_TO_LATEST_LEDGER_PATH: &str =
	"/admission_control.AdmissionControl/UpdateToLatestLedger";

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateToLatestLedgerRequest {
	#[prost(uint64, tag = "1")]
	pub client_known_version: u64,
	#[prost(message, repeated, tag = "2")]
	pub requested_items: Vec<RequestItem>,
}

/// A single typed request carried by an `UpdateToLatestLedger` call.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RequestItem {
	#[prost(oneof = "request_item::RequestedItems", tags = "1, 4")]
	pub requested_items: Option<request_item::RequestedItems>,
}

pub mod request_item {
	#[derive(Clone, PartialEq, prost::Oneof)]
	pub enum RequestedItems {
		#[prost(message, tag = "1")]
		GetAccountStateRequest(super::GetAccountStateRequest),
		#[prost(message, tag = "4")]
		GetTransactionsRequest(super::GetTransactionsRequest),
	}
}

impl RequestItem {
	/// Fetch `limit` committed transactions starting at `start_version`.
	pub fn transactions(start_version: u64, limit: u64) -> Self {
		Self {
			requested_items: Some(request_item::RequestedItems::GetTransactionsRequest(
				GetTransactionsRequest {
					start_version,
					limit,
					fetch_events: false,
				},
			)),
		}
	}

	/// Fetch the state blob of one account.
	pub fn account_state(address: &[u8]) -> Self {
		Self {
			requested_items: Some(request_item::RequestedItems::GetAccountStateRequest(
				GetAccountStateRequest {
					address: address.to_vec(),
				},
			)),
		}
	}
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountStateRequest {
	#[prost(bytes = "vec", tag = "1")]
	pub address: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetTransactionsRequest {
	#[prost(uint64, tag = "1")]
	pub start_version: u64,
	#[prost(uint64, tag = "2")]
	pub limit: u64,
	#[prost(bool, tag = "3")]
	pub fetch_events: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateToLatestLedgerResponse {
	#[prost(message, repeated, tag = "1")]
	pub response_items: Vec<ResponseItem>,
	#[prost(message, optional, tag = "2")]
	pub ledger_info_with_sigs: Option<LedgerInfoWithSignatures>,
}

/// Response counterpart of a [`RequestItem`], in request order.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseItem {
	#[prost(oneof = "response_item::ResponseItems", tags = "3, 6")]
	pub response_items: Option<response_item::ResponseItems>,
}

pub mod response_item {
	#[derive(Clone, PartialEq, prost::Oneof)]
	pub enum ResponseItems {
		#[prost(message, tag = "3")]
		GetAccountStateResponse(super::GetAccountStateResponse),
		#[prost(message, tag = "6")]
		GetTransactionsResponse(super::GetTransactionsResponse),
	}
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LedgerInfoWithSignatures {
	#[prost(message, optional, tag = "2")]
	pub ledger_info: Option<LedgerInfo>,
}

/// Ledger header returned with every response.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LedgerInfo {
	/// Latest committed version known to the node.
	#[prost(uint64, tag = "1")]
	pub version: u64,
	#[prost(uint64, tag = "6")]
	pub timestamp_usecs: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountStateResponse {
	#[prost(message, optional, tag = "1")]
	pub account_state_with_proof: Option<AccountStateWithProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountStateWithProof {
	#[prost(uint64, tag = "1")]
	pub version: u64,
	/// Absent when the account does not exist.
	#[prost(message, optional, tag = "2")]
	pub blob: Option<AccountStateBlob>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountStateBlob {
	#[prost(bytes = "vec", tag = "1")]
	pub blob: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetTransactionsResponse {
	#[prost(message, optional, tag = "1")]
	pub txn_list_with_proof: Option<TransactionListWithProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionListWithProof {
	#[prost(message, repeated, tag = "1")]
	pub transactions: Vec<SignedTransaction>,
	/// Version of `transactions[0]`, absent for an empty list.
	#[prost(message, optional, tag = "4")]
	pub first_transaction_version: Option<UInt64Value>,
}

/// `google.protobuf.UInt64Value`
#[derive(Clone, PartialEq, prost::Message)]
pub struct UInt64Value {
	#[prost(uint64, tag = "1")]
	pub value: u64,
}

/// A committed transaction as delivered by the node.
///
/// `raw_txn_bytes` is the serialized `RawTransaction` and is only parsed by the transaction
/// decoder.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SignedTransaction {
	#[prost(bytes = "vec", tag = "1")]
	pub raw_txn_bytes: Vec<u8>,
	#[prost(bytes = "vec", tag = "2")]
	pub sender_public_key: Vec<u8>,
	#[prost(bytes = "vec", tag = "3")]
	pub sender_signature: Vec<u8>,
}

/// Error types for ledger RPC calls
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("Invalid node endpoint {endpoint}: {source}")]
	InvalidEndpoint {
		endpoint: String,
		#[source]
		source: tonic::transport::Error,
	},

	#[error("Transport error: {0}")]
	TransportError(#[from] tonic::transport::Error),

	#[error("Node returned status {:?}: {}", .0.code(), .0.message())]
	StatusError(#[from] tonic::Status),

	#[error("No response within {0:?}")]
	Timeout(std::time::Duration),

	#[error("Unexpected response: {0}")]
	UnexpectedResponse(String),
}

impl RpcError {
	/// Transport, timeout and node-side failures may succeed on a later attempt;
	/// a response that does not match the request never will.
	pub fn is_retryable(&self) -> bool {
		match self {
			RpcError::TransportError(_) | RpcError::StatusError(_) | RpcError::Timeout(_) => true,
			RpcError::InvalidEndpoint { .. } | RpcError::UnexpectedResponse(_) => false,
		}
	}
}
