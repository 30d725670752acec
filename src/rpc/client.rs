//!
//! gRPC client for the ledger node's admission control `UpdateToLatestLedger` call.
//!
//! The node exposes exactly one call. It accepts a batch of typed request items and answers
//! with the matching response items plus the node's current ledger header. `LedgerClient`
//! wraps any [`LedgerRpc`] transport with typed helpers for the three requests the ingester
//! needs.

use super::types::*;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// Timeout applied to every call when none is configured.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport for the single ledger RPC.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
	async fn update_to_latest_ledger(
		&self,
		requested_items: Vec<RequestItem>,
	) -> Result<UpdateToLatestLedgerResponse, RpcError>;
}

/// Ledger node client speaking gRPC to the admission control service
#[derive(Clone)]
pub struct GrpcLedgerRpc {
	/// Lazily connected channel, re-established after connection failures.
	channel: Channel,
	/// Upper bound for a whole call, connect included.
	timeout: Duration,
}

impl GrpcLedgerRpc {
	/// Create a new client. No connection is made until the first call.
	///
	/// # Arguments
	/// * `endpoint` - The node URL, e.g. `http://host:8000`.
	/// * `timeout` - Upper bound for a whole call, connect included.
	pub fn new(endpoint: String, timeout: Duration) -> Result<Self, RpcError> {
		let channel = Endpoint::from_shared(endpoint.clone())
			.map_err(|source| RpcError::InvalidEndpoint { endpoint, source })?
			.connect_timeout(timeout)
			.connect_lazy();

		Ok(Self { channel, timeout })
	}
}

#[async_trait]
impl LedgerRpc for GrpcLedgerRpc {
	async fn update_to_latest_ledger(
		&self,
		requested_items: Vec<RequestItem>,
	) -> Result<UpdateToLatestLedgerResponse, RpcError> {
		let request = UpdateToLatestLedgerRequest {
			client_known_version: 0,
			requested_items,
		};

		let call = async {
			let mut grpc = tonic::client::Grpc::new(self.channel.clone());
			grpc.ready().await?;

			let codec: ProstCodec<UpdateToLatestLedgerRequest, UpdateToLatestLedgerResponse> =
				ProstCodec::default();
			let response = grpc
				.unary(
					tonic::Request::new(request),
					PathAndQuery::from_static(UPDATE_TO_LATEST_LEDGER_PATH),
					codec,
				)
				.await?;

			Ok::<_, RpcError>(response.into_inner())
		};

		tokio::time::timeout(self.timeout, call)
			.await
			.map_err(|_| RpcError::Timeout(self.timeout))?
	}
}

/// Typed helpers over a [`LedgerRpc`] transport.
#[derive(Clone)]
pub struct LedgerClient {
	rpc: Arc<dyn LedgerRpc>,
}

impl LedgerClient {
	pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
		Self { rpc }
	}

	/// Latest version committed on the node.
	pub async fn latest_version(&self) -> Result<u64, RpcError> {
		let response = self.rpc.update_to_latest_ledger(Vec::new()).await?;

		response
			.ledger_info_with_sigs
			.and_then(|signed| signed.ledger_info)
			.map(|info| info.version)
			.ok_or_else(|| RpcError::UnexpectedResponse("missing ledger info".to_string()))
	}

	/// Fetch `limit` transactions starting at `start_version`, in version order.
	///
	/// Only called for versions the node already reported as committed, so the node must return
	/// between 1 and `limit` transactions, and when it states the first version it must be
	/// `start_version`. Anything else is an unexpected response.
	pub async fn get_transactions(
		&self,
		start_version: u64,
		limit: u64,
	) -> Result<Vec<SignedTransaction>, RpcError> {
		let response = self
			.rpc
			.update_to_latest_ledger(vec![RequestItem::transactions(start_version, limit)])
			.await?;

		let list = response
			.response_items
			.into_iter()
			.find_map(|item| match item.response_items {
				Some(response_item::ResponseItems::GetTransactionsResponse(response)) => {
					Some(response.txn_list_with_proof.unwrap_or_default())
				}
				_ => None,
			})
			.ok_or_else(|| {
				RpcError::UnexpectedResponse("missing get_transactions response item".to_string())
			})?;

		let count = list.transactions.len() as u64;
		debug!(
			"Node returned {} transactions from version {} (requested {})",
			count, start_version, limit
		);

		if count == 0 || count > limit {
			return Err(RpcError::UnexpectedResponse(format!(
				"requested {} transactions from version {}, node returned {}",
				limit, start_version, count
			)));
		}

		if let Some(first) = list.first_transaction_version {
			if first.value != start_version {
				return Err(RpcError::UnexpectedResponse(format!(
					"requested transactions from version {}, node returned them from {}",
					start_version, first.value
				)));
			}
		}

		Ok(list.transactions)
	}

	/// Fetch the raw state blob of `address`, `None` when the account does not exist.
	pub async fn get_account_blob(&self, address: &[u8]) -> Result<Option<Vec<u8>>, RpcError> {
		let response = self
			.rpc
			.update_to_latest_ledger(vec![RequestItem::account_state(address)])
			.await?;

		response
			.response_items
			.into_iter()
			.find_map(|item| match item.response_items {
				Some(response_item::ResponseItems::GetAccountStateResponse(response)) => {
					Some(
						response
							.account_state_with_proof
							.and_then(|proof| proof.blob)
							.map(|blob| blob.blob),
					)
				}
				_ => None,
			})
			.ok_or_else(|| {
				RpcError::UnexpectedResponse("missing get_account_state response item".to_string())
			})
	}
}
