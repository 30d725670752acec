//! In-process fakes shared by unit tests.

use crate::ledger::{
	AccountAddress, LedgerVersion, Program, RawTransaction, TransactionArgument,
	TransactionRecord, raw_transaction::Payload, transaction_argument::ArgType,
};
use crate::rpc::{
	AccountStateBlob, AccountStateWithProof, GetAccountStateResponse, GetTransactionsResponse,
	LedgerInfo, LedgerInfoWithSignatures, LedgerRpc, RequestItem, ResponseItem, RpcError,
	SignedTransaction, TransactionListWithProof, UInt64Value, UpdateToLatestLedgerResponse,
	request_item::RequestedItems, response_item::ResponseItems,
};
use crate::sync::{Notifier, StoreError, TransactionStore};

use async_trait::async_trait;
use prost::Message;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub fn program_transaction(code: &[u8], arguments: Vec<TransactionArgument>) -> RawTransaction {
	RawTransaction {
		sender_account: vec![0x11; 32],
		sequence_number: 8,
		payload: Some(Payload::Program(Program {
			code: code.to_vec(),
			arguments,
			modules: Vec::new(),
		})),
		max_gas_amount: 140_000,
		gas_unit_price: 2,
		expiration_time: 1_570_000_000,
	}
}

pub fn u64_argument(value: u64) -> TransactionArgument {
	TransactionArgument {
		r#type: ArgType::U64 as i32,
		data: value.to_le_bytes().to_vec(),
	}
}

pub fn address_argument(address: AccountAddress) -> TransactionArgument {
	TransactionArgument {
		r#type: ArgType::Address as i32,
		data: address.to_vec(),
	}
}

pub fn string_argument(value: &str) -> TransactionArgument {
	TransactionArgument {
		r#type: ArgType::String as i32,
		data: value.as_bytes().to_vec(),
	}
}

pub fn signed(raw: &RawTransaction) -> SignedTransaction {
	SignedTransaction {
		raw_txn_bytes: raw.encode_to_vec(),
		sender_public_key: vec![0xee; 32],
		sender_signature: vec![0xdd; 64],
	}
}

fn unavailable() -> RpcError {
	RpcError::StatusError(tonic::Status::unavailable("node unavailable"))
}

/// `LedgerRpc` answering from a queue of scripted responses and recording every request.
///
/// An exhausted script behaves like an unreachable node.
#[derive(Default)]
pub struct ScriptedRpc {
	responses: Mutex<VecDeque<Result<UpdateToLatestLedgerResponse, RpcError>>>,
	requests: Mutex<Vec<Vec<RequestItem>>>,
}

impl ScriptedRpc {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_response(&self, response: UpdateToLatestLedgerResponse) {
		self.responses.lock().unwrap().push_back(Ok(response));
	}

	fn respond(version: u64, items: Vec<ResponseItems>) -> UpdateToLatestLedgerResponse {
		UpdateToLatestLedgerResponse {
			response_items: items
				.into_iter()
				.map(|item| ResponseItem {
					response_items: Some(item),
				})
				.collect(),
			ledger_info_with_sigs: Some(LedgerInfoWithSignatures {
				ledger_info: Some(LedgerInfo {
					version,
					timestamp_usecs: 0,
				}),
			}),
		}
	}

	/// A range response whose list claims to start at `first_version`.
	pub fn transactions_response(
		version: u64,
		first_version: u64,
		transactions: Vec<SignedTransaction>,
	) -> UpdateToLatestLedgerResponse {
		Self::range_response(version, Some(first_version), transactions)
	}

	fn range_response(
		version: u64,
		first_version: Option<u64>,
		transactions: Vec<SignedTransaction>,
	) -> UpdateToLatestLedgerResponse {
		Self::respond(
			version,
			vec![ResponseItems::GetTransactionsResponse(GetTransactionsResponse {
				txn_list_with_proof: Some(TransactionListWithProof {
					transactions,
					first_transaction_version: first_version.map(|value| UInt64Value { value }),
				}),
			})],
		)
	}

	pub fn push_latest(&self, version: u64) {
		self.push_response(Self::respond(version, Vec::new()));
	}

	pub fn push_transactions(&self, version: u64, transactions: Vec<SignedTransaction>) {
		self.push_response(Self::range_response(version, None, transactions));
	}

	pub fn push_account_blob(&self, blob: Option<Vec<u8>>) {
		self.push_response(Self::respond(
			0,
			vec![ResponseItems::GetAccountStateResponse(GetAccountStateResponse {
				account_state_with_proof: Some(AccountStateWithProof {
					version: 0,
					blob: blob.map(|blob| AccountStateBlob { blob }),
				}),
			})],
		));
	}

	pub fn push_failure(&self) {
		self.responses.lock().unwrap().push_back(Err(unavailable()));
	}

	pub fn requests(&self) -> Vec<Vec<RequestItem>> {
		self.requests.lock().unwrap().clone()
	}

	/// Number of transaction range requests received.
	pub fn range_requests(&self) -> usize {
		self.requests()
			.iter()
			.filter(|items| {
				items.iter().any(|item| {
					matches!(
						item.requested_items,
						Some(RequestedItems::GetTransactionsRequest(_))
					)
				})
			})
			.count()
	}
}

#[async_trait]
impl LedgerRpc for ScriptedRpc {
	async fn update_to_latest_ledger(
		&self,
		requested_items: Vec<RequestItem>,
	) -> Result<UpdateToLatestLedgerResponse, RpcError> {
		self.requests.lock().unwrap().push(requested_items);
		self.responses
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Err(unavailable()))
	}
}

/// In-memory `TransactionStore` that can be told to fail a given version once.
#[derive(Default)]
pub struct MemoryStore {
	records: Mutex<BTreeMap<LedgerVersion, TransactionRecord>>,
	fail_once_at: Mutex<Option<LedgerVersion>>,
	/// Versions in the order `store` was called.
	pub writes: Mutex<Vec<LedgerVersion>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_latest(version: LedgerVersion) -> Self {
		let store = Self::default();
		if version > 0 {
			let record = crate::ledger::transaction_decoder::decode_transaction(
				version,
				&signed(&program_transaction(b"seed", Vec::new())),
				&crate::ledger::ProtocolProfile::current().digests,
			)
			.unwrap();
			store.records.lock().unwrap().insert(version, record);
		}
		store
	}

	pub fn fail_once_at(&self, version: LedgerVersion) {
		*self.fail_once_at.lock().unwrap() = Some(version);
	}

	pub fn versions(&self) -> Vec<LedgerVersion> {
		self.records.lock().unwrap().keys().copied().collect()
	}
}

#[async_trait]
impl TransactionStore for MemoryStore {
	async fn latest_stored_version(&self) -> Result<LedgerVersion, StoreError> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.keys()
			.next_back()
			.copied()
			.unwrap_or(0))
	}

	async fn store(&self, record: &TransactionRecord) -> Result<(), StoreError> {
		let mut fail_once_at = self.fail_once_at.lock().unwrap();
		if *fail_once_at == Some(record.version) {
			*fail_once_at = None;
			return Err(StoreError::IoError(std::io::Error::other("disk full")));
		}
		self.writes.lock().unwrap().push(record.version);
		self.records
			.lock()
			.unwrap()
			.insert(record.version, record.clone());
		Ok(())
	}

	async fn get_version(
		&self,
		version: LedgerVersion,
	) -> Result<Option<TransactionRecord>, StoreError> {
		Ok(self.records.lock().unwrap().get(&version).cloned())
	}

	async fn list_versions(
		&self,
		offset: usize,
		limit: usize,
	) -> Result<Vec<TransactionRecord>, StoreError> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.values()
			.rev()
			.skip(offset)
			.take(limit)
			.cloned()
			.collect())
	}

	async fn list_by_address(
		&self,
		address: &str,
		offset: usize,
		limit: usize,
	) -> Result<Vec<TransactionRecord>, StoreError> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.values()
			.rev()
			.filter(|record| record.involves(address))
			.skip(offset)
			.take(limit)
			.cloned()
			.collect())
	}
}

/// `Notifier` that records alert messages.
#[derive(Default)]
pub struct RecordingNotifier {
	pub alerts: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn alert(&self, message: &str) {
		self.alerts.lock().unwrap().push(message.to_string());
	}
}
