//! Account state decoding.
//!
//! Account blobs are not parsed structurally. The account resource is found by searching the
//! hex text of the blob for the layout's marker, then read at fixed offsets:
//!
//! ```text
//! <marker> | authentication key (64 hex) | balance (16 hex) | [padding] | received events (16 hex)
//!          | sent events (16 hex) | sequence number (16 hex)
//! ```
//!
//! Integers are 8-byte little-endian. Every read is bounds-checked, so a blob with an unexpected
//! layout fails instead of yielding a partially populated state.

use crate::ledger::profile::AccountBlobLayout;
use crate::ledger::types::{
	ADDRESS_LENGTH, AccountAddress, AccountState, AccountStateError, DecodeError,
};
use crate::rpc::LedgerClient;

use tracing::{debug, info};

/// Hex chars of the authentication key.
const AUTHENTICATION_KEY_HEX_LENGTH: usize = ADDRESS_LENGTH * 2;
/// Hex chars of one little-endian `u64`.
const U64_HEX_LENGTH: usize = 16;

/// Cursor over the hex text of a blob.
struct HexReader<'a> {
	text: &'a str,
	offset: usize,
}

impl<'a> HexReader<'a> {
	fn take(&mut self, needed: usize) -> Result<&'a str, DecodeError> {
		let available = self.text.len().saturating_sub(self.offset);
		if available < needed {
			return Err(DecodeError::Truncated {
				offset: self.offset,
				needed,
				available,
			});
		}
		let slice = &self.text[self.offset..self.offset + needed];
		self.offset += needed;
		Ok(slice)
	}

	fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
		self.take(count).map(|_| ())
	}

	fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
		let mut bytes = [0u8; 8];
		hex::decode_to_slice(self.take(U64_HEX_LENGTH)?, &mut bytes)
			.map_err(DecodeError::hex("account resource"))?;
		Ok(u64::from_le_bytes(bytes))
	}
}

/// Decode the account resource of `address` from its raw state blob.
pub fn decode_account_blob(
	address: &AccountAddress,
	blob: &[u8],
	layout: AccountBlobLayout,
) -> Result<AccountState, DecodeError> {
	let text = hex::encode(blob);

	let marker = layout.marker();
	let start = text.find(marker).ok_or(DecodeError::MarkerNotFound {
		layout: layout.name(),
	})?;

	let mut reader = HexReader {
		text: &text,
		offset: start + marker.len(),
	};

	let authentication_key = reader.take(AUTHENTICATION_KEY_HEX_LENGTH)?.to_string();

	let mut fields = [0u64; 4];
	for (index, field) in fields.iter_mut().enumerate() {
		*field = reader.read_u64_le()?;
		reader.skip(layout.padding_after(index))?;
	}
	let [balance, received_event_count, sent_event_count, sequence_number] = fields;

	Ok(AccountState {
		address: hex::encode(address),
		authentication_key,
		balance,
		sent_event_count,
		received_event_count,
		sequence_number,
	})
}

/// Parse a caller-supplied hex address, requiring exactly [`ADDRESS_LENGTH`] bytes.
pub fn parse_address(address: &str) -> Result<AccountAddress, AccountStateError> {
	let bytes = hex::decode(address.trim())
		.map_err(|e| AccountStateError::InvalidAddress(format!("{}: {}", address, e)))?;

	AccountAddress::try_from(bytes.as_slice()).map_err(|_| {
		AccountStateError::InvalidAddress(format!(
			"{}: expected {} bytes, got {}",
			address,
			ADDRESS_LENGTH,
			bytes.len()
		))
	})
}

/// Answers account queries against the node. Holds no mutable state.
#[derive(Clone)]
pub struct AccountStateService {
	client: LedgerClient,
	layout: AccountBlobLayout,
}

impl AccountStateService {
	pub fn new(client: LedgerClient, layout: AccountBlobLayout) -> Self {
		Self { client, layout }
	}

	/// Fetch and decode the state of `address`.
	///
	/// Returns `Ok(None)` when the node has no blob for the account, which is distinct from an
	/// existing account with a zero balance.
	pub async fn decode_account_state(
		&self,
		address: &str,
	) -> Result<Option<AccountState>, AccountStateError> {
		let address = parse_address(address)?;

		let Some(blob) = self.client.get_account_blob(&address).await? else {
			info!("Account {} not found", hex::encode(address));
			return Ok(None);
		};

		debug!(
			"Decoding {} byte account blob for {}",
			blob.len(),
			hex::encode(address)
		);
		let state = decode_account_blob(&address, &blob, self.layout)?;
		Ok(Some(state))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::ScriptedRpc;
	use std::sync::Arc;

	const KEY: &str = "5e4ba5c1d6dc1f1a3b6c7d8e9f00112233445566778899aabbccddeeff001122";

	fn blob(layout: AccountBlobLayout, padding: &str) -> Vec<u8> {
		// The leading nibble aligns the odd-length marker to end on a byte boundary.
		let text = format!(
			"0a0{}{}0100000000000000{}020000000000000003000000000000000400000000000000ffff",
			layout.marker(),
			KEY,
			padding,
		);
		hex::decode(text).unwrap()
	}

	#[test]
	fn decodes_v1_layout() {
		let blob = blob(AccountBlobLayout::V1, "");
		let state = decode_account_blob(&[0x33; 32], &blob, AccountBlobLayout::V1).unwrap();

		assert_eq!(state.address, "33".repeat(32));
		assert_eq!(state.authentication_key, KEY);
		assert_eq!(state.balance, 1);
		assert_eq!(state.received_event_count, 2);
		assert_eq!(state.sent_event_count, 3);
		assert_eq!(state.sequence_number, 4);
	}

	#[test]
	fn decodes_v2_layout_skipping_the_flag_byte() {
		let blob = blob(AccountBlobLayout::V2, "01");
		let state = decode_account_blob(&[0x33; 32], &blob, AccountBlobLayout::V2).unwrap();

		assert_eq!(state.balance, 1);
		assert_eq!(state.received_event_count, 2);
		assert_eq!(state.sent_event_count, 3);
		assert_eq!(state.sequence_number, 4);
	}

	#[test]
	fn wrong_layout_does_not_find_the_marker() {
		let blob = blob(AccountBlobLayout::V1, "");
		let err = decode_account_blob(&[0; 32], &blob, AccountBlobLayout::V2).unwrap_err();

		assert!(matches!(err, DecodeError::MarkerNotFound { layout: "v2" }));
	}

	#[test]
	fn missing_marker_is_an_error_not_a_zero_state() {
		let err = decode_account_blob(&[0; 32], &[0; 100], AccountBlobLayout::V1).unwrap_err();

		assert!(matches!(err, DecodeError::MarkerNotFound { .. }));
	}

	#[test]
	fn truncated_resource_is_an_error() {
		let full = blob(AccountBlobLayout::V1, "");
		// Cut inside the sequence number.
		let cut = &full[..full.len() - 6];

		let err = decode_account_blob(&[0; 32], cut, AccountBlobLayout::V1).unwrap_err();
		assert!(matches!(err, DecodeError::Truncated { needed: 16, available: 8, .. }));
	}

	#[test]
	fn address_must_be_32_bytes_of_hex() {
		assert!(parse_address(&"ab".repeat(32)).is_ok());
		assert!(matches!(
			parse_address(&"ab".repeat(31)),
			Err(AccountStateError::InvalidAddress(_))
		));
		assert!(matches!(
			parse_address("not hex"),
			Err(AccountStateError::InvalidAddress(_))
		));
	}

	#[tokio::test]
	async fn invalid_address_is_rejected_before_any_rpc() {
		let rpc = Arc::new(ScriptedRpc::new());
		let client = LedgerClient::new(rpc.clone());
		let service = AccountStateService::new(client, AccountBlobLayout::V1);

		let err = service.decode_account_state("1234").await.unwrap_err();

		assert!(matches!(err, AccountStateError::InvalidAddress(_)));
		assert!(rpc.requests().is_empty());
	}

	#[tokio::test]
	async fn missing_account_is_not_found() {
		let rpc = Arc::new(ScriptedRpc::new());
		rpc.push_account_blob(None);
		let service = AccountStateService::new(LedgerClient::new(rpc), AccountBlobLayout::V1);

		let state = service.decode_account_state(&"ab".repeat(32)).await.unwrap();
		assert_eq!(state, None);
	}

	#[tokio::test]
	async fn existing_account_is_decoded() {
		let rpc = Arc::new(ScriptedRpc::new());
		rpc.push_account_blob(Some(blob(AccountBlobLayout::V2, "00")));
		let client = LedgerClient::new(rpc.clone());
		let service = AccountStateService::new(client, AccountBlobLayout::V2);

		let state = service
			.decode_account_state(&"AB".repeat(32))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(state.address, "ab".repeat(32));
		assert_eq!(state.balance, 1);
		assert_eq!(
			rpc.requests(),
			vec![vec![crate::rpc::RequestItem::account_state(&[0xab; 32])]]
		);
	}

	#[tokio::test]
	async fn transport_failure_propagates() {
		let rpc = Arc::new(ScriptedRpc::new());
		rpc.push_failure();
		let service = AccountStateService::new(LedgerClient::new(rpc), AccountBlobLayout::V1);

		let err = service.decode_account_state(&"ab".repeat(32)).await.unwrap_err();
		assert!(matches!(err, AccountStateError::RpcError(_)));
	}
}
