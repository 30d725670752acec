use crate::ledger::profile::ProgramDigests;
use crate::ledger::types::{
	ADDRESS_LENGTH, DecodeError, LedgerVersion, RawTransaction, TransactionArgument,
	TransactionKind, TransactionRecord, raw_transaction::Payload, transaction_argument::ArgType,
};
use crate::rpc::SignedTransaction;

use chrono::DateTime;
use md5::{Digest, Md5};
use prost::Message;
use tracing::{debug, error};

/// Byte length of a `U64` argument.
const U64_ARGUMENT_LENGTH: usize = 8;

/// Parse serialized raw transaction bytes, failing on any wire format violation.
pub fn parse_raw_transaction(bytes: &[u8]) -> Result<RawTransaction, DecodeError> {
	let raw = RawTransaction::decode(bytes)?;

	if raw.sender_account.len() != ADDRESS_LENGTH {
		return Err(DecodeError::InvalidLength {
			field: "sender_account",
			expected: ADDRESS_LENGTH,
			actual: raw.sender_account.len(),
		});
	}

	Ok(raw)
}

/// Lowercase hex MD5 of program bytecode.
pub fn program_digest(code: &[u8]) -> String {
	hex::encode(Md5::digest(code))
}

/// Classify a program by exact digest match; recompiled variants stay `Unknown`.
pub fn classify_program(digest: &str, digests: &ProgramDigests) -> TransactionKind {
	if digest == digests.peer_to_peer {
		TransactionKind::PeerToPeer
	} else if digest == digests.mint {
		TransactionKind::Mint
	} else {
		TransactionKind::Unknown
	}
}

/// Apply program arguments to `record`. Later arguments of the same type overwrite earlier ones.
fn apply_arguments(
	record: &mut TransactionRecord,
	arguments: &[TransactionArgument],
) -> Result<(), DecodeError> {
	for argument in arguments {
		match ArgType::try_from(argument.r#type) {
			Ok(ArgType::U64) => {
				let bytes: [u8; U64_ARGUMENT_LENGTH] =
					argument.data.as_slice().try_into().map_err(|_| {
						DecodeError::InvalidLength {
							field: "u64 argument",
							expected: U64_ARGUMENT_LENGTH,
							actual: argument.data.len(),
						}
					})?;
				record.amount = Some(u64::from_le_bytes(bytes));
			}
			Ok(ArgType::Address) => record.destination = Some(hex::encode(&argument.data)),
			Ok(ArgType::String) | Ok(ArgType::ByteArray) => {}
			Err(_) => debug!(
				"Version {} has an argument of unknown type {}",
				record.version, argument.r#type
			),
		}
	}
	Ok(())
}

/// Decode one committed transaction into a record at `version`.
pub fn decode_transaction(
	version: LedgerVersion,
	transaction: &SignedTransaction,
	digests: &ProgramDigests,
) -> Result<TransactionRecord, DecodeError> {
	let raw = parse_raw_transaction(&transaction.raw_txn_bytes).map_err(|e| {
		error!("[DECODE_TRANSACTION] Version {}: {}", version, e);
		e
	})?;

	let expiration_at = i64::try_from(raw.expiration_time)
		.ok()
		.and_then(|secs| DateTime::from_timestamp(secs, 0))
		.ok_or(DecodeError::ExpirationOutOfRange(raw.expiration_time))?;

	let mut record = TransactionRecord {
		version,
		expiration_at,
		source: hex::encode(&raw.sender_account),
		destination: None,
		kind: TransactionKind::Unknown,
		amount: None,
		gas_price: raw.gas_unit_price,
		max_gas: raw.max_gas_amount,
		sequence_number: raw.sequence_number,
		public_key: hex::encode(&transaction.sender_public_key),
		program_digest: None,
	};

	match raw.payload {
		Some(Payload::Program(program)) => {
			apply_arguments(&mut record, &program.arguments)?;

			let digest = program_digest(&program.code);
			record.kind = classify_program(&digest, digests);
			record.program_digest = Some(digest);
		}
		Some(Payload::WriteSet(write_set)) => {
			debug!(
				"Version {} carries a write set with {} entries",
				version,
				write_set.write_set.len()
			);
		}
		Some(Payload::Script(_)) => debug!("Version {} carries a script", version),
		Some(Payload::Module(_)) => debug!("Version {} publishes a module", version),
		None => debug!("Version {} has no payload", version),
	}

	Ok(record)
}

/// Decode a batch whose first entry sits at `start_version`.
///
/// The batch fails as a whole on the first bad entry so that no version is ever skipped.
pub fn decode_transactions(
	start_version: LedgerVersion,
	transactions: &[SignedTransaction],
	digests: &ProgramDigests,
) -> Result<Vec<TransactionRecord>, DecodeError> {
	transactions
		.iter()
		.zip(start_version..)
		.map(|(transaction, version)| decode_transaction(version, transaction, digests))
		.collect()
}
