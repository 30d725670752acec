//! Ledger data decoding
//!
//! - `transaction_decoder`: turns raw transaction payloads into typed, classified records.
//! - `account_decoder`: extracts the account resource from a state blob.
//! - `profile`: the protocol revision settings both decoders depend on.

/// Fixed-offset account blob decoding and the account query service
pub mod account_decoder;
/// Account layout and program digest presets
pub mod profile;
/// Raw transaction schema decoding and classification
pub mod transaction_decoder;
/// Ledger records and decode errors
pub mod types;

pub use account_decoder::AccountStateService;
pub use profile::{AccountBlobLayout, ProgramDigests, ProtocolProfile};
pub use types::*;
