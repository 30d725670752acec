//! Process configuration read from the environment (and `.env`, when present).

use crate::ledger::ProtocolProfile;
use crate::rpc::DEFAULT_RPC_TIMEOUT;
use crate::sync::{SyncConfig, TelegramCredentials};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value {value:?} for {key}: {reason}")]
	InvalidValue {
		key: &'static str,
		value: String,
		reason: String,
	},
	#[error("Incomplete Telegram credentials, missing {0}")]
	IncompleteTelegram(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
	pub rpc_url: String,
	pub rpc_timeout: Duration,
	pub data_dir: PathBuf,
	pub sync: SyncConfig,
	pub profile: ProtocolProfile,
	/// `None` disables chat alerts.
	pub telegram: Option<TelegramCredentials>,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		dotenv::dotenv().ok();
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let defaults = SyncConfig::default();

		let profile = match lookup("LEDGER_PROTOCOL") {
			Some(value) => ProtocolProfile::from_str(&value).map_err(|reason| {
				ConfigError::InvalidValue {
					key: "LEDGER_PROTOCOL",
					value,
					reason,
				}
			})?,
			None => ProtocolProfile::current(),
		}
		.with_digest_overrides(lookup("LEDGER_MINT_DIGEST"), lookup("LEDGER_P2P_DIGEST"));

		Ok(Config {
			rpc_url: lookup("LEDGER_RPC_URL")
				.unwrap_or_else(|| "http://ac.testnet.libra.org:8000".to_string()),
			rpc_timeout: Duration::from_secs(parse_or(
				&lookup,
				"LEDGER_RPC_TIMEOUT_SECS",
				DEFAULT_RPC_TIMEOUT.as_secs(),
			)?),
			data_dir: lookup("LEDGER_DATA_DIR")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from("./data")),
			sync: SyncConfig {
				batch_cap: parse_or(&lookup, "LEDGER_BATCH_CAP", defaults.batch_cap)?,
				failure_threshold: parse_or(
					&lookup,
					"LEDGER_FAILURE_THRESHOLD",
					defaults.failure_threshold,
				)?,
				retry_pause: Duration::from_millis(parse_or(
					&lookup,
					"LEDGER_RETRY_PAUSE_MS",
					defaults.retry_pause.as_millis() as u64,
				)?),
			},
			profile,
			telegram: telegram_credentials(&lookup)?,
		})
	}
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: std::fmt::Display,
{
	let Some(value) = lookup(key) else {
		return Ok(default);
	};
	value
		.trim()
		.parse()
		.map_err(|e: T::Err| ConfigError::InvalidValue {
			key,
			reason: e.to_string(),
			value,
		})
}

/// All three variables, or none of them.
fn telegram_credentials<F>(lookup: &F) -> Result<Option<TelegramCredentials>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let bot_key = lookup("LIBRA_BOT_KEY");
	let bot_secret = lookup("LIBRA_BOT_SECRET");
	let chat_id = lookup("LIBRA_BOT_CHAT_ID");

	match (bot_key, bot_secret, chat_id) {
		(None, None, None) => Ok(None),
		(Some(bot_key), Some(bot_secret), Some(chat_id)) => Ok(Some(TelegramCredentials {
			bot_key,
			bot_secret,
			chat_id,
		})),
		(None, _, _) => Err(ConfigError::IncompleteTelegram("LIBRA_BOT_KEY")),
		(_, None, _) => Err(ConfigError::IncompleteTelegram("LIBRA_BOT_SECRET")),
		(_, _, None) => Err(ConfigError::IncompleteTelegram("LIBRA_BOT_CHAT_ID")),
	}
}
