mod config;
mod ledger;
mod rpc;
mod sync;
#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{Config, ConfigError};
use crate::ledger::{AccountStateError, AccountStateService, LedgerVersion};
use crate::rpc::{GrpcLedgerRpc, LedgerClient, RpcError};
use crate::sync::{
	FileTransactionStore, LogNotifier, MAX_PAGE_SIZE, Notifier, StoreError, SyncError,
	SyncOrchestrator, TELEGRAM_API_BASE, TelegramNotifier, TransactionStore,
};

/// Ledger transaction ingester and account state reader
#[derive(Parser)]
#[command(name = "ledger-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Ingest transactions from the node until the failure threshold is exceeded (default)
	Sync,

	/// Fetch and decode the current state of an account
	Account {
		/// Account address, 64 hex chars
		#[arg(value_name = "ADDRESS")]
		address: String,
	},

	/// Print one stored transaction
	Show {
		#[arg(value_name = "VERSION")]
		version: LedgerVersion,
	},

	/// List stored transactions, most recent first
	Recent {
		#[arg(long, default_value = "0")]
		offset: usize,

		#[arg(long, default_value = "10")]
		limit: usize,

		/// Only transactions sent or received by this address
		#[arg(long)]
		address: Option<String>,
	},
}

#[derive(Debug, thiserror::Error)]
enum CliError {
	#[error("Configuration error: {0}")]
	ConfigError(#[from] ConfigError),
	#[error("RPC error: {0}")]
	RpcError(#[from] RpcError),
	#[error("Store error: {0}")]
	StoreError(#[from] StoreError),
	#[error("Sync error: {0}")]
	SyncError(#[from] SyncError),
	#[error("Account state error: {0}")]
	AccountStateError(#[from] AccountStateError),
	#[error("Output error: {0}")]
	JsonError(#[from] serde_json::Error),
	#[error("Alert client error: {0}")]
	NotifierError(#[from] reqwest::Error),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let cli = Cli::parse();

	if let Err(e) = run(cli.command.unwrap_or(Commands::Sync)).await {
		error!("{}", e);
		std::process::exit(1);
	}
}

async fn run(command: Commands) -> Result<(), CliError> {
	let config = Config::from_env()?;
	info!("Using protocol profile {}", config.profile);

	let rpc = GrpcLedgerRpc::new(config.rpc_url.clone(), config.rpc_timeout)?;
	let client = LedgerClient::new(Arc::new(rpc));
	info!("Created ledger client for {}", config.rpc_url);

	match command {
		Commands::Sync => {
			let store = FileTransactionStore::open(config.data_dir.clone()).await?;
			let notifier: Arc<dyn Notifier> = match config.telegram.clone() {
				Some(credentials) => {
					Arc::new(TelegramNotifier::new(credentials, TELEGRAM_API_BASE)?)
				}
				None => {
					info!("No Telegram credentials configured, alerts go to the log");
					Arc::new(LogNotifier)
				}
			};

			let mut orchestrator = SyncOrchestrator::new(
				client,
				Arc::new(store),
				notifier,
				config.profile.digests.clone(),
				config.sync.clone(),
			);
			orchestrator.run().await?;
		}
		Commands::Account { address } => {
			let service = AccountStateService::new(client, config.profile.layout);
			match service.decode_account_state(&address).await? {
				Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
				None => println!("not found"),
			}
		}
		Commands::Show { version } => {
			let store = FileTransactionStore::open(config.data_dir.clone()).await?;
			match store.get_version(version).await? {
				Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
				None => println!("not found"),
			}
		}
		Commands::Recent {
			offset,
			limit,
			address,
		} => {
			let store = FileTransactionStore::open(config.data_dir.clone()).await?;
			let limit = limit.min(MAX_PAGE_SIZE);
			let records = match address {
				Some(address) => store.list_by_address(&address, offset, limit).await?,
				None => store.list_versions(offset, limit).await?,
			};
			println!("{}", serde_json::to_string_pretty(&records)?);
		}
	}

	Ok(())
}
