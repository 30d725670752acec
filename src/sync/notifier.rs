//!
//! Outbound alerts for the sync loop.
//!
//! Alerts are best effort: delivery failures are logged and never reach the caller.

use async_trait::async_trait;
use backoff::{ExponentialBackoff, future::retry};
use std::time::Duration;
use tracing::{error, info, warn};

/// Longest time spent retrying one alert.
const MAX_ALERT_ELAPSED: Duration = Duration::from_secs(30);

/// Receiver of operator alerts
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn alert(&self, message: &str);
}

/// Logs alerts when no chat credentials are configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
	async fn alert(&self, message: &str) {
		error!("ALERT: {}", message);
	}
}

/// Telegram Bot API credentials.
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
	pub bot_key: String,
	pub bot_secret: String,
	pub chat_id: String,
}

/// Public Bot API host.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends alerts as Telegram chat messages.
///
/// The request URL embeds the bot secret, so errors are stripped of their URL before they are
/// logged.
pub struct TelegramNotifier {
	http_client: reqwest::Client,
	url: String,
	chat_id: String,
}

impl TelegramNotifier {
	pub fn new(credentials: TelegramCredentials, api_base: &str) -> Result<Self, reqwest::Error> {
		let http_client = reqwest::Client::builder()
			.timeout(Duration::from_secs(10))
			.build()?;

		Ok(Self {
			http_client,
			url: format!(
				"{}/{}:{}/sendMessage",
				api_base.trim_end_matches('/'),
				credentials.bot_key,
				credentials.bot_secret
			),
			chat_id: credentials.chat_id,
		})
	}

	/// One `sendMessage` attempt. Returned errors carry no URL.
	async fn send_once(&self, message: &str) -> Result<(), reqwest::Error> {
		self.http_client
			.get(&self.url)
			.query(&[
				("chat_id", self.chat_id.as_str()),
				("parse_mode", "markdown"),
				("text", message),
			])
			.send()
			.await
			.and_then(|resp| resp.error_for_status())
			.map(|_| ())
			.map_err(|e| e.without_url())
	}
}

/// Rejected requests other than rate limiting will be rejected again.
fn is_permanent(e: &reqwest::Error) -> bool {
	e.status().is_some_and(|status| {
		status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS
	})
}

#[async_trait]
impl Notifier for TelegramNotifier {
	async fn alert(&self, message: &str) {
		let policy = ExponentialBackoff {
			max_elapsed_time: Some(MAX_ALERT_ELAPSED),
			..ExponentialBackoff::default()
		};

		let result = retry(policy, || async {
			self.send_once(message).await.map_err(|e| {
				if is_permanent(&e) {
					backoff::Error::permanent(e)
				} else {
					warn!("Alert send error: {}", e);
					backoff::Error::transient(e)
				}
			})
		})
		.await;

		match result {
			Ok(()) => info!("Alert delivered to chat {}", self.chat_id),
			Err(e) => error!("Failed to deliver alert '{}': {}", message, e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn credentials() -> TelegramCredentials {
		TelegramCredentials {
			bot_key: "4242".to_string(),
			bot_secret: "s3cr3t".to_string(),
			chat_id: "-100".to_string(),
		}
	}

	#[tokio::test]
	async fn alert_is_sent_as_a_markdown_chat_message() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/4242:s3cr3t/sendMessage"))
			.and(query_param("chat_id", "-100"))
			.and(query_param("parse_mode", "markdown"))
			.and(query_param("text", "*sync stopped* at 12"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let notifier = TelegramNotifier::new(credentials(), &server.uri()).unwrap();
		notifier.alert("*sync stopped* at 12").await;
	}

	#[tokio::test]
	async fn server_errors_are_retried() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(502))
			.up_to_n_times(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;

		let notifier = TelegramNotifier::new(credentials(), &server.uri()).unwrap();
		notifier.alert("down").await;

		let requests = server.received_requests().await.unwrap();
		assert_eq!(requests.len(), 2);
	}

	#[tokio::test]
	async fn rejected_alerts_are_not_retried() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(401))
			.expect(1)
			.mount(&server)
			.await;

		let notifier = TelegramNotifier::new(credentials(), &server.uri()).unwrap();
		notifier.alert("down").await;
	}

	#[tokio::test]
	async fn send_errors_do_not_leak_the_bot_secret() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let notifier = TelegramNotifier::new(credentials(), &server.uri()).unwrap();
		let err = notifier.send_once("down").await.unwrap_err();

		assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
		assert!(err.url().is_none());
		assert!(!err.to_string().contains("s3cr3t"));
		assert!(!format!("{:?}", err).contains("s3cr3t"));
	}
}
