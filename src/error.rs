//! Fetcher-level error types shared by the retry engine, the handshake, and the body parser.

// self
use crate::_prelude::*;

/// Fetcher-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical fetcher error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); retried.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response was accepted by the retry engine but could not be interpreted.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),

	/// Upstream answered with a 5xx or otherwise unrecognized status; retried.
	#[error("Server responded with HTTP {status}: {body}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Upstream rejected the request with a 4xx status; never retried.
	#[error("Request rejected with HTTP {status}: {body}.")]
	Client {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Every permitted attempt failed with a retryable error.
	#[error("Gave up after {attempts} attempts.")]
	TooManyRetries {
		/// Number of attempts performed.
		attempts: u32,
		/// Error observed on the final attempt.
		#[source]
		last: Box<Error>,
	},
}
impl Error {
	const BODY_PREVIEW_LIMIT: usize = 256;

	pub(crate) fn server(status: u16, body: &[u8]) -> Self {
		Self::Server { status, body: body_preview(body, Self::BODY_PREVIEW_LIMIT) }
	}

	pub(crate) fn client(status: u16, body: &[u8]) -> Self {
		Self::Client { status, body: body_preview(body, Self::BODY_PREVIEW_LIMIT) }
	}

	/// Returns `true` when another attempt could succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transport(_) | Self::Server { .. })
	}

	/// Returns `true` when the retry bound was exhausted, i.e. the service is persistently failing.
	pub fn is_too_many_retries(&self) -> bool {
		matches!(self, Self::TooManyRetries { .. })
	}

	/// HTTP status attached to the error, looking through [`Error::TooManyRetries`].
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Server { status, .. } | Self::Client { status, .. } => Some(*status),
			Self::TooManyRetries { last, .. } => last.status(),
			_ => None,
		}
	}
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed (for example an unusable base URL).
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
}

/// Transport-level failures (network, IO, deadlines).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// A single attempt exceeded its deadline.
	#[error("Attempt timed out after {after:?}.")]
	Timeout {
		/// Configured per-attempt deadline.
		after: Duration,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Successful responses that do not carry what the protocol requires.
#[derive(Debug, ThisError)]
pub enum MalformedResponseError {
	/// Authentication succeeded but the token header was absent, empty, or not valid text.
	#[error("Authentication response is missing the `{header}` header.")]
	MissingToken {
		/// Header that was expected to carry the token.
		header: &'static str,
	},
	/// Response body could not be read as UTF-8 lines.
	#[error("Response body could not be read.")]
	UnreadableBody {
		/// Underlying read failure.
		#[source]
		source: std::io::Error,
	},
}

fn body_preview(body: &[u8], limit: usize) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.len() <= limit {
		return trimmed.to_owned();
	}

	let mut end = limit;

	while !trimmed.is_char_boundary(end) {
		end -= 1;
	}

	format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn body_preview_truncates_on_char_boundary() {
		let body = "é".repeat(200);
		let preview = body_preview(body.as_bytes(), 5);

		assert_eq!(preview, "éé...");
		assert_eq!(body_preview(b"  Bad checksum\n", 256), "Bad checksum");
	}

	#[test]
	fn status_looks_through_exhausted_retries() {
		let err =
			Error::TooManyRetries { attempts: 3, last: Box::new(Error::server(503, b"busy")) };

		assert!(err.is_too_many_retries());
		assert!(!err.is_retryable());
		assert_eq!(err.status(), Some(503));
		assert_eq!(Error::client(403, b"").status(), Some(403));
		assert!(
			Error::from(TransportError::Timeout { after: Duration::from_secs(1) }).is_retryable()
		);
	}
}
