//! Transport primitives for the BADSEC exchanges.
//!
//! The fetcher depends on a single capability: send one [`HttpRequest`] and resolve to an
//! [`HttpResponse`] or a transport error. [`HttpTransport`] captures exactly that so tests and
//! downstream crates can inject their own client without touching the retry or handshake logic.
//! Bodies are fully buffered; the protected resource is a short newline-delimited list.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::{Client as ReqwestClient, Error as ReqwestError};
// self
use crate::_prelude::*;

/// Request type handed to [`HttpTransport::send`].
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Buffered response type returned by [`HttpTransport::send`].
pub type HttpResponse = ::http::Response<Vec<u8>>;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a, Error> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one request at a time.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared behind an
/// `Arc` by concurrent `fetch` calls. Any status code, including 4xx and 5xx, is a successful
/// send; only connection-level failures belong in [`HttpTransport::TransportError`]. The retry
/// engine decides what a status means.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and buffers the full response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok::<_, ReqwestError>(response_new)
		})
	}
}
