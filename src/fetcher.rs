//! Fetch orchestration: token handshake followed by the checksum-signed list request.
//!
//! A fetch moves `Unauthenticated → Authenticated → Listed`. Either transition can fail, and a
//! failure aborts the sequence; the list request is never sent without a token. The token is
//! memoized behind an async mutex held for the whole check-and-acquire sequence, so concurrent
//! callers share a single `/auth` round-trip.

// self
use crate::{
	_prelude::*,
	auth::{AuthToken, CHECKSUM_HEADER},
	error::{ConfigError, MalformedResponseError, TransportError},
	http::{HttpRequest, HttpResponse, HttpTransport},
	obs::{self, Stage, StageOutcome, StageSpan},
	retry::RetryPolicy,
	vips,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Endpoint used when the caller does not override it.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8888";
/// Path of the token handshake.
pub const AUTH_PATH: &str = "/auth";
/// Path of the protected VIP list.
pub const USERS_PATH: &str = "/users";
/// Response header carrying the token issued by [`AUTH_PATH`].
pub const TOKEN_HEADER: &str = "Badsec-Authentication-Token";

#[cfg(feature = "reqwest")]
/// Fetcher specialized for the crate's default reqwest transport.
pub type ReqwestFetcher = Fetcher<ReqwestHttpClient>;

/// Retrieves the VIP list from a single BADSEC endpoint.
///
/// Construct one per process and share it (for example behind an `Arc`) across tasks; the token
/// is acquired at most once per instance and never replaced.
pub struct Fetcher<C>
where
	C: ?Sized + HttpTransport,
{
	/// HTTP transport used for every outbound request.
	pub http_client: Arc<C>,
	/// Retry policy applied to both the handshake and the list request.
	pub retry: RetryPolicy,
	base_url: String,
	token: AsyncMutex<Option<AuthToken>>,
}
impl<C> Fetcher<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a fetcher that reuses the caller-provided transport.
	///
	/// `base_url` is used verbatim as a prefix; request paths are appended to it.
	pub fn with_http_client(base_url: impl Into<String>, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			retry: RetryPolicy::default(),
			base_url: base_url.into(),
			token: AsyncMutex::new(None),
		}
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Endpoint prefix every request is sent to.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Returns the memoized token without touching the network.
	pub async fn token(&self) -> Option<AuthToken> {
		self.token.lock().await.clone()
	}

	/// Authenticates if needed, then returns the VIP list in wire order.
	pub async fn fetch(&self) -> Result<Vec<String>> {
		let token = self.ensure_token().await?;

		self.list_users(&token).await
	}

	/// Returns the memoized token, performing the `/auth` handshake on first use.
	///
	/// A 2xx response without a usable [`TOKEN_HEADER`] fails with
	/// [`MalformedResponseError::MissingToken`] and leaves the fetcher unauthenticated.
	pub async fn ensure_token(&self) -> Result<AuthToken> {
		let mut slot = self.token.lock().await;

		if let Some(token) = slot.as_ref() {
			return Ok(token.clone());
		}

		let token = observed(Stage::Auth, async {
			let response = self.get(Stage::Auth, AUTH_PATH, None).await?;

			token_from(&response)
		})
		.await?;

		#[cfg(feature = "tracing")]
		tracing::debug!("Authentication token acquired.");

		*slot = Some(token.clone());

		Ok(token)
	}

	/// Requests the VIP list signed with `token`.
	pub async fn list_users(&self, token: &AuthToken) -> Result<Vec<String>> {
		observed(Stage::Users, async {
			let checksum = token.checksum(USERS_PATH);
			let response = self.get(Stage::Users, USERS_PATH, Some(&checksum)).await?;
			let vips = vips::parse_vips(response.body().as_slice())?;

			#[cfg(feature = "tracing")]
			tracing::debug!(count = vips.len(), "VIP list received.");

			Ok(vips)
		})
		.await
	}

	async fn get(&self, stage: Stage, path: &str, checksum: Option<&str>) -> Result<HttpResponse> {
		let url = format!("{}{path}", self.base_url);

		self.retry
			.run(stage, || {
				let request = build_get(&url, checksum);
				let client = &self.http_client;

				async move {
					let response =
						client.send(request?).await.map_err(TransportError::network)?;

					Ok::<_, Error>(response)
				}
			})
			.await
	}
}
#[cfg(feature = "reqwest")]
impl Fetcher<ReqwestHttpClient> {
	/// Creates a fetcher backed by a default reqwest client.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self::with_http_client(base_url, ReqwestHttpClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl Default for Fetcher<ReqwestHttpClient> {
	fn default() -> Self {
		Self::new(DEFAULT_BASE_URL)
	}
}
impl<C> Debug for Fetcher<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Fetcher")
			.field("base_url", &self.base_url)
			.field("retry", &self.retry)
			.field("token_set", &self.token.try_lock().map(|slot| slot.is_some()))
			.finish()
	}
}

async fn observed<T>(stage: Stage, fut: impl Future<Output = Result<T>>) -> Result<T> {
	let span = StageSpan::new(stage);

	obs::record_stage_outcome(stage, StageOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_stage_outcome(stage, StageOutcome::Success),
		Err(_) => obs::record_stage_outcome(stage, StageOutcome::Failure),
	}

	result
}

fn build_get(url: &str, checksum: Option<&str>) -> Result<HttpRequest> {
	let mut builder = ::http::Request::get(url);

	if let Some(checksum) = checksum {
		builder = builder.header(CHECKSUM_HEADER, checksum);
	}

	builder.body(Vec::new()).map_err(|e| ConfigError::from(e).into())
}

fn token_from(response: &HttpResponse) -> Result<AuthToken> {
	response
		.headers()
		.get(TOKEN_HEADER)
		.and_then(|value| value.to_str().ok())
		.filter(|value| !value.is_empty())
		.map(AuthToken::new)
		.ok_or_else(|| MalformedResponseError::MissingToken { header: TOKEN_HEADER }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn get_requests_carry_checksum_only_when_signed() {
		let plain = build_get("http://localhost:8888/auth", None).expect("Request should build.");
		let signed = build_get("http://localhost:8888/users", Some("abc"))
			.expect("Signed request should build.");

		assert_eq!(plain.method(), &::http::Method::GET);
		assert!(plain.headers().get(CHECKSUM_HEADER).is_none());
		assert_eq!(signed.uri().path(), USERS_PATH);
		assert_eq!(
			signed.headers().get(CHECKSUM_HEADER).and_then(|value| value.to_str().ok()),
			Some("abc")
		);
	}

	#[test]
	fn unusable_base_url_is_a_config_error() {
		let err = build_get("not a url/auth", None).expect_err("Spaces are not valid in a URI.");

		assert!(matches!(err, Error::Config(ConfigError::HttpRequest(_))));
	}

	#[test]
	fn token_header_must_be_present_and_non_empty() {
		let with_token = ::http::Response::builder()
			.header(TOKEN_HEADER, "12345")
			.body(Vec::new())
			.expect("Response should build.");
		let empty = ::http::Response::builder()
			.header(TOKEN_HEADER, "")
			.body(Vec::new())
			.expect("Response should build.");
		let missing = HttpResponse::new(Vec::new());

		assert_eq!(token_from(&with_token).expect("Token should be extracted.").expose(), "12345");

		for response in [empty, missing] {
			assert!(matches!(
				token_from(&response),
				Err(Error::MalformedResponse(MalformedResponseError::MissingToken {
					header: TOKEN_HEADER
				}))
			));
		}
	}
}
