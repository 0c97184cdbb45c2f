//! Bounded retry engine shared by the token handshake and the protected request.
//!
//! Classification is a pure function of the HTTP status ([`classify_status`]); the driver
//! ([`RetryPolicy::run`]) only consumes its verdicts:
//!
//! - [`StatusClass::Success`] returns the response immediately.
//! - [`StatusClass::Fatal`] surfaces [`Error::Client`] without another attempt.
//! - [`StatusClass::Retry`] and retryable errors ([`Error::is_retryable`]) consume an attempt.
//!
//! Once the attempt budget is spent the driver returns [`Error::TooManyRetries`] wrapping the
//! error seen on the final attempt.

// self
use crate::{_prelude::*, error::TransportError, http::HttpResponse, obs::Stage};

/// Verdict of a status classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
	/// Hand the response to the caller.
	Success,
	/// Transient upstream fault; try again if the budget allows.
	Retry,
	/// Request-side fault; retrying cannot help.
	Fatal,
}

/// Default classifier: 2xx succeed, 4xx are fatal, everything else is retried.
pub fn classify_status(status: u16) -> StatusClass {
	match status {
		200..=299 => StatusClass::Success,
		400..=499 => StatusClass::Fatal,
		_ => StatusClass::Retry,
	}
}

/// Delay inserted between two attempts. Never applied after the final attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backoff {
	/// Retry immediately.
	#[default]
	None,
	/// Wait the same duration before every retry.
	Fixed(Duration),
	/// Wait `base * 2^(attempt - 1)`, capped at `max`.
	Exponential {
		/// Delay after the first failed attempt.
		base: Duration,
		/// Upper bound on any single delay.
		max: Duration,
	},
}
impl Backoff {
	/// Delay to wait after the failed `attempt` (1-based).
	pub fn delay(&self, attempt: u32) -> Duration {
		match *self {
			Self::None => Duration::ZERO,
			Self::Fixed(delay) => delay,
			Self::Exponential { base, max } => {
				let factor = 1_u32 << attempt.saturating_sub(1).min(16);

				base.saturating_mul(factor).min(max)
			},
		}
	}
}

/// Attempt budget, status classifier, and pacing for one logical request.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
	/// Total tries before giving up, including the first one.
	pub max_attempts: u32,
	/// Maps a response status to a [`StatusClass`].
	pub classifier: fn(u16) -> StatusClass,
	/// Delay between attempts.
	pub backoff: Backoff,
	/// Deadline applied to each attempt; an overrun counts as a retryable transport failure.
	pub attempt_timeout: Option<Duration>,
}
impl RetryPolicy {
	const DEFAULT_MAX_ATTEMPTS: u32 = 3;

	/// Overrides the attempt budget. Values below one are clamped to one.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);

		self
	}

	/// Replaces the status classifier.
	pub fn with_classifier(mut self, classifier: fn(u16) -> StatusClass) -> Self {
		self.classifier = classifier;

		self
	}

	/// Sets the delay inserted between attempts.
	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.backoff = backoff;

		self
	}

	/// Bounds every attempt by `timeout`.
	pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
		self.attempt_timeout = Some(timeout);

		self
	}

	/// Drives `attempt` until a response classifies as success, a fatal error occurs, or the
	/// budget runs out.
	///
	/// `attempt` is invoked once per try and must build a fresh request each time. Errors it
	/// returns are retried only when [`Error::is_retryable`] holds; anything else (for example a
	/// request that cannot be constructed) is returned as is.
	pub async fn run<F, Fut>(&self, stage: Stage, mut attempt: F) -> Result<HttpResponse>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<HttpResponse>>,
	{
		let max_attempts = self.max_attempts.max(1);
		let mut attempts = 0;

		loop {
			attempts += 1;

			let err = match self.bounded(attempt()).await {
				Ok(response) => {
					let status = response.status().as_u16();

					match (self.classifier)(status) {
						StatusClass::Success => return Ok(response),
						StatusClass::Fatal => {
							#[cfg(feature = "tracing")]
							tracing::warn!(%stage, status, attempts, "Request rejected; not retrying.");

							return Err(Error::client(status, response.body()));
						},
						StatusClass::Retry => Error::server(status, response.body()),
					}
				},
				Err(e) if e.is_retryable() => e,
				Err(e) => return Err(e),
			};

			if attempts >= max_attempts {
				#[cfg(feature = "tracing")]
				tracing::warn!(%stage, attempts, error = %err, "Retry budget exhausted.");

				return Err(Error::TooManyRetries { attempts, last: Box::new(err) });
			}

			let delay = self.backoff.delay(attempts);

			#[cfg(feature = "tracing")]
			tracing::debug!(
				%stage,
				attempts,
				max_attempts,
				?delay,
				error = %err,
				"Attempt failed; retrying."
			);
			#[cfg(not(feature = "tracing"))]
			let _ = (stage, err);

			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
		}
	}

	async fn bounded<Fut>(&self, fut: Fut) -> Result<HttpResponse>
	where
		Fut: Future<Output = Result<HttpResponse>>,
	{
		match self.attempt_timeout {
			Some(after) =>
				tokio::time::timeout(after, fut).await.map_err(|_| TransportError::Timeout { after })?,
			None => fut.await,
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			classifier: classify_status,
			backoff: Backoff::None,
			attempt_timeout: None,
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{collections::VecDeque, time::Instant};
	// self
	use super::*;

	fn response(status: u16) -> HttpResponse {
		::http::Response::builder()
			.status(status)
			.body(format!("status {status}").into_bytes())
			.expect("Test response should build.")
	}

	fn scripted(
		statuses: &[u16],
	) -> (VecDeque<u16>, impl Fn(&mut VecDeque<u16>) -> Result<HttpResponse>) {
		(statuses.iter().copied().collect(), |script: &mut VecDeque<u16>| {
			Ok(response(script.pop_front().unwrap_or(200)))
		})
	}

	#[test]
	fn classify_status_table() {
		assert_eq!(classify_status(200), StatusClass::Success);
		assert_eq!(classify_status(204), StatusClass::Success);
		assert_eq!(classify_status(400), StatusClass::Fatal);
		assert_eq!(classify_status(403), StatusClass::Fatal);
		assert_eq!(classify_status(499), StatusClass::Fatal);
		assert_eq!(classify_status(500), StatusClass::Retry);
		assert_eq!(classify_status(503), StatusClass::Retry);
		assert_eq!(classify_status(302), StatusClass::Retry);
		assert_eq!(classify_status(101), StatusClass::Retry);
	}

	#[test]
	fn backoff_delays_grow_and_cap() {
		let exp =
			Backoff::Exponential { base: Duration::from_millis(100), max: Duration::from_secs(1) };

		assert_eq!(Backoff::None.delay(3), Duration::ZERO);
		assert_eq!(Backoff::Fixed(Duration::from_millis(50)).delay(7), Duration::from_millis(50));
		assert_eq!(exp.delay(1), Duration::from_millis(100));
		assert_eq!(exp.delay(2), Duration::from_millis(200));
		assert_eq!(exp.delay(4), Duration::from_millis(800));
		assert_eq!(exp.delay(5), Duration::from_secs(1));
		assert_eq!(exp.delay(u32::MAX), Duration::from_secs(1));
	}

	#[test]
	fn max_attempts_is_clamped() {
		assert_eq!(RetryPolicy::default().max_attempts, 3);
		assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
	}

	#[tokio::test]
	async fn succeeds_on_third_attempt() {
		let (mut script, next) = scripted(&[500, 503]);
		let mut calls = 0;
		let response = RetryPolicy::default()
			.run(Stage::Users, || {
				calls += 1;

				let result = next(&mut script);

				async move { result }
			})
			.await
			.expect("Third attempt should succeed.");

		assert_eq!(response.status(), 200);
		assert_eq!(calls, 3);
	}

	#[tokio::test]
	async fn exhaustion_reports_too_many_retries() {
		let (mut script, next) = scripted(&[500, 500, 500, 500]);
		let mut calls = 0;
		let err = RetryPolicy::default()
			.run(Stage::Users, || {
				calls += 1;

				let result = next(&mut script);

				async move { result }
			})
			.await
			.expect_err("Persistent 500s should exhaust the budget.");

		assert_eq!(calls, 3);
		assert!(matches!(
			err,
			Error::TooManyRetries { attempts: 3, ref last }
				if matches!(**last, Error::Server { status: 500, .. })
		));
		assert_eq!(script.len(), 1);
	}

	#[tokio::test]
	async fn client_error_short_circuits() {
		let (mut script, next) = scripted(&[403, 500]);
		let mut calls = 0;
		let err = RetryPolicy::default()
			.run(Stage::Users, || {
				calls += 1;

				let result = next(&mut script);

				async move { result }
			})
			.await
			.expect_err("A 403 must not be retried.");

		assert_eq!(calls, 1);
		assert!(matches!(err, Error::Client { status: 403, ref body } if body == "status 403"));
	}

	#[tokio::test]
	async fn transport_errors_are_retried_but_config_errors_are_not() {
		let mut calls = 0;
		let recovered = RetryPolicy::default()
			.run(Stage::Auth, || {
				calls += 1;

				let result = if calls == 1 {
					Err(TransportError::network(std::io::Error::other("connection reset")).into())
				} else {
					Ok(response(200))
				};

				async move { result }
			})
			.await
			.expect("Second attempt should succeed after a transport failure.");

		assert_eq!(recovered.status(), 200);
		assert_eq!(calls, 2);

		let mut calls = 0;
		let err = RetryPolicy::default()
			.run(Stage::Auth, || {
				calls += 1;

				let result = ::http::Request::builder()
					.uri("not a uri")
					.body(Vec::<u8>::new())
					.map(|_| response(200))
					.map_err(|e| Error::from(crate::error::ConfigError::from(e)));

				async move { result }
			})
			.await
			.expect_err("Request construction failures are fatal.");

		assert_eq!(calls, 1);
		assert!(matches!(err, Error::Config(_)));
	}

	#[tokio::test]
	async fn custom_classifier_is_honored() {
		fn everything_fatal(_: u16) -> StatusClass {
			StatusClass::Fatal
		}

		let mut calls = 0;
		let err = RetryPolicy::default()
			.with_classifier(everything_fatal)
			.run(Stage::Users, || {
				calls += 1;

				async { Ok(response(503)) }
			})
			.await
			.expect_err("Classifier marks every status fatal.");

		assert_eq!(calls, 1);
		assert_eq!(err.status(), Some(503));
	}

	#[tokio::test]
	async fn attempt_timeout_counts_as_transport_failure() {
		let mut calls = 0;
		let err = RetryPolicy::default()
			.with_max_attempts(2)
			.with_attempt_timeout(Duration::from_millis(10))
			.run(Stage::Auth, || {
				calls += 1;

				std::future::pending::<Result<HttpResponse>>()
			})
			.await
			.expect_err("Hanging attempts should time out.");

		assert_eq!(calls, 2);
		assert!(matches!(
			err,
			Error::TooManyRetries { attempts: 2, ref last }
				if matches!(**last, Error::Transport(TransportError::Timeout { .. }))
		));
	}

	#[tokio::test]
	async fn fixed_backoff_waits_between_attempts_only() {
		let started = Instant::now();
		let _ = RetryPolicy::default()
			.with_backoff(Backoff::Fixed(Duration::from_millis(20)))
			.run(Stage::Users, || async { Ok(response(500)) })
			.await;
		let elapsed = started.elapsed();

		assert!(elapsed >= Duration::from_millis(40), "Two delays expected, got {elapsed:?}.");
	}
}
