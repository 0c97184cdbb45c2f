//! Command-line entry point: fetch the NOC VIP list and print it as JSON.
//!
//! Logs go to stderr so stdout carries nothing but the JSON array.

// std
use std::{io::Write, time::Duration};
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
use tracing_subscriber::EnvFilter;
// self
use noclist::{
	DEFAULT_BASE_URL, Fetcher,
	retry::{Backoff, RetryPolicy},
};

/// Fetch the NOC VIP list from the BADSEC service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Endpoint the `/auth` and `/users` paths are appended to.
	#[arg(long, env = "NOCLIST_BASE_URL", default_value = DEFAULT_BASE_URL)]
	base_url: String,
	/// Total tries per request before giving up.
	#[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
	max_attempts: u32,
	/// Fixed delay between attempts, in milliseconds.
	#[arg(long, default_value_t = 0)]
	retry_delay_ms: u64,
	/// Deadline for a single attempt, in milliseconds.
	#[arg(long)]
	attempt_timeout_ms: Option<u64>,
}
impl Cli {
	fn retry_policy(&self) -> RetryPolicy {
		let backoff = match self.retry_delay_ms {
			0 => Backoff::None,
			ms => Backoff::Fixed(Duration::from_millis(ms)),
		};
		let policy =
			RetryPolicy::default().with_max_attempts(self.max_attempts).with_backoff(backoff);

		match self.attempt_timeout_ms {
			Some(ms) => policy.with_attempt_timeout(Duration::from_millis(ms)),
			None => policy,
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	let fetcher = Fetcher::new(&cli.base_url).with_retry_policy(cli.retry_policy());

	tracing::info!(base_url = fetcher.base_url(), "Fetching NOC list...");

	let vips = fetcher.fetch().await.wrap_err("Failed to fetch NOC list.")?;
	let json = serde_json::to_string(&vips).wrap_err("Failed to format JSON.")?;
	let mut stdout = std::io::stdout().lock();

	writeln!(stdout, "{json}")?;

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn flags_build_retry_policy() {
		let cli = Cli::parse_from([
			"noclist",
			"--max-attempts",
			"5",
			"--retry-delay-ms",
			"250",
			"--attempt-timeout-ms",
			"1000",
		]);
		let policy = cli.retry_policy();

		assert_eq!(policy.max_attempts, 5);
		assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_millis(250)));
		assert_eq!(policy.attempt_timeout, Some(Duration::from_secs(1)));
	}

	#[test]
	fn defaults_match_the_library() {
		let cli = Cli::try_parse_from(["noclist"]).expect("Defaults should parse.");
		let policy = cli.retry_policy();

		assert_eq!(policy.max_attempts, RetryPolicy::default().max_attempts);
		assert_eq!(policy.backoff, Backoff::None);
		assert!(policy.attempt_timeout.is_none());
		assert!(Cli::try_parse_from(["noclist", "--max-attempts", "0"]).is_err());
	}
}
