//! Fetch the NOC VIP list from the BADSEC service: a memoized token handshake, checksum-signed
//! requests, and a bounded retry engine that tells transient faults from fatal ones.
//!
//! The crate exposes a single orchestrator, [`Fetcher`](fetcher::Fetcher), whose
//! [`fetch`](fetcher::Fetcher::fetch) method performs the whole exchange. The CLI wrapper in
//! `src/main.rs` only serializes the returned list.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod obs;
pub mod retry;
pub mod vips;

pub use fetcher::*;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use thiserror::Error as ThisError;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(feature = "cli")] use {clap as _, color_eyre as _, serde_json as _, tracing_subscriber as _};
#[cfg(test)] use {httpmock as _, parking_lot as _};
