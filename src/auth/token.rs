//! Opaque authentication token wrapper that redacts sensitive material.

// self
use crate::_prelude::*;

/// Token issued by the `/auth` handshake.
///
/// The value is opaque and stays valid for the lifetime of the process, so there is no expiry
/// tracking. Formatters redact it to keep the secret out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);
impl AuthToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Computes the checksum header value for a request to `path`.
	pub fn checksum(&self, path: &str) -> String {
		super::request_checksum(self.expose(), path)
	}
}
impl AsRef<str> for AuthToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AuthToken").field(&"<redacted>").finish()
	}
}
impl Display for AuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
