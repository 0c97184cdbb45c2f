//! Request checksum binding a request path to the current token.

// crates.io
use sha2::{Digest, Sha256};

/// Request header carrying the checksum on protected requests.
pub const CHECKSUM_HEADER: &str = "X-Request-Checksum";

/// Returns the lowercase hex SHA-256 digest of `token` immediately followed by `path`.
///
/// An empty token is hashed like any other string.
pub fn request_checksum(token: &str, path: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(token.as_bytes());
	hasher.update(path.as_bytes());

	format!("{:x}", hasher.finalize())
}
