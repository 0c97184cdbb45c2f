//! Parser for the newline-delimited VIP list returned by `/users`.

// std
use std::io::{BufRead, Error as IoError, ErrorKind};
// self
use crate::{_prelude::*, error::MalformedResponseError};

/// Splits `reader` into one identifier per line, preserving wire order.
///
/// Lines lose their `\n` terminator and one trailing `\r`, if present, and nothing else: interior
/// whitespace and empty lines between entries are kept, a final line ending in a bare `\r` is
/// trimmed the same way, and a trailing terminator does not add an empty entry.
/// Read failures, including invalid UTF-8, surface as [`MalformedResponseError::UnreadableBody`].
pub fn parse_vips(reader: impl BufRead) -> Result<Vec<String>> {
	reader
		.split(b'\n')
		.map(|line| {
			let mut line = line?;

			if line.last() == Some(&b'\r') {
				line.pop();
			}

			String::from_utf8(line).map_err(|e| IoError::new(ErrorKind::InvalidData, e))
		})
		.collect::<std::io::Result<Vec<_>>>()
		.map_err(|source| MalformedResponseError::UnreadableBody { source }.into())
}
