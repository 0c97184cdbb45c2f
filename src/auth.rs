//! Authentication token model and the request checksum derived from it.

pub mod checksum;
pub mod token;

pub use checksum::*;
pub use token::*;
