//! Shared helpers.
//!
//! - [`encoding`] - varint, delta and little-endian integer encoding
//! - [`tokenizer`] - the text analyzer used for indexed fields
//! - [`progress`] - spinner, a no-op without the `progress` feature

pub mod encoding;
pub mod progress;
pub mod tokenizer;

pub use encoding::*;
pub use tokenizer::*;
