//! Text filters for record deduplication
//!
//! This crate provides the string-level building blocks used by the
//! deduplication pipeline: text normalization and phonetic encoding.

pub mod error;
pub mod phonetic;
pub mod text_preprocessing;

pub use error::{Error, Result};
pub use phonetic::soundex;
pub use text_preprocessing::TextNormalizer;
