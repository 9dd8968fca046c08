//! Core types for the message compression filter.
//!
//! This crate provides the types shared by the client and server sides of
//! the filter (`compression-filter`).
//!
//! ## Modules
//!
//! - [`algorithm`]: Compression algorithm identifiers and sets
//! - [`codec`]: Compression codec trait and implementations
//! - [`error`]: Status codes and the call status type
//! - [`message`]: Call messages and their flags
//! - [`metadata`]: Call metadata with typed keys

mod algorithm;
mod codec;
mod error;
mod message;
mod metadata;

pub use algorithm::*;
pub use codec::*;
pub use error::*;
pub use message::*;
pub use metadata::*;
