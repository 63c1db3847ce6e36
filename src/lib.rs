#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

//! # gbuf-http
//!
//! Protocol Buffer bodies for `reqwest`, with plain JSON on the caller's side.
//!
//! ## Architecture
//!
//! - **[`error`]** - Error types, one variant per failure kind
//! - **[`config`]** - Configuration loading and defaults
//! - **[`schema`]** - `.proto` loading and message lookup
//! - **[`codec`]** - JSON ⇄ Protocol Buffer bytes
//! - **[`client`]** - Request validation and dispatch
//! - **[`cli`]** - Argument parsing for the `gbuf` binary

pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod schema;

/// Error type alias for convenience
pub use error::{GbufError, Result, ValidationError};

/// Client types for convenience
pub use client::{GbufClient, GbufExt, GbufRequest, Method, RequestOptions};

/// Codec types for convenience
pub use codec::ProtoCodec;

/// Configuration type alias for convenience
pub use config::Config;

/// Schema types for convenience
pub use schema::{CachedSchemaLoader, FileSchemaLoader, SchemaLoader, SchemaRef};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "gbuf";
