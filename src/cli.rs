//! Command-line interface argument parsing
//!
//! Defines the `gbuf` commands and their arguments using Clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gbuf - send and receive Protocol Buffer bodies as JSON
#[derive(Parser, Debug)]
#[command(name = "gbuf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send and receive Protocol Buffer HTTP bodies as plain JSON")]
#[command(long_about = concat!(
    "gbuf (v", env!("CARGO_PKG_VERSION"), ")\n",
    "Encodes JSON payloads with a .proto schema, sends them over HTTP and\n",
    "decodes the binary response back to JSON.\n\n",
    "Use 'encode' and 'decode' to convert buffers without a server."
))]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.config/gbuf/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Schema selection shared by every command
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Path to the .proto file
    #[arg(long, short = 'p')]
    pub proto: PathBuf,

    /// Message type to encode/decode (e.g. Message or pkg.Message)
    #[arg(long, short = 'm')]
    pub message: String,
}

/// Request target and options shared by the HTTP commands
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Request URL
    pub url: String,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Extra header, "Name: value" (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Query pair, "key=value" (repeatable)
    #[arg(long = "query", short = 'q')]
    pub query: Vec<String>,

    /// Timeout for this request in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// JSON payload source for write commands
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// JSON payload
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// File containing the JSON payload
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET a URL and decode the response
    ///
    /// Example:
    ///   gbuf get http://localhost:4444/ -p test.proto -m Message
    #[command(display_order = 1)]
    Get(TargetArgs),

    /// DELETE a URL and decode the response
    #[command(display_order = 2)]
    Delete(TargetArgs),

    /// HEAD a URL and decode the (usually empty) response
    #[command(display_order = 3)]
    Head(TargetArgs),

    /// OPTIONS a URL and decode the response
    #[command(display_order = 4)]
    Options(TargetArgs),

    /// Encode a JSON payload, POST it and decode the response
    ///
    /// Example:
    ///   gbuf post http://localhost:4444/ -p test.proto -m Message -d '{"text":"test"}'
    #[command(display_order = 5)]
    Post {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Encode a JSON payload, PUT it and decode the response
    #[command(display_order = 6)]
    Put {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Encode a JSON payload, PATCH it and decode the response
    #[command(display_order = 7)]
    Patch {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Encode a JSON payload to Protocol Buffer bytes
    ///
    /// Example:
    ///   gbuf encode -p test.proto -m Message -d '{"text":"test"}' --base64
    #[command(display_order = 8)]
    Encode {
        #[command(flatten)]
        schema: SchemaArgs,
        #[command(flatten)]
        payload: PayloadArgs,
        /// Write bytes here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Print base64 instead of raw bytes
        #[arg(long)]
        base64: bool,
    },

    /// Decode Protocol Buffer bytes to JSON
    ///
    /// Example:
    ///   gbuf decode -p test.proto -m Message --input reply.bin
    #[command(display_order = 9)]
    Decode {
        #[command(flatten)]
        schema: SchemaArgs,
        /// Read bytes from this file instead of stdin
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
        /// Input is base64 text
        #[arg(long)]
        base64: bool,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}

/// Split `"Name: value"` into its parts
pub fn parse_header(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// Split `"key=value"` into its parts
pub fn parse_query(raw: &str) -> Option<(&str, &str)> {
    let (key, value) = raw.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}
