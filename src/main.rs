//! gbuf - Protocol Buffer HTTP bodies from the command line
//!
//! Sends JSON payloads as encoded Protocol Buffer bodies and prints the decoded
//! responses as JSON.

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use console::style;
use gbuf_http::cli::{parse_header, parse_query, Cli, Commands, PayloadArgs, TargetArgs};
use gbuf_http::{Config, GbufClient, GbufError, GbufRequest, Method, RequestOptions, SchemaRef};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    std::process::exit(exit_code);
}

/// Main application entry point
async fn run() -> i32 {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(()) => 0,
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "{} {err:#}", style("Error:").red().bold());
            err.downcast_ref::<GbufError>()
                .map_or(1, GbufError::exit_code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "gbuf_http=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the requested command
async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Get(target) => handle_request(&config, Method::Get, target, None).await,
        Commands::Delete(target) => handle_request(&config, Method::Delete, target, None).await,
        Commands::Head(target) => handle_request(&config, Method::Head, target, None).await,
        Commands::Options(target) => handle_request(&config, Method::Options, target, None).await,
        Commands::Post { target, payload } => {
            handle_request(&config, Method::Post, target, Some(payload)).await
        }
        Commands::Put { target, payload } => {
            handle_request(&config, Method::Put, target, Some(payload)).await
        }
        Commands::Patch { target, payload } => {
            handle_request(&config, Method::Patch, target, Some(payload)).await
        }
        Commands::Encode {
            schema,
            payload,
            output,
            base64,
        } => {
            let client = GbufClient::from_config(&config)?;
            let payload = read_payload(&payload)?;
            let bytes = client
                .codec()
                .encode(&payload, &SchemaRef::new(schema.proto, schema.message))
                .await?;

            let rendered = if base64 {
                let mut text = STANDARD.encode(&bytes).into_bytes();
                text.push(b'\n');
                text
            } else {
                bytes.to_vec()
            };

            match output {
                Some(path) => std::fs::write(&path, &rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => std::io::stdout().write_all(&rendered)?,
            }
            Ok(())
        }
        Commands::Decode {
            schema,
            input,
            base64,
        } => {
            let client = GbufClient::from_config(&config)?;
            let raw = match &input {
                Some(path) => std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = Vec::new();
                    let _ = std::io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let bytes = if base64 {
                STANDARD
                    .decode(String::from_utf8_lossy(&raw).trim())
                    .context("Input is not valid base64")?
            } else {
                raw
            };

            let value = client
                .codec()
                .decode(&bytes, &SchemaRef::new(schema.proto, schema.message))
                .await?;
            print_json(&value)
        }
    }
}

/// Handle get/delete/head/options/post/put/patch
async fn handle_request(
    config: &Config,
    method: Method,
    target: TargetArgs,
    payload: Option<PayloadArgs>,
) -> anyhow::Result<()> {
    let client = GbufClient::from_config(config)?;

    let mut options = RequestOptions::new();
    for raw in &target.headers {
        let (name, value) =
            parse_header(raw).ok_or_else(|| anyhow!("Header must look like 'Name: value': {raw}"))?;
        options = options.try_header(name, value).map_err(GbufError::from)?;
    }
    for raw in &target.query {
        let (key, value) =
            parse_query(raw).ok_or_else(|| anyhow!("Query must look like 'key=value': {raw}"))?;
        options = options.query(key, value);
    }
    if let Some(secs) = target.timeout {
        options = options.timeout(Duration::from_secs(secs));
    }

    let mut request = GbufRequest::new(
        method,
        target.url.as_str(),
        SchemaRef::new(target.schema.proto, target.schema.message),
    )
    .with_options(options);
    if let Some(payload) = &payload {
        request = request.with_payload(read_payload(payload)?);
    }

    let _ = writeln!(
        std::io::stderr(),
        "{} {} {}",
        style("→").cyan(),
        method.as_str().to_uppercase(),
        target.url
    );
    let value = client.dispatch(request).await?;
    print_json(&value)
}

fn read_payload(payload: &PayloadArgs) -> anyhow::Result<Value> {
    let text = match (&payload.data, &payload.data_file) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => return Err(anyhow!("Provide --data or --data-file")),
    };
    serde_json::from_str(&text).context("Payload is not valid JSON")
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
