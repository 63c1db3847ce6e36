//! HTTP dispatch with Protocol Buffer bodies
//!
//! [`GbufClient`] wraps a `reqwest::Client` and a [`ProtoCodec`]. Read methods
//! (get, delete, head, options) send no body; write methods (post, put, patch)
//! encode the payload and send it as `application/octet-stream`. Either way the
//! raw response body is decoded with the same schema. The HTTP status is not
//! interpreted: any response the transport delivers gets decoded.

pub mod http;
pub mod request;

pub use request::{GbufRequest, Method, RequestOptions};

use crate::codec::ProtoCodec;
use crate::config::{Config, OCTET_STREAM};
use crate::error::Result;
use crate::schema::{CachedSchemaLoader, FileSchemaLoader, SchemaLoader, SchemaRef};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// HTTP client that speaks Protocol Buffers on the wire and JSON to the caller
#[derive(Debug, Clone)]
pub struct GbufClient {
    http: Client,
    codec: ProtoCodec,
}

impl GbufClient {
    /// Wrap `http`, parsing schemas from disk on every call
    pub fn new(http: Client) -> Self {
        Self::with_codec(http, ProtoCodec::default())
    }

    /// Wrap `http` with a custom codec (e.g. one backed by a cached loader)
    pub const fn with_codec(http: Client, codec: ProtoCodec) -> Self {
        Self { http, codec }
    }

    /// Build the HTTP client and schema loader from configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::GbufError::InvalidConfig`] if the config is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let http = http::create_http_client(config)?;

        let files: Arc<dyn SchemaLoader> = Arc::new(FileSchemaLoader::with_include_paths(
            config.include_paths.clone(),
        ));
        let loader: Arc<dyn SchemaLoader> = if config.cache_schemas {
            Arc::new(CachedSchemaLoader::new(files))
        } else {
            files
        };

        Ok(Self::with_codec(http, ProtoCodec::new(loader)))
    }

    /// The underlying HTTP client
    pub const fn http(&self) -> &Client {
        &self.http
    }

    /// The codec used for request and response bodies
    pub const fn codec(&self) -> &ProtoCodec {
        &self.codec
    }

    /// Send `request` and decode the response.
    ///
    /// Steps run strictly in order: validate, encode (write methods), send,
    /// read body, decode. The first failure is returned.
    ///
    /// # Errors
    ///
    /// [`crate::GbufError::InvalidArguments`] before any I/O, then schema,
    /// verification, transport or decode errors as they occur.
    #[instrument(
        skip_all,
        fields(method = %request.method, url = %request.url, schema = %request.schema)
    )]
    pub async fn dispatch(&self, request: GbufRequest) -> Result<Value> {
        let url = request.validate()?;
        let GbufRequest {
            method,
            payload,
            schema,
            options,
            ..
        } = request;

        let mut headers = options.headers;
        let mut builder = self.http.request(method.into(), url);

        if method.has_body() {
            let payload = payload.unwrap_or_default();
            let body = self.codec.encode(&payload, &schema).await?;
            let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
            builder = builder.body(body);
        }

        builder = builder.headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "received response");

        self.codec.decode(&body, &schema).await
    }

    /// Dispatch with the method given as a string.
    ///
    /// `payload` is encoded for post, put and patch and ignored otherwise.
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`]; an unknown method is
    /// [`crate::GbufError::InvalidArguments`].
    pub async fn request_gbuf(
        &self,
        url: &str,
        method: &str,
        payload: &Value,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        let method: Method = method.parse()?;
        self.call(method, url, Some(payload), schema_path.as_ref(), message, options)
            .await
    }

    /// `GET` and decode the response
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn get_gbuf(
        &self,
        url: &str,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Get, url, None, schema_path.as_ref(), message, options)
            .await
    }

    /// `DELETE` and decode the response
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn delete_gbuf(
        &self,
        url: &str,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Delete, url, None, schema_path.as_ref(), message, options)
            .await
    }

    /// `HEAD` and decode the (normally empty) response body
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn head_gbuf(
        &self,
        url: &str,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Head, url, None, schema_path.as_ref(), message, options)
            .await
    }

    /// `OPTIONS` and decode the response
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn options_gbuf(
        &self,
        url: &str,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Options, url, None, schema_path.as_ref(), message, options)
            .await
    }

    /// Encode `payload`, `POST` it and decode the response
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn post_gbuf(
        &self,
        url: &str,
        payload: &Value,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Post, url, Some(payload), schema_path.as_ref(), message, options)
            .await
    }

    /// Encode `payload`, `PUT` it and decode the response
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn put_gbuf(
        &self,
        url: &str,
        payload: &Value,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Put, url, Some(payload), schema_path.as_ref(), message, options)
            .await
    }

    /// Encode `payload`, `PATCH` it and decode the response
    ///
    /// # Errors
    ///
    /// See [`GbufClient::dispatch`].
    pub async fn patch_gbuf(
        &self,
        url: &str,
        payload: &Value,
        schema_path: impl AsRef<Path>,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.call(Method::Patch, url, Some(payload), schema_path.as_ref(), message, options)
            .await
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        schema_path: &Path,
        message: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        let mut request = GbufRequest::new(method, url, SchemaRef::new(schema_path, message))
            .with_options(options);
        if method.has_body() {
            request.payload = payload.cloned();
        }
        self.dispatch(request).await
    }
}

impl From<Client> for GbufClient {
    fn from(http: Client) -> Self {
        Self::new(http)
    }
}

/// Adds Protocol Buffer convenience methods to `reqwest::Client`
///
/// ```rust,ignore
/// use gbuf_http::GbufExt;
///
/// let reply = reqwest::Client::new()
///     .gbuf()
///     .get_gbuf("http://localhost:4444/", "test.proto", "Message", Default::default())
///     .await?;
/// ```
pub trait GbufExt {
    /// A [`GbufClient`] sharing this client's connection pool
    fn gbuf(&self) -> GbufClient;
}

impl GbufExt for Client {
    fn gbuf(&self) -> GbufClient {
        GbufClient::new(self.clone())
    }
}
