//! Request descriptors and argument validation

use crate::error::ValidationError;
use crate::schema::SchemaRef;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP methods the dispatcher handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`, no body
    Get,
    /// `DELETE`, no body
    Delete,
    /// `HEAD`, no body
    Head,
    /// `OPTIONS`, no body
    Options,
    /// `POST` with an encoded body
    Post,
    /// `PUT` with an encoded body
    Put,
    /// `PATCH` with an encoded body
    Patch,
}

impl Method {
    /// Lowercase method name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
        }
    }

    /// Whether the payload is encoded and sent as the request body
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyMethod);
        }

        match name.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "delete" => Ok(Self::Delete),
            "head" => Ok(Self::Head),
            "options" => Ok(Self::Options),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            _ => Err(ValidationError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Delete => Self::DELETE,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
        }
    }
}

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers. On write methods `Content-Type` is always replaced.
    pub headers: HeaderMap,
    /// Query string pairs appended to the URL
    pub query: Vec<(String, String)>,
    /// Timeout for this call only, overriding the client's
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        let _ = self.headers.insert(name, value);
        self
    }

    /// Add a header from strings
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHeader`] if either part is not a
    /// legal header name or value.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, ValidationError> {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ValidationError::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|_| ValidationError::InvalidHeader(name.to_string()))?;
        Ok(self.header(header_name, header_value))
    }

    /// Add a query pair
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Everything needed for one dispatch. Consumed by the call.
#[derive(Debug, Clone)]
pub struct GbufRequest {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// JSON payload, required for write methods and ignored otherwise
    pub payload: Option<Value>,
    /// Schema used for both the request body and the response
    pub schema: SchemaRef,
    /// Headers, query and timeout
    pub options: RequestOptions,
}

impl GbufRequest {
    /// Request without payload or options
    pub fn new(method: Method, url: impl Into<String>, schema: SchemaRef) -> Self {
        Self {
            url: url.into(),
            method,
            payload: None,
            schema,
            options: RequestOptions::default(),
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replace the options
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Check every argument, returning the parsed URL.
    ///
    /// Checks run in order (url, schema path, message name, payload) and the
    /// first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] describing the first invalid argument.
    pub fn validate(&self) -> Result<Url, ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        if self.schema.path.to_string_lossy().trim().is_empty() {
            return Err(ValidationError::EmptySchemaPath);
        }
        if self.schema.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessageName);
        }
        if self.method.has_body() && self.payload.is_none() {
            return Err(ValidationError::MissingPayload(self.method.as_str()));
        }

        Ok(parsed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaRef {
        SchemaRef::new("test.proto", "Message")
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" PATCH ".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("".parse::<Method>(), Err(ValidationError::EmptyMethod));
        assert_eq!(
            "trace".parse::<Method>(),
            Err(ValidationError::UnsupportedMethod("trace".to_string()))
        );
    }

    #[test]
    fn test_method_paths() {
        for method in [Method::Get, Method::Delete, Method::Head, Method::Options] {
            assert!(!method.has_body(), "{method} should not carry a body");
        }
        for method in [Method::Post, Method::Put, Method::Patch] {
            assert!(method.has_body(), "{method} should carry a body");
        }
        assert_eq!(reqwest::Method::from(Method::Options), reqwest::Method::OPTIONS);
    }

    #[test]
    fn test_validate_ok() {
        let request = GbufRequest::new(Method::Get, "http://localhost:4444/", schema());
        assert_eq!(request.validate().unwrap().as_str(), "http://localhost:4444/");
    }

    #[test]
    fn test_validate_rejects_blank_arguments() {
        let blank_url = GbufRequest::new(Method::Get, "  ", schema());
        assert_eq!(blank_url.validate(), Err(ValidationError::EmptyUrl));

        let blank_path = GbufRequest::new(Method::Get, "http://x/", SchemaRef::new("", "Message"));
        assert_eq!(blank_path.validate(), Err(ValidationError::EmptySchemaPath));

        let blank_message =
            GbufRequest::new(Method::Get, "http://x/", SchemaRef::new("test.proto", " "));
        assert_eq!(blank_message.validate(), Err(ValidationError::EmptyMessageName));
    }

    #[test]
    fn test_validate_rejects_relative_url() {
        let request = GbufRequest::new(Method::Get, "/relative/path", schema());
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_write_requires_payload() {
        let request = GbufRequest::new(Method::Post, "http://x/", schema());
        assert_eq!(request.validate(), Err(ValidationError::MissingPayload("post")));

        let request = request.with_payload(json!({ "text": "test" }));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .try_header("x-trace", "abc")
            .unwrap()
            .query("page", "2")
            .timeout(Duration::from_secs(5));

        assert_eq!(options.headers["x-trace"], "abc");
        assert_eq!(options.query, vec![("page".to_string(), "2".to_string())]);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));

        assert!(matches!(
            RequestOptions::new().try_header("bad header", "v"),
            Err(ValidationError::InvalidHeader(_))
        ));
    }
}
