//! End-to-end dispatch tests against a local mock server.

#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use gbuf_http::{
    codec, Config, GbufClient, GbufError, GbufExt, GbufRequest, Method, RequestOptions,
    SchemaRef, ValidationError,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use wiremock::matchers::{any, body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHEMA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test.proto");

fn sample() -> Value {
    json!({ "text": "test" })
}

async fn encoded_sample() -> Vec<u8> {
    codec::encode(&sample(), SCHEMA, "Message")
        .await
        .unwrap()
        .to_vec()
}

/// Server answering `verb` on `/` with the encoded sample
async fn replying_server(verb: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method(verb))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encoded_sample().await))
        .mount(&server)
        .await;
    server
}

fn url(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

#[tokio::test]
async fn test_get_decodes_response() {
    let server = replying_server("GET").await;

    let res = reqwest::Client::new()
        .gbuf()
        .get_gbuf(&url(&server), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(res, sample());
}

#[tokio::test]
async fn test_delete_decodes_response() {
    let server = replying_server("DELETE").await;

    let res = reqwest::Client::new()
        .gbuf()
        .delete_gbuf(&url(&server), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(res, sample());
}

#[tokio::test]
async fn test_read_path_sends_no_body() {
    let server = replying_server("GET").await;

    let _ = reqwest::Client::new()
        .gbuf()
        .request_gbuf(
            &url(&server),
            "get",
            &json!({ "text": "ignored" }),
            SCHEMA,
            "Message",
            RequestOptions::default(),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
    assert!(requests[0].headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_post_sends_encoded_body() {
    let server = MockServer::start().await;
    let encoded = encoded_sample().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(encoded.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encoded))
        .expect(1)
        .mount(&server)
        .await;

    let res = reqwest::Client::new()
        .gbuf()
        .post_gbuf(&url(&server), &sample(), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(res, sample());

    // The server side can decode what was sent.
    let requests = server.received_requests().await.unwrap();
    let received = codec::decode(&requests[0].body, SCHEMA, "Message").await.unwrap();
    assert_eq!(received, sample());
}

#[tokio::test]
async fn test_put_and_patch_send_encoded_body() {
    let client = reqwest::Client::new().gbuf();

    let server = replying_server("PUT").await;
    let res = client
        .put_gbuf(&url(&server), &sample(), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(res, sample());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, encoded_sample().await);

    let server = replying_server("PATCH").await;
    let res = client
        .patch_gbuf(&url(&server), &sample(), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(res, sample());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, encoded_sample().await);
}

#[tokio::test]
async fn test_request_gbuf_accepts_method_strings() {
    let client = reqwest::Client::new().gbuf();

    for verb in ["PUT", "patch", "Options"] {
        let server = replying_server(&verb.to_uppercase()).await;
        let res = client
            .request_gbuf(
                &url(&server),
                verb,
                &sample(),
                SCHEMA,
                "Message",
                RequestOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(res, sample(), "{verb}");
    }
}

#[tokio::test]
async fn test_content_type_forced_other_headers_kept() {
    let server = replying_server("POST").await;
    let options = RequestOptions::new()
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .try_header("x-request-id", "abc-123")
        .unwrap();

    let _ = reqwest::Client::new()
        .gbuf()
        .post_gbuf(&url(&server), &sample(), SCHEMA, "Message", options)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let headers = &requests[0].headers;
    let content_types: Vec<_> = headers.get_all("content-type").iter().collect();
    assert_eq!(content_types, vec!["application/octet-stream"]);
    assert_eq!(headers.get("x-request-id").unwrap(), "abc-123");
}

#[tokio::test]
async fn test_query_and_headers_forwarded_on_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encoded_sample().await))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::new()
        .query("page", "2")
        .try_header("Authorization", "Bearer t")
        .unwrap();
    let res = reqwest::Client::new()
        .gbuf()
        .get_gbuf(&format!("{}/items", server.uri()), SCHEMA, "Message", options)
        .await
        .unwrap();

    assert_eq!(res, sample());
}

#[tokio::test]
async fn test_invalid_arguments_never_hit_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = reqwest::Client::new().gbuf();
    let target = url(&server);

    let err = client
        .get_gbuf("", SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GbufError::InvalidArguments(ValidationError::EmptyUrl)));

    let err = client
        .post_gbuf(&target, &sample(), "", "Message", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GbufError::InvalidArguments(ValidationError::EmptySchemaPath)
    ));

    let err = client
        .get_gbuf(&target, SCHEMA, "", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GbufError::InvalidArguments(ValidationError::EmptyMessageName)
    ));

    let err = client
        .request_gbuf(&target, "", &sample(), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GbufError::InvalidArguments(ValidationError::EmptyMethod)));

    let err = client
        .dispatch(GbufRequest::new(
            Method::Put,
            target.as_str(),
            SchemaRef::new(SCHEMA, "Message"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GbufError::InvalidArguments(ValidationError::MissingPayload("put"))
    ));

    server.verify().await;
}

#[tokio::test]
async fn test_unknown_message_fails_before_send_on_write() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = reqwest::Client::new()
        .gbuf()
        .post_gbuf(&url(&server), &sample(), SCHEMA, "Nope", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GbufError::MessageNotFound { ref message, .. } if message == "Nope"));
    server.verify().await;
}

#[tokio::test]
async fn test_unknown_message_on_read_is_lookup_failure() {
    let server = replying_server("GET").await;

    let err = reqwest::Client::new()
        .gbuf()
        .get_gbuf(&url(&server), SCHEMA, "Nope", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GbufError::MessageNotFound { .. }));
}

#[tokio::test]
async fn test_verification_error_surfaces() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = reqwest::Client::new()
        .gbuf()
        .put_gbuf(
            &url(&server),
            &json!({ "text": ["not", "a", "string"] }),
            SCHEMA,
            "Message",
            RequestOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GbufError::Verification { .. }));
    server.verify().await;
}

#[tokio::test]
async fn test_error_status_still_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(encoded_sample().await))
        .mount(&server)
        .await;

    let res = reqwest::Client::new()
        .gbuf()
        .get_gbuf(&url(&server), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(res, sample());
}

#[tokio::test]
async fn test_garbage_response_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x0a, 0x0a, 0x41]))
        .mount(&server)
        .await;

    let err = reqwest::Client::new()
        .gbuf()
        .get_gbuf(&url(&server), SCHEMA, "Message", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GbufError::Decode { .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind and release a port so nothing is listening on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = reqwest::Client::new()
        .gbuf()
        .get_gbuf(
            &format!("http://127.0.0.1:{port}/"),
            SCHEMA,
            "Message",
            RequestOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GbufError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let server = replying_server("GET").await;
    let client = reqwest::Client::new().gbuf();
    let target = url(&server);
    let (client, target) = (&client, target.as_str());

    let calls =
        (0..8).map(|_| client.get_gbuf(target, SCHEMA, "Message", RequestOptions::default()));
    let results = join_all(calls).await;

    assert_eq!(results.len(), 8);
    for res in results {
        assert_eq!(res.unwrap(), sample());
    }
}

#[tokio::test]
async fn test_client_from_config() {
    let server = replying_server("POST").await;
    let mut config = Config {
        cache_schemas: true,
        ..Config::default()
    };
    let _ = config
        .default_headers
        .insert("x-api-key".to_string(), "secret".to_string());

    let client = GbufClient::from_config(&config).unwrap();
    for _ in 0..2 {
        let res = client
            .post_gbuf(&url(&server), &sample(), SCHEMA, "Message", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(res, sample());
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].headers.get("x-api-key").unwrap(), "secret");
    assert!(requests[0]
        .headers
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("gbuf/"));
}
