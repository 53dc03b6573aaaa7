//! Behavior tests for the secure transport against a mock HTTP server:
//! signing headers, retry/backoff policy, timeouts, and encrypted bodies.

use attest_crypto::{decrypt_with_key, generate_random_key, DerivedKey, EncryptedPayload};
use attest_transport::signing;
use attest_transport::{RequestOptions, SecureTransport, TransportConfig, TransportError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> TransportConfig {
    TransportConfig {
        timeout: Duration::from_secs(2),
        retries: 3,
        backoff_base: Duration::from_millis(10),
        ..TransportConfig::default()
    }
}

async fn initialized_transport(signing_key: &DerivedKey) -> SecureTransport {
    let transport = SecureTransport::new(fast_config());
    transport
        .initialize(signing_key.clone(), Some(generate_random_key()))
        .await;
    transport
}

// --- Signing headers ---

#[tokio::test]
async fn post_attaches_timestamp_nonce_and_signature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/evidence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let signing_key = generate_random_key();
    let transport = initialized_transport(&signing_key).await;

    let resp = transport
        .post(
            &format!("{}/evidence", server.uri()),
            &json!({"id": "ev-1"}),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    assert!(resp.success);
    assert!(resp.verified);

    let requests = server.received_requests().await.unwrap();
    let req = &requests[0];

    let timestamp: i64 = req.headers["X-Request-Timestamp"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let nonce = req.headers["X-Request-Nonce"].to_str().unwrap();
    let signature = req.headers["X-Request-Signature"].to_str().unwrap();

    assert_eq!(nonce.len(), 32);

    // A compliant server recomputes the HMAC over the identical tuple.
    let body = String::from_utf8(req.body.clone()).unwrap();
    let message = signing::post_message(timestamp, nonce, &body);
    assert!(signing::verify(&signing_key, &message, signature).unwrap());
}

#[tokio::test]
async fn get_signs_method_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/controls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let signing_key = generate_random_key();
    let transport = initialized_transport(&signing_key).await;
    let url = format!("{}/controls", server.uri());

    let resp = transport.get(&url, RequestOptions::default()).await.unwrap();
    assert!(resp.success);

    let requests = server.received_requests().await.unwrap();
    let req = &requests[0];
    let timestamp: i64 = req.headers["X-Request-Timestamp"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let nonce = req.headers["X-Request-Nonce"].to_str().unwrap();
    let signature = req.headers["X-Request-Signature"].to_str().unwrap();

    let message = signing::get_message(timestamp, nonce, &url);
    assert!(signing::verify(&signing_key, &message, signature).unwrap());
}

#[tokio::test]
async fn unsigned_request_has_no_signature_and_is_unverified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    let resp = transport
        .post(
            &server.uri(),
            &json!({}),
            RequestOptions {
                sign: false,
                ..RequestOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(resp.success);
    assert!(!resp.verified);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("X-Request-Signature"));
}

#[tokio::test]
async fn signing_without_key_fails() {
    let transport = SecureTransport::new(fast_config());
    let err = transport
        .post("http://localhost:9/x", &json!({}), RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::KeyUnavailable));
}

// --- Encrypted bodies ---

#[tokio::test]
async fn encrypted_post_wraps_body_and_marks_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = SecureTransport::new(fast_config());
    let encryption_key = generate_random_key();
    transport
        .initialize(generate_random_key(), Some(encryption_key.clone()))
        .await;

    let data = json!({"finding": "open port", "severity": "high"});
    let resp = transport
        .post(
            &server.uri(),
            &data,
            RequestOptions {
                encrypt: true,
                ..RequestOptions::default()
            },
        )
        .await
        .unwrap();
    assert!(resp.success);

    let requests = server.received_requests().await.unwrap();
    let req = &requests[0];
    assert_eq!(req.headers["X-Encrypted"].to_str().unwrap(), "true");

    let payload: EncryptedPayload = serde_json::from_slice(&req.body).unwrap();
    let plaintext = decrypt_with_key(&encryption_key, &payload).unwrap();
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&plaintext).unwrap(),
        data
    );
}

#[tokio::test]
async fn encrypt_without_encryption_key_fails() {
    let transport = SecureTransport::new(fast_config());
    transport.initialize(generate_random_key(), None).await;

    let err = transport
        .post(
            "http://localhost:9/x",
            &json!({}),
            RequestOptions {
                encrypt: true,
                ..RequestOptions::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::KeyUnavailable));
}

// --- Retry policy ---

#[tokio::test]
async fn service_unavailable_three_times_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    let resp = transport
        .post(&server.uri(), &json!({}), RequestOptions::default())
        .await
        .unwrap();

    assert!(resp.success);
    assert_eq!(resp.status_code, 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn bad_request_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "malformed"})))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    let resp = transport
        .post(&server.uri(), &json!({}), RequestOptions::default())
        .await
        .unwrap();

    assert!(!resp.success);
    assert_eq!(resp.status_code, 400);
    assert_eq!(resp.error.as_deref(), Some("malformed"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    let resp = transport.get(&server.uri(), RequestOptions::default()).await.unwrap();

    assert!(resp.success);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "overloaded"})))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    let resp = transport
        .post(
            &server.uri(),
            &json!({}),
            RequestOptions {
                retries: Some(2),
                ..RequestOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(!resp.success);
    assert_eq!(resp.status_code, 503);
    assert_eq!(resp.error.as_deref(), Some("overloaded"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn each_retry_carries_a_fresh_nonce() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    transport
        .post(&server.uri(), &json!({}), RequestOptions::default())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let first = requests[0].headers["X-Request-Nonce"].to_str().unwrap();
    let second = requests[1].headers["X-Request-Nonce"].to_str().unwrap();
    assert_ne!(first, second);
}

// --- Timeouts ---

#[tokio::test]
async fn slow_response_surfaces_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = initialized_transport(&generate_random_key()).await;
    let err = transport
        .post(
            &server.uri(),
            &json!({}),
            RequestOptions {
                timeout: Some(Duration::from_millis(50)),
                retries: Some(0),
                ..RequestOptions::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout));
}

// --- Lifecycle ---

#[tokio::test]
async fn destroy_revokes_signing() {
    let transport = initialized_transport(&generate_random_key()).await;
    assert!(transport.sign_message("m").await.is_ok());

    transport.destroy().await;

    assert!(!transport.is_initialized().await);
    assert!(matches!(
        transport.sign_message("m").await,
        Err(TransportError::KeyUnavailable)
    ));
}
