//! End-to-end tests against a bound server instance

use authd_core::testutil::*;
use authd_core::{verify_with_key, KeyManager, SignatureAlgorithm};
use authd_server::server::{AppState, AuthServer};
use authd_store::UserStore;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Boot a server on an ephemeral port; the TempDir must outlive the test
async fn start_server() -> (SocketAddr, tempfile::TempDir) {
    let keys = Arc::new(KeyManager::new(SignatureAlgorithm::Rs256));
    keys.initialize(TEST_RSA_PRIVATE_PEM, TEST_RSA_PUBLIC_PEM)
        .unwrap();
    let (store, temp) = UserStore::temp().unwrap();
    let state = AppState::new(keys, store, Duration::from_secs(3600));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = AuthServer::new(state).serve_on(listener).await;
    });

    (addr, temp)
}

async fn request(
    addr: SocketAddr,
    method: Method,
    path: &str,
    body: Option<&str>,
    bearer: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await.unwrap();
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("host", "localhost");
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let req = builder
        .body(Full::new(Bytes::from(body.unwrap_or("").to_string())))
        .unwrap();

    let response = sender.send_request(req).await.unwrap();
    let status = response.status();
    let collected = response.collect().await.unwrap().to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&collected).unwrap();
    (status, value)
}

#[tokio::test]
async fn health_check_ok() {
    let (addr, _temp) = start_server().await;

    let (status, body) = request(addr, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "hello, world");
}

#[tokio::test]
async fn health_check_method_not_allowed() {
    let (addr, _temp) = start_server().await;

    let (status, _body) = request(addr, Method::POST, "/", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn create_lookup_delete_flow() {
    let (addr, _temp) = start_server().await;

    let (status, body) = request(
        addr,
        Method::POST,
        "/user",
        Some(r#"{"id": "createID", "username": "createdUser", "password": "testpasswd"}"#),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "success");

    let (status, body) = request(addr, Method::GET, "/user/createID", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], "createID");
    assert_eq!(body["user"]["username"], "createdUser");
    // The credential digest never leaves the store
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_digest").is_none());

    let (status, _body) = request(
        addr,
        Method::POST,
        "/user",
        Some(r#"{"id": "createID", "username": "again", "password": "otherpasswd"}"#),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = request(addr, Method::DELETE, "/user/createID", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "success");

    let (status, _body) = request(addr, Method::GET, "/user/createID", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_user_rebinds_password() {
    let (addr, _temp) = start_server().await;

    request(
        addr,
        Method::POST,
        "/user",
        Some(r#"{"id": "updateID", "username": "updateuser", "password": "testpasswd"}"#),
        None,
    )
    .await;

    let (status, body) = request(
        addr,
        Method::PUT,
        "/user",
        Some(r#"{"id": "updateID", "username": "updateduser", "password": "newpasswd"}"#),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "success");

    // Old password no longer authenticates
    let (status, _body) = request(
        addr,
        Method::POST,
        "/auth",
        Some(r#"{"id": "updateID", "password": "testpasswd"}"#),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // New password does
    let (status, body) = request(
        addr,
        Method::POST,
        "/auth",
        Some(r#"{"id": "updateID", "password": "newpasswd"}"#),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "auth valid");
}

#[tokio::test]
async fn list_users_is_id_ordered() {
    let (addr, _temp) = start_server().await;

    for (id, name) in [
        ("lookupID", "lookupuser"),
        ("deleteID", "deleteuser"),
        ("updateID", "updateuser"),
    ] {
        request(
            addr,
            Method::POST,
            "/user",
            Some(&format!(
                r#"{{"id": "{}", "username": "{}", "password": "testpasswd"}}"#,
                id, name
            )),
            None,
        )
        .await;
    }

    let (status, body) = request(addr, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["deleteID", "lookupID", "updateID"]);
}

#[tokio::test]
async fn auth_returns_verifying_token() {
    let (addr, _temp) = start_server().await;

    request(
        addr,
        Method::POST,
        "/user",
        Some(r#"{"id": "authID", "username": "authuser", "password": "testpasswd"}"#),
        None,
    )
    .await;

    let (status, body) = request(
        addr,
        Method::POST,
        "/auth",
        Some(r#"{"id": "authID", "password": "testpasswd"}"#),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "auth valid");
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    // The minted token verifies against the active public key...
    let claims = verify_with_key(&token, &test_public_key(), SignatureAlgorithm::Rs256).unwrap();
    assert_eq!(claims.subject, "authID");

    // ...but not against an unrelated one
    assert!(verify_with_key(&token, &other_public_key(), SignatureAlgorithm::Rs256).is_err());

    // And the verify endpoint agrees
    let (status, body) = request(addr, Method::GET, "/verify", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["subject"], "authID");
}

#[tokio::test]
async fn auth_failures_are_indistinguishable() {
    let (addr, _temp) = start_server().await;

    request(
        addr,
        Method::POST,
        "/user",
        Some(r#"{"id": "lookupID", "username": "lookupuser", "password": "testpasswd"}"#),
        None,
    )
    .await;

    let (wrong_status, wrong_body) = request(
        addr,
        Method::POST,
        "/auth",
        Some(r#"{"id": "lookupID", "password": "hogepasswd"}"#),
        None,
    )
    .await;
    let (unknown_status, unknown_body) = request(
        addr,
        Method::POST,
        "/auth",
        Some(r#"{"id": "ghostID", "password": "testpasswd"}"#),
        None,
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    // Byte-identical bodies: no user-enumeration signal
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["message"], "auth invalid");
}

#[tokio::test]
async fn verify_rejects_bad_tokens_with_single_signal() {
    let (addr, _temp) = start_server().await;

    let (status, body) = request(addr, Method::GET, "/verify", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body.get("subject").is_none());

    // Missing header is a request error, not a token outcome
    let (status, _body) = request(addr, Method::GET, "/verify", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn key_endpoint_exports_pem_verbatim() {
    let (addr, _temp) = start_server().await;

    let (status, body) = request(addr, Method::GET, "/key", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["public_key"].as_str().unwrap(), TEST_RSA_PUBLIC_PEM);
}

#[tokio::test]
async fn algorithm_endpoints_report_rs256() {
    let (addr, _temp) = start_server().await;

    for path in ["/algorithm", "/alg"] {
        let (status, body) = request(addr, Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["algorithm"], "RS256");
    }
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let (addr, _temp) = start_server().await;

    let (status, body) = request(addr, Method::GET, "/nonexistent", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "not found");
}

#[tokio::test]
async fn create_requires_json_content_type() {
    let (addr, _temp) = start_server().await;

    // Hand-rolled request without the content-type header
    let stream = TcpStream::connect(addr).await.unwrap();
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await.unwrap();
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = Request::builder()
        .method(Method::POST)
        .uri("/user")
        .header("host", "localhost")
        .body(Full::new(Bytes::from(
            r#"{"id": "x", "username": "y", "password": "z"}"#,
        )))
        .unwrap();

    let response = sender.send_request(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
