//! Exercises `ReqwestHttpClient` against a real loopback HTTP server, to
//! check the header/status/body/Link-header plumbing `http.rs`'s unit tests
//! can't: those construct `HttpResponse` directly and never touch `reqwest`.

use acmev1::{HttpClient, ReqwestHttpClient};

#[test]
fn get_exposes_status_headers_and_body() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/directory")
        .with_status(200)
        .with_header("Replay-Nonce", "abc123")
        .with_body(r#"{"ok":true}"#)
        .create();

    let client = ReqwestHttpClient::new().unwrap();
    let response = client.get(&format!("{}/directory", server.url())).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.header("replay-nonce"), Some("abc123"));
    assert_eq!(response.header("REPLAY-NONCE"), Some("abc123"));
    assert_eq!(response.body_str(), r#"{"ok":true}"#);
}

#[test]
fn post_sets_content_length_and_carries_headers_and_body() {
    let mut server = mockito::Server::new();
    let body = br#"{"resource":"new-reg"}"#;
    let _mock = server
        .mock("POST", "/new-reg")
        .match_header("content-length", body.len().to_string().as_str())
        .with_status(201)
        .with_header("Location", "https://ca.example/acct/1")
        .with_header(
            "Link",
            "<https://ca.example/terms>; rel=\"terms-of-service\"",
        )
        .with_header("Replay-Nonce", "N1")
        .create();

    let client = ReqwestHttpClient::new().unwrap();
    let response = client
        .post(&format!("{}/new-reg", server.url()), &[], body)
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.header("location"), Some("https://ca.example/acct/1"));
    assert_eq!(
        response.link_relation("terms-of-service"),
        Some("https://ca.example/terms".to_string())
    );
    assert_eq!(response.header("replay-nonce"), Some("N1"));
}

#[test]
fn get_surfaces_non_200_status_without_erroring() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/directory")
        .with_status(500)
        .with_body("internal error")
        .create();

    let client = ReqwestHttpClient::new().unwrap();
    let response = client.get(&format!("{}/directory", server.url())).unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.body_str(), "internal error");
}
