use http::Uri;

use crate::{Header, Request};

#[test]
fn builds_request() {
    let uri: Uri = "http://example.com/".parse().unwrap();
    let request = Request::builder(uri.clone())
        .method(http::Method::POST)
        .body(b"hello".to_vec())
        .build();

    assert_eq!(request.uri, uri);
    assert_eq!(request.method, http::Method::POST);
    assert_eq!(request.body, Some(b"hello".to_vec()));
}

#[test]
fn keeps_header_order_and_casing() {
    let uri: Uri = "http://example.com/".parse().unwrap();
    let request = Request::builder(uri)
        .header("X-Event-Type", "user.created")
        .header("x-source", "test-script")
        .header("X-Event-Type", "user.updated")
        .build();

    assert_eq!(
        request.headers,
        vec![
            Header::new("X-Event-Type", "user.created"),
            Header::new("x-source", "test-script"),
            Header::new("X-Event-Type", "user.updated"),
        ]
    );
    assert_eq!(request.header("x-event-type"), Some("user.created"));
    assert_eq!(request.header("X-SOURCE"), Some("test-script"));
}

#[test]
fn defaults_to_get_without_body() {
    let uri: Uri = "http://example.com/".parse().unwrap();
    let request = Request::builder(uri).build();

    assert_eq!(request.method, http::Method::GET);
    assert!(request.body.is_none());
    assert!(request.headers.is_empty());
}
