use assert_matches::assert_matches;
use hookrelay_replay::{
    CapturedRequest, Fields, Payload, ReplayError, ReplayMethod, plan_request,
};
use hookrelay_web::Header;
use serde_json::json;

fn captured(method: &str, payload: Option<Payload>) -> CapturedRequest {
    CapturedRequest {
        method: Some(method.to_string()),
        headers: [("X-Event-Type", "user.created")].into_iter().collect(),
        payload,
        ..Default::default()
    }
}

fn structured() -> Payload {
    Payload::Structured(json!({
        "event": "user.created",
        "data": { "user_id": 123, "email": "test@example.com" },
        "timestamp": "2024-01-01T12:00:00Z"
    }))
}

#[test]
fn bodiless_methods_never_send_payload() {
    for method in ["GET", "get", "OPTIONS", "Options"] {
        for payload in [
            Some(structured()),
            Some(Payload::Text("raw".to_string())),
            None,
        ] {
            let planned = plan_request("http://example.com/hook", &captured(method, payload)).unwrap();
            assert!(planned.body.is_none(), "{method} carried a body");
            assert!(planned.header("content-type").is_none());
        }
    }
}

#[test]
fn structured_payload_is_json_in_key_order() {
    for method in ["POST", "PUT", "PATCH", "DELETE"] {
        let planned = plan_request("http://example.com/hook", &captured(method, Some(structured()))).unwrap();

        let body = std::str::from_utf8(planned.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            r#"{"event":"user.created","data":{"user_id":123,"email":"test@example.com"},"timestamp":"2024-01-01T12:00:00Z"}"#
        );
        assert_eq!(planned.header("Content-Type"), Some("application/json"));
        assert_eq!(planned.method, ReplayMethod::parse(method).unwrap());
    }
}

#[test]
fn structured_arrays_and_scalars_are_json() {
    for (value, expected) in [
        (json!([1, "two", null]), r#"[1,"two",null]"#),
        (json!(42), "42"),
        (json!(false), "false"),
    ] {
        let planned = plan_request(
            "http://example.com/hook",
            &captured("POST", Some(Payload::Structured(value))),
        )
        .unwrap();
        assert_eq!(planned.body.as_deref(), Some(expected.as_bytes()));
        assert_eq!(planned.header("content-type"), Some("application/json"));
    }
}

#[test]
fn text_payload_is_sent_verbatim() {
    let planned = plan_request(
        "http://example.com/hook",
        &captured("PUT", Some(Payload::Text("a=1&b=two words".to_string()))),
    )
    .unwrap();

    assert_eq!(planned.body.as_deref(), Some(&b"a=1&b=two words"[..]));
    assert_eq!(planned.header("content-type"), Some("text/plain"));
}

#[test]
fn empty_text_payload_is_still_a_body() {
    let planned = plan_request(
        "http://example.com/hook",
        &captured("POST", Some(Payload::Text(String::new()))),
    )
    .unwrap();

    assert_eq!(planned.body, Some(Vec::new()));
    assert_eq!(planned.header("content-type"), Some("text/plain"));
}

#[test]
fn supplied_content_type_wins_in_any_casing() {
    let mut request = captured("POST", Some(structured()));
    request.headers.push("content-TYPE", "application/vnd.api+json");

    let planned = plan_request("http://example.com/hook", &request).unwrap();

    let content_types: Vec<_> = planned
        .headers
        .iter()
        .filter(|header| header.is("content-type"))
        .collect();
    assert_eq!(
        content_types,
        vec![&Header::new("content-TYPE", "application/vnd.api+json")]
    );
}

#[test]
fn absent_payload_sends_no_body() {
    let planned = plan_request("http://example.com/hook", &captured("DELETE", None)).unwrap();

    assert!(planned.body.is_none());
    assert!(planned.header("content-type").is_none());
}

#[test]
fn excluded_headers_are_dropped_in_any_casing() {
    let request = CapturedRequest {
        method: Some("POST".to_string()),
        headers: [
            ("Host", "capture.local:5001"),
            ("X-Source", "test-script"),
            ("CONTENT-LENGTH", "42"),
            ("connection", "keep-alive"),
            ("Accept-Encoding", "gzip, deflate"),
            ("Authorization", "Bearer abc"),
            ("x-lower", "kept"),
        ]
        .into_iter()
        .collect(),
        ..Default::default()
    };

    let planned = plan_request("http://example.com/hook", &request).unwrap();

    assert_eq!(
        planned.headers,
        vec![
            Header::new("X-Source", "test-script"),
            Header::new("Authorization", "Bearer abc"),
            Header::new("x-lower", "kept"),
        ]
    );
}

#[test]
fn query_params_are_appended_not_replaced() {
    let request = CapturedRequest {
        method: Some("GET".to_string()),
        query_params: [("page", "2"), ("q", "two words")].into_iter().collect(),
        ..Default::default()
    };

    let planned = plan_request("https://example.com/hook?page=1#top", &request).unwrap();

    assert_eq!(
        planned.target,
        "https://example.com/hook?page=1&page=2&q=two+words#top"
    );
}

#[test]
fn destination_untouched_without_query_params() {
    let request = captured("POST", None);

    let planned = plan_request("http://example.com/hook?x=1", &request).unwrap();
    assert_eq!(planned.target, "http://example.com/hook?x=1");

    // Not parsed at all when nothing has to be attached.
    let planned = plan_request("not a url", &request).unwrap();
    assert_eq!(planned.target, "not a url");
}

#[test]
fn unparseable_destination_with_query_params_is_hard_error() {
    let request = CapturedRequest {
        query_params: [("a", "1")].into_iter().collect(),
        ..Default::default()
    };

    let result = plan_request("/relative/path", &request);

    assert_matches!(result, Err(ReplayError::InvalidDestination { url, .. }) if url == "/relative/path");
}

#[test]
fn unknown_method_falls_back_to_post_with_body() {
    let planned = plan_request("http://example.com/", &captured("FOO", Some(structured()))).unwrap();

    assert_eq!(planned.method, ReplayMethod::Post);
    assert!(planned.body.is_some());
    assert_eq!(planned.header("content-type"), Some("application/json"));
}

#[test]
fn missing_or_empty_method_defaults_to_post() {
    let mut request = captured("", Some(Payload::Text("hi".to_string())));
    assert_eq!(plan_request("http://example.com/", &request).unwrap().method, ReplayMethod::Post);

    request.method = None;
    let planned = plan_request("http://example.com/", &request).unwrap();
    assert_eq!(planned.method, ReplayMethod::Post);
    assert_eq!(planned.body.unwrap(), b"hi");
}

#[test]
fn method_is_matched_after_trimming() {
    assert_eq!(ReplayMethod::parse(" get "), Some(ReplayMethod::Get));
    assert_eq!(ReplayMethod::normalize(Some("   ")), ReplayMethod::Post);

    let planned = plan_request("http://example.com/", &captured(" get\t", Some(structured()))).unwrap();
    assert_eq!(planned.method, ReplayMethod::Get);
    assert!(planned.body.is_none());
}

#[test]
fn planned_request_converts_for_transport() {
    let request = CapturedRequest {
        method: Some("patch".to_string()),
        headers: Fields::from_iter([("X-Id", "7")]),
        query_params: Fields::from_iter([("v", "1")]),
        payload: Some(Payload::Text("x".to_string())),
        ..Default::default()
    };

    let outbound = plan_request("http://example.com/items", &request)
        .unwrap()
        .into_request()
        .unwrap();

    assert_eq!(outbound.method, http::Method::PATCH);
    assert_eq!(outbound.uri.to_string(), "http://example.com/items?v=1");
    assert_eq!(outbound.header("x-id"), Some("7"));
    assert_eq!(outbound.body, Some(b"x".to_vec()));
}
