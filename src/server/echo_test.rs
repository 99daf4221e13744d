//! Tests for the request dump format

use super::echo::{canonical_header_name, dump_request};
use axum::http::Request;

fn parts(request: Request<()>) -> axum::http::request::Parts {
    request.into_parts().0
}

#[test]
fn test_canonical_header_name() {
    assert_eq!(canonical_header_name("x-test"), "X-Test");
    assert_eq!(canonical_header_name("content-type"), "Content-Type");
    assert_eq!(canonical_header_name("x-forwarded-for"), "X-Forwarded-For");
    assert_eq!(canonical_header_name("etag"), "Etag");
}

#[test]
fn test_dump_request_line_host_and_headers() {
    let request = Request::builder()
        .method("GET")
        .uri("/foo?bar=1")
        .header("host", "sidecar.local:8080")
        .header("x-test", "v")
        .header("accept", "*/*")
        .body(())
        .expect("valid request");

    let dump = dump_request(&parts(request));

    assert_eq!(
        dump,
        "GET /foo?bar=1 HTTP/1.1\r\n\
         Host: sidecar.local:8080\r\n\
         Accept: */*\r\n\
         X-Test: v\r\n\
         \r\n"
    );
}

#[test]
fn test_dump_repeats_multi_value_headers() {
    let request = Request::builder()
        .uri("/")
        .header("x-forwarded-for", "10.0.0.1")
        .header("x-forwarded-for", "10.0.0.2")
        .body(())
        .expect("valid request");

    let dump = dump_request(&parts(request));

    assert!(dump.contains("X-Forwarded-For: 10.0.0.1\r\nX-Forwarded-For: 10.0.0.2\r\n"));
    assert!(!dump.contains("Host:"), "no host header, no host line");
}

#[test]
fn test_dump_keeps_absolute_form_target() {
    let request = Request::builder()
        .uri("http://upstream.example/path?q=1")
        .body(())
        .expect("valid request");

    let dump = dump_request(&parts(request));

    assert!(dump.starts_with("GET http://upstream.example/path?q=1 HTTP/1.1\r\n"));
    assert!(dump.contains("Host: upstream.example\r\n"));
}

#[test]
fn test_dump_never_contains_body() {
    let (parts, body) = Request::builder()
        .method("POST")
        .uri("/submit")
        .body("secret-payload")
        .expect("valid request")
        .into_parts();

    let dump = dump_request(&parts);

    assert!(!body.is_empty());
    assert!(!dump.contains("secret-payload"));
    assert!(dump.ends_with("\r\n\r\n"));
}

#[test]
fn test_dump_writes_transfer_encoding_once_and_drops_trailer() {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("host", "sidecar.local")
        .header("transfer-encoding", "gzip")
        .header("transfer-encoding", "chunked")
        .header("trailer", "X-Checksum")
        .header("accept", "*/*")
        .body(())
        .expect("valid request");

    let dump = dump_request(&parts(request));

    assert_eq!(
        dump,
        "POST /upload HTTP/1.1\r\n\
         Host: sidecar.local\r\n\
         Transfer-Encoding: gzip,chunked\r\n\
         Accept: */*\r\n\
         \r\n"
    );
}
