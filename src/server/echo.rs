//! Plain-text dump of an inbound request
//!
//! Output is the request line, a `Host` line, a single `Transfer-Encoding`
//! line when the request has one, then every other header sorted by
//! canonical name, one line per value, CRLF terminated and followed by a
//! blank line. `Trailer` is left out, and the body is never included.

use axum::http::request::Parts;
use axum::http::{header, HeaderName};
use std::fmt::Write;

/// Headers written separately or not at all
fn is_excluded(name: &HeaderName) -> bool {
    name == header::HOST || name == header::TRANSFER_ENCODING || name == header::TRAILER
}

/// Render the head of a request as it arrived on the wire
pub fn dump_request(parts: &Parts) -> String {
    let mut out = String::new();

    // Absolute-form targets (proxy requests) are kept whole
    let target = if parts.uri.scheme().is_some() {
        parts.uri.to_string()
    } else {
        parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string())
    };
    let _ = write!(out, "{} {} {:?}\r\n", parts.method, target, parts.version);

    let host = parts
        .headers
        .get(header::HOST)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .or_else(|| parts.uri.authority().map(|a| a.to_string()));
    if let Some(host) = host {
        let _ = write!(out, "Host: {}\r\n", host);
    }

    let codings: Vec<String> = parts
        .headers
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect();
    if !codings.is_empty() {
        let _ = write!(out, "Transfer-Encoding: {}\r\n", codings.join(","));
    }

    let mut names: Vec<&HeaderName> = parts
        .headers
        .keys()
        .filter(|name| !is_excluded(name))
        .collect();
    names.sort_by_cached_key(|name| canonical_header_name(name.as_str()));

    for name in names {
        let canonical = canonical_header_name(name.as_str());
        for value in parts.headers.get_all(name) {
            let _ = write!(
                out,
                "{}: {}\r\n",
                canonical,
                String::from_utf8_lossy(value.as_bytes())
            );
        }
    }

    out.push_str("\r\n");
    out
}

/// `x-forwarded-for` -> `X-Forwarded-For`
pub fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let mapped = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            mapped
        })
        .collect()
}
