use crate::MAX_EXTRA_HEADER_BYTES;

/// Request headers the proxy owns and replaces with its own versions.
const FILTERED_HEADERS: [&str; 4] = ["host", "user-agent", "connection", "proxy-connection"];

/// Normalized view of one client request, ready for rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub hostname: String,
    /// Verbatim decimal string as given by the client, `"80"` when omitted.
    pub port: String,
    pub path: String,
    /// Client header block minus the filtered names, order preserved, one
    /// `Name: value\r\n` line per header.
    pub extra_headers: String,
}

/// Splits a request URI into `(hostname, port, path)`.
///
/// Origin-form URIs (`/path`) leave the hostname empty for the caller to
/// fill from the `Host` header. The port defaults to `"80"` and the path to
/// `"/"`; neither is validated beyond that.
pub fn split_uri(uri: &str) -> (String, String, String) {
    let rest = strip_http_scheme(uri);

    if rest.starts_with('/') {
        return (String::new(), "80".to_string(), rest.to_string());
    }

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx..].to_string()),
        None => (rest, "/".to_string()),
    };

    let (hostname, port) = match authority.split_once(':') {
        Some((host, port)) => (host.to_string(), port.to_string()),
        None => (authority.to_string(), "80".to_string()),
    };

    (hostname, port, path)
}

fn strip_http_scheme(uri: &str) -> &str {
    if uri.len() >= 7 && uri.as_bytes()[..7].eq_ignore_ascii_case(b"http://") {
        &uri[7..]
    } else {
        uri
    }
}

/// Overwrites the hostname, and the port when a colon is present, from a raw
/// `Host:` value.
fn apply_host_fallback(parsed: &mut ParsedRequest, host_value: &str) {
    let trimmed = host_value.trim();
    match trimmed.split_once(':') {
        Some((host, port)) => {
            parsed.hostname = host.to_string();
            parsed.port = port.to_string();
        }
        None => parsed.hostname = trimmed.to_string(),
    }
}

fn is_filtered(name: &str) -> bool {
    FILTERED_HEADERS
        .iter()
        .any(|filtered| name.eq_ignore_ascii_case(filtered))
}

/// Parses a complete request head into a [`ParsedRequest`].
///
/// Returns `None` for anything the proxy refuses to serve: an incomplete or
/// malformed head, a non-GET method, or a request whose hostname cannot be
/// resolved from either the URI or the `Host` header. Callers drop the
/// connection silently in that case.
pub fn parse_request(head: &[u8]) -> Option<ParsedRequest> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);

    match req.parse(head) {
        Ok(httparse::Status::Complete(_)) => {}
        _ => return None,
    }
    if req.method? != "GET" {
        return None;
    }

    let (hostname, port, path) = split_uri(req.path?);
    let mut parsed = ParsedRequest {
        hostname,
        port,
        path,
        extra_headers: String::new(),
    };

    let mut host_header: Option<String> = None;
    let mut overflowed = false;
    for header in req.headers.iter() {
        let value = String::from_utf8_lossy(header.value);
        if header.name.eq_ignore_ascii_case("host") {
            host_header = Some(value.into_owned());
            continue;
        }
        if is_filtered(header.name) {
            continue;
        }
        // Once the pass-through block is full, every later header is
        // dropped, not just the one that overflowed.
        let line = format!("{}: {}\r\n", header.name, value);
        if overflowed || parsed.extra_headers.len() + line.len() > MAX_EXTRA_HEADER_BYTES {
            overflowed = true;
            continue;
        }
        parsed.extra_headers.push_str(&line);
    }

    if parsed.hostname.is_empty() {
        apply_host_fallback(&mut parsed, &host_header?);
    }
    if parsed.hostname.is_empty() {
        return None;
    }

    Some(parsed)
}
