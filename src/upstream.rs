use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::request::ParsedRequest;
use crate::MAX_OBJECT_SIZE;

/// Fixed identity presented to origins in place of whatever the client sent.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 8192;

/// Renders the HTTP/1.0 request sent to the origin.
///
/// The first five lines are always the proxy's own: request line, `Host`
/// (port elided only when the string is exactly `"80"`), the fixed
/// user-agent, and `Connection` / `Proxy-Connection: close`. The client's
/// surviving headers follow untouched.
pub fn build_origin_request(req: &ParsedRequest) -> Vec<u8> {
    let host_line = if req.port == "80" {
        format!("Host: {}\r\n", req.hostname)
    } else {
        format!("Host: {}:{}\r\n", req.hostname, req.port)
    };
    format!(
        "GET {} HTTP/1.0\r\n\
         {host_line}\
         User-Agent: {USER_AGENT}\r\n\
         Connection: close\r\n\
         Proxy-Connection: close\r\n\
         {}\r\n",
        req.path, req.extra_headers
    )
    .into_bytes()
}

async fn timed<F, T>(fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout(TRANSFER_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "transfer stalled")),
    }
}

/// Fetches the response for `req` from its origin, streaming it to `client`
/// chunk by chunk as it arrives.
///
/// A side buffer accumulates the forwarded bytes; a response that outgrows
/// [`MAX_OBJECT_SIZE`] keeps flowing to the client but is no longer a cache
/// candidate. On clean EOF the buffered bytes are returned for the caller to
/// insert; any mid-transfer error propagates and nothing is returned.
pub async fn relay_from_origin(
    client: &mut TcpStream,
    req: &ParsedRequest,
) -> io::Result<Option<Bytes>> {
    let addr = format!("{}:{}", req.hostname, req.port);
    let mut origin = match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr.as_str())).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "origin connect timed out",
            ))
        }
    };

    let request = build_origin_request(req);
    timed(origin.write_all(&request)).await?;

    let mut chunk = BytesMut::with_capacity(CHUNK_SIZE);
    let mut stash = BytesMut::new();
    let mut cacheable = true;

    loop {
        chunk.clear();
        let n = timed(origin.read_buf(&mut chunk)).await?;
        if n == 0 {
            break;
        }
        timed(client.write_all(&chunk)).await?;

        if cacheable {
            if stash.len() + n > MAX_OBJECT_SIZE {
                debug!("response for {addr} exceeds object cap, forwarding uncached");
                cacheable = false;
                stash = BytesMut::new();
            } else {
                stash.extend_from_slice(&chunk);
            }
        }
    }

    if cacheable && !stash.is_empty() {
        Ok(Some(stash.freeze()))
    } else {
        Ok(None)
    }
}
