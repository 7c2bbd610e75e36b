use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::cache::{object_key, ObjectCache};
use crate::request::parse_request;
use crate::upstream;
use crate::MAX_REQUEST_SIZE;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Accept loop: every connection gets its own detached task and carries at
/// most one request. Workers are never joined; cleanup happens when each
/// task drops its socket.
pub async fn run(listener: TcpListener, cache: ObjectCache) {
    loop {
        match listener.accept().await {
            Ok((client, addr)) => {
                debug!("accepted connection from {addr}");
                let cache = cache.clone();
                tokio::spawn(async move {
                    handle_client(client, cache).await;
                });
            }
            Err(e) => error!("failed to accept connection: {e}"),
        }
    }
}

/// Serves one request end to end.
///
/// Every refusal path just returns, dropping the socket; the client never
/// sees a synthesized error response.
pub async fn handle_client(mut client: TcpStream, cache: ObjectCache) {
    let Some(head) = read_request_head(&mut client).await else {
        return;
    };
    let Some(parsed) = parse_request(&head) else {
        debug!("dropping unserviceable request");
        return;
    };

    let key = object_key(&parsed.hostname, &parsed.port, &parsed.path);

    if let Some(cached) = cache.get(key).await {
        info!(
            "CACHE HIT: {}:{}{}",
            parsed.hostname, parsed.port, parsed.path
        );
        let _ = client.write_all(&cached).await;
        return;
    }
    debug!(
        "CACHE MISS: {}:{}{}",
        parsed.hostname, parsed.port, parsed.path
    );

    match upstream::relay_from_origin(&mut client, &parsed).await {
        Ok(Some(body)) => {
            let size = body.len();
            if cache.insert(key, body).await {
                info!(
                    "CACHED: {}:{}{} ({size} bytes)",
                    parsed.hostname, parsed.port, parsed.path
                );
            }
        }
        Ok(None) => {}
        Err(e) => debug!(
            "transfer for {}:{}{} aborted: {e}",
            parsed.hostname, parsed.port, parsed.path
        ),
    }
}

/// Reads until the blank line ending the header block.
///
/// Returns `None` on a short read, a read error, a stalled client, or a
/// head that outgrows [`MAX_REQUEST_SIZE`].
async fn read_request_head(client: &mut TcpStream) -> Option<BytesMut> {
    let mut buffer = BytesMut::with_capacity(8192);
    loop {
        match timeout(REQUEST_TIMEOUT, client.read_buf(&mut buffer)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => return None,
            Ok(Ok(_)) => {}
        }
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
            return Some(buffer);
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            debug!("request head exceeded {MAX_REQUEST_SIZE} bytes, dropping");
            return None;
        }
    }
}
