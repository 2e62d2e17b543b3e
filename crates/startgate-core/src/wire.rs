//! Unframed text exchange over a connected stream.
//!
//! There is no length prefix or delimiter. Each [`send`] writes one small
//! chunk and each [`receive`] performs a single read of at most
//! [`MAX_MESSAGE_BYTES`]. The protocol relies on the transport delivering a
//! tiny write as one read; nothing here reassembles fragments.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_BYTES;
use crate::errors::WireError;

/// Write `text` to the stream and flush it.
pub async fn send<W>(stream: &mut W, text: &str) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(text.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one chunk and decode it as text.
///
/// Returns `Ok(None)` once the peer has closed its side. Invalid UTF-8 is
/// replaced rather than rejected so a garbled peer only produces noise.
pub async fn receive<R>(stream: &mut R) -> Result<Option<String>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; MAX_MESSAGE_BYTES];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned()))
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    #[tokio::test]
    async fn send_then_receive() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        send(&mut client, "start").await.unwrap();
        let got = receive(&mut server).await.unwrap();
        assert_eq!(got.as_deref(), Some("start"));
    }

    #[tokio::test]
    async fn receive_returns_none_after_peer_close() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert_eq!(receive(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn receive_caps_chunk_size() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let long = "x".repeat(MAX_MESSAGE_BYTES + 500);
        send(&mut client, &long).await.unwrap();

        let first = receive(&mut server).await.unwrap().unwrap();
        assert_eq!(first.len(), MAX_MESSAGE_BYTES);
        let rest = receive(&mut server).await.unwrap().unwrap();
        assert_eq!(rest.len(), 500);
    }

    #[tokio::test]
    async fn receive_replaces_invalid_utf8() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[b's', 0xff, b't']).await.unwrap();
        let got = receive(&mut server).await.unwrap().unwrap();
        assert_eq!(got, "s\u{fffd}t");
    }

    #[tokio::test]
    async fn receive_surfaces_read_errors() {
        let err = receive(&mut FailingReader).await.unwrap_err();
        assert_eq!(err.error_kind(), "connection_reset");
    }

    #[tokio::test]
    async fn send_to_closed_peer_fails() {
        let (mut client, server) = tokio::io::duplex(64);
        drop(server);
        let err = send(&mut client, "start").await.unwrap_err();
        assert!(matches!(err, WireError::Io(_)));
    }
}
