//! Relay Endpoints
//!
//! An endpoint is a connected byte stream owned by exactly one relay session.
//! It splits into a [`Source`] the session reads from and a sink it writes to,
//! and is closed by handing both halves back.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::RelayOptions;

/// Readable half of an endpoint that can report pending bytes
pub trait Source: AsyncRead + Unpin + Send {
    /// Wait until the source is readable and return how many bytes can be
    /// read without blocking. `Ok(0)` means end of stream.
    fn available(&mut self) -> impl Future<Output = io::Result<usize>> + Send;
}

/// Buffered readers report whatever their buffer holds after a fill.
impl<R> Source for BufReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn available(&mut self) -> io::Result<usize> {
        Ok(self.fill_buf().await?.len())
    }
}

/// Socket read half measured through `peek`, so nothing is consumed until
/// the copy engine reads it.
#[derive(Debug)]
pub struct PeekSource {
    half: OwnedReadHalf,
    probe: Vec<u8>,
}

impl PeekSource {
    /// Wrap a read half; at most `window` bytes are reported per measurement
    pub fn new(half: OwnedReadHalf, window: usize) -> Self {
        Self {
            half,
            probe: vec![0u8; window.max(1)],
        }
    }

    pub fn into_inner(self) -> OwnedReadHalf {
        self.half
    }
}

impl Source for PeekSource {
    async fn available(&mut self) -> io::Result<usize> {
        self.half.peek(&mut self.probe).await
    }
}

impl AsyncRead for PeekSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.half).poll_read(cx, buf)
    }
}

/// A connected stream a relay session can own
pub trait Endpoint: Send + 'static {
    type Source: Source + 'static;
    type Sink: AsyncWrite + Unpin + Send + 'static;

    /// Human-readable peer description for logs
    fn label(&self) -> String;

    /// Split into independently owned read and write halves
    fn split(self, options: &RelayOptions) -> (Self::Source, Self::Sink);

    /// Release the endpoint. Called once, after both pumps have stopped.
    fn close(source: Self::Source, sink: Self::Sink) -> impl Future<Output = io::Result<()>> + Send;
}

impl Endpoint for TcpStream {
    type Source = PeekSource;
    type Sink = OwnedWriteHalf;

    fn label(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn split(self, options: &RelayOptions) -> (PeekSource, OwnedWriteHalf) {
        let (read, write) = self.into_split();
        (PeekSource::new(read, options.peek_window.get()), write)
    }

    async fn close(source: PeekSource, sink: OwnedWriteHalf) -> io::Result<()> {
        let mut stream = source.into_inner().reunite(sink).map_err(io::Error::other)?;
        stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_peek_source_does_not_consume() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();

        client.write_all(b"hello").await.unwrap();
        client.flush().await.unwrap();

        let (mut source, _sink) = Endpoint::split(server, &RelayOptions::default());
        let mut available = 0;
        while available < 5 {
            available = source.available().await.unwrap();
        }
        assert_eq!(available, 5);

        let mut buf = [0u8; 5];
        source.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_peek_source_reports_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        drop(client);

        let (mut source, _sink) = Endpoint::split(server, &RelayOptions::default());
        assert_eq!(source.available().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_buf_reader_source() {
        let mock = tokio_test::io::Builder::new().read(b"abc").build();
        let mut source = BufReader::new(mock);

        assert_eq!(source.available().await.unwrap(), 3);
        let mut buf = [0u8; 3];
        source.read_exact(&mut buf).await.unwrap();
        assert_eq!(source.available().await.unwrap(), 0);
    }
}
