//! Chunked Copy Engine
//!
//! Moves a measured number of already-available bytes from a source to a
//! sink: whole chunks first, then one remainder-sized chunk. Every chunk gets
//! a buffer of exactly its own length.

use std::io;
use std::num::NonZeroUsize;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Result of one drain cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub bytes: u64,
    pub chunks: usize,
}

impl CopyReport {
    fn record(&mut self, len: usize) {
        self.bytes += len as u64;
        self.chunks += 1;
    }
}

/// Drain `available` bytes from `source` into `sink` in `chunk_length` pieces
/// and flush the sink once at the end.
///
/// Bytes that arrive while the drain runs are left for the next cycle.
pub async fn copy_available<R, W>(
    source: &mut R,
    sink: &mut W,
    available: NonZeroUsize,
    chunk_length: NonZeroUsize,
) -> io::Result<CopyReport>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let available = available.get();
    let chunk_length = chunk_length.get();
    let mut report = CopyReport::default();

    for _ in 0..available / chunk_length {
        move_chunk(source, sink, chunk_length).await?;
        report.record(chunk_length);
    }

    let remainder = available % chunk_length;
    if remainder > 0 {
        move_chunk(source, sink, remainder).await?;
        report.record(remainder);
    }

    sink.flush().await?;
    Ok(report)
}

async fn move_chunk<R, W>(source: &mut R, sink: &mut W, len: usize) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut chunk = vec![0u8; len];
    source.read_exact(&mut chunk).await?;
    sink.write_all(&chunk).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Sink that accepts every write whole and remembers its size
    #[derive(Default)]
    struct RecordingSink {
        data: Vec<u8>,
        writes: Vec<usize>,
        flushes: usize,
    }

    impl AsyncWrite for RecordingSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.data.extend_from_slice(buf);
            self.writes.push(buf.len());
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.flushes += 1;
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_whole_chunks_plus_remainder() {
        let payload = pattern(250_000);
        let mut source: &[u8] = &payload;
        let mut sink = RecordingSink::default();

        let report = copy_available(&mut source, &mut sink, nz(250_000), nz(100_000))
            .await
            .unwrap();

        assert_eq!(sink.writes, vec![100_000, 100_000, 50_000]);
        assert_eq!(sink.data, payload);
        assert_eq!(sink.flushes, 1);
        assert_eq!(report, CopyReport { bytes: 250_000, chunks: 3 });
    }

    #[tokio::test]
    async fn test_write_sizes_cover_available_exactly() {
        let cases = [(1, 1), (1, 7), (7, 7), (8, 7), (13, 4), (1000, 3), (64, 100)];
        for &(available, chunk) in &cases {
            let payload = pattern(available + 10);
            let mut source: &[u8] = &payload;
            let mut sink = RecordingSink::default();

            copy_available(&mut source, &mut sink, nz(available), nz(chunk))
                .await
                .unwrap();

            assert_eq!(sink.writes.len(), (available + chunk - 1) / chunk);
            assert_eq!(sink.writes.iter().sum::<usize>(), available);
            let (last, rest) = sink.writes.split_last().unwrap();
            assert!(rest.iter().all(|&w| w == chunk));
            assert!(*last <= chunk);
            assert_eq!(sink.data, &payload[..available]);
        }
    }

    #[tokio::test]
    async fn test_leaves_unmeasured_bytes_in_source() {
        let payload = b"measured|later";
        let mut source: &[u8] = payload;
        let mut sink = RecordingSink::default();

        copy_available(&mut source, &mut sink, nz(9), nz(4)).await.unwrap();

        assert_eq!(sink.data, b"measured|");
        assert_eq!(source, b"later");
    }

    #[tokio::test]
    async fn test_short_source_is_an_error() {
        let mut source: &[u8] = b"abc";
        let mut sink = RecordingSink::default();

        let err = copy_available(&mut source, &mut sink, nz(10), nz(4))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
