//! Part body sources.

use super::file::LazyFile;
use bytes::Bytes;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// A byte source that holds a resource needing an explicit close.
///
/// Implement this for bodies whose release can fail, such as handles to
/// remote objects. Plain readers without such a resource go in
/// [`Body::Reader`] instead.
pub trait Source: AsyncRead + Send + Unpin {
    /// Releases the underlying resource.
    fn close(&mut self) -> io::Result<()>;
}

/// The body of one part, read once from start to end.
pub enum Body {
    /// In-memory bytes.
    Bytes(Cursor<Bytes>),
    /// A file opened on first read.
    File(LazyFile),
    /// Any reader; closing it is a no-op.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// A reader with a fallible close.
    Source(Box<dyn Source>),
}

impl Body {
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Body::Bytes(Cursor::new(data.into()))
    }

    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Body::Reader(Box::new(reader))
    }

    pub fn source<S: Source + 'static>(source: S) -> Self {
        Body::Source(Box::new(source))
    }

    /// Closes the underlying resource, if there is one.
    pub fn close(&mut self) -> io::Result<()> {
        match self {
            Body::Bytes(_) | Body::Reader(_) => Ok(()),
            Body::File(file) => file.close(),
            Body::Source(source) => source.close(),
        }
    }
}

impl AsyncRead for Body {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Body::Bytes(cursor) => Pin::new(cursor).poll_read(cx, buf),
            Body::File(file) => Pin::new(file).poll_read(cx, buf),
            Body::Reader(reader) => Pin::new(reader).poll_read(cx, buf),
            Body::Source(source) => Pin::new(source).poll_read(cx, buf),
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Bytes(cursor) => f
                .debug_struct("Bytes")
                .field("len", &cursor.get_ref().len())
                .finish(),
            Body::File(file) => std::fmt::Debug::fmt(file, f),
            Body::Reader(_) => f.write_str("Reader"),
            Body::Source(_) => f.write_str("Source"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self {
        Body::bytes(data)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::bytes(data)
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Body::bytes(data)
    }
}

impl From<&'static str> for Body {
    fn from(data: &'static str) -> Self {
        Body::bytes(data)
    }
}

impl From<LazyFile> for Body {
    fn from(file: LazyFile) -> Self {
        Body::File(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    struct Closing {
        data: &'static [u8],
        closed: bool,
    }

    impl AsyncRead for Closing {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let n = self.data.len().min(buf.remaining());
            buf.put_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Poll::Ready(Ok(()))
        }
    }

    impl Source for Closing {
        fn close(&mut self) -> io::Result<()> {
            if self.closed {
                return Err(io::Error::new(io::ErrorKind::Other, "closed twice"));
            }
            self.closed = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_bytes_body() {
        let mut body = Body::from("hello");
        let mut out = String::new();
        body.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello");
        assert!(body.close().is_ok());
        assert_eq!(format!("{:?}", body), "Bytes { len: 5 }");
    }

    #[tokio::test]
    async fn test_reader_body() {
        let mut body = Body::reader(&b"from a reader"[..]);
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"from a reader");
        assert!(body.close().is_ok());
    }

    #[tokio::test]
    async fn test_source_body_forwards_close() {
        let mut body = Body::source(Closing {
            data: b"src",
            closed: false,
        });
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"src");
        assert!(body.close().is_ok());
        assert!(body.close().is_err());
    }
}
