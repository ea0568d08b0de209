//! Deferred form construction.
//!
//! [`FormBuilder`] collects field descriptions and turns them into parts in
//! one go, so a failing file or JSON value aborts the whole form and the
//! parts built so far are released.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::part::{Part, Source};
use crate::size;
use crate::stream::{resolve_boundary, FormStream};
use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

enum Pending {
    Ready(Part),
    Json {
        field: String,
        encoded: std::result::Result<Vec<u8>, serde_json::Error>,
    },
    File {
        field: String,
        path: PathBuf,
    },
}

impl Pending {
    async fn build(self) -> Result<Part> {
        match self {
            Pending::Ready(part) => Ok(part),
            Pending::Json { field, encoded } => match encoded {
                Ok(encoded) => Ok(Part::from_json_bytes(&field, encoded)),
                Err(source) => Err(Error::Json { field, source }),
            },
            Pending::File { field, path } => Part::file(&field, &path).await,
        }
    }
}

/// Builds a [`FormStream`] from named fields and files.
///
/// # Examples
///
/// ```no_run
/// use tokio_mpstream::FormBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = FormBuilder::new()
///     .text("title", "holiday")
///     .file("photo", "/tmp/beach.jpg")
///     .build()
///     .await?;
/// println!("{} bytes of {}", stream.content_length(), stream.content_type());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct FormBuilder {
    config: Config,
    pending: Vec<Pending>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            pending: Vec::new(),
        }
    }

    /// Uses a fixed boundary.
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.config = self.config.boundary(boundary);
        self
    }

    pub fn text(self, fieldname: &str, value: impl Into<String>) -> Self {
        self.part(Part::text(fieldname, value))
    }

    pub fn bytes(self, fieldname: &str, value: impl Into<Bytes>) -> Self {
        self.part(Part::bytes(fieldname, value))
    }

    /// A field holding `value` as JSON. Encoding errors surface from `build`.
    pub fn json<T: Serialize + ?Sized>(mut self, fieldname: &str, value: &T) -> Self {
        self.pending.push(Pending::Json {
            field: fieldname.to_string(),
            encoded: serde_json::to_vec(value),
        });
        self
    }

    /// A file upload, sized when the form is built and read lazily.
    pub fn file(mut self, fieldname: &str, path: impl Into<PathBuf>) -> Self {
        self.pending.push(Pending::File {
            field: fieldname.to_string(),
            path: path.into(),
        });
        self
    }

    /// A field read from `reader`, which must yield exactly `size` bytes.
    pub fn reader<R>(self, fieldname: &str, reader: R, size: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.part(Part::reader(fieldname, reader, size))
    }

    /// A field read from a closable source of exactly `size` bytes.
    pub fn source<S: Source + 'static>(self, fieldname: &str, source: S, size: u64) -> Self {
        self.part(Part::source(fieldname, source, size))
    }

    /// Adds a ready-made part.
    pub fn part(mut self, part: Part) -> Self {
        self.pending.push(Pending::Ready(part));
        self
    }

    /// Builds every part in order and assembles the stream.
    ///
    /// When part `i` fails, the parts built so far are closed and the error
    /// is [`Error::BuildPart`] with `index == i`. When the parts cannot be
    /// assembled, e.g. on [`Error::LengthOverflow`], every part is closed.
    pub async fn build(self) -> Result<FormStream> {
        let boundary = resolve_boundary(&self.config)?;
        if self.pending.is_empty() {
            return Err(Error::NoParts);
        }

        let mut parts = Vec::with_capacity(self.pending.len());
        let mut remaining = self.pending.into_iter().enumerate();
        while let Some((index, pending)) = remaining.next() {
            match pending.build().await {
                Ok(part) => parts.push(part),
                Err(err) => {
                    debug!(index, error = %err, "failed to build form part");
                    close_parts(&mut parts);
                    for (later, pending) in remaining {
                        if let Pending::Ready(mut part) = pending {
                            close_part(later, &mut part);
                        }
                    }
                    return Err(Error::BuildPart {
                        index,
                        source: Box::new(err),
                    });
                }
            }
        }

        if let Err(err) = size::content_length(&boundary, &parts) {
            warn!(parts = parts.len(), error = %err, "failed to assemble form");
            close_parts(&mut parts);
            return Err(err);
        }

        let config = self.config.boundary(boundary);
        FormStream::with_config(&config, parts)
    }
}

fn close_parts(parts: &mut [Part]) {
    for (index, part) in parts.iter_mut().enumerate() {
        close_part(index, part);
    }
}

fn close_part(index: usize, part: &mut Part) {
    if let Err(err) = part.body_mut().close() {
        warn!(index, error = %err, "failed to close part while aborting form");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, ReadBuf};

    struct Counted(Arc<AtomicUsize>);

    impl AsyncRead for Counted {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl Source for Counted {
        fn close(&mut self) -> io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_build_fields() {
        let mut stream = FormBuilder::new()
            .boundary("xxxtestboundaryxxx")
            .text("foo", "fux")
            .bytes("bar", &b"yolo"[..])
            .build()
            .await
            .unwrap();

        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert_eq!(out.len() as u64, stream.content_length());
        assert!(out.starts_with("--xxxtestboundaryxxx\r\n"));
        assert!(out.ends_with("yolo\r\n--xxxtestboundaryxxx--\r\n"));
    }

    #[tokio::test]
    async fn test_json_field() {
        let mut stream = FormBuilder::new()
            .boundary("b")
            .json("meta", &vec![1, 2, 3])
            .build()
            .await
            .unwrap();
        assert_eq!(
            stream.parts()[0].header().get("Content-Type"),
            Some("application/json")
        );

        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert!(out.contains("\r\n\r\n[1,2,3]\r\n--b--\r\n"));
    }

    #[tokio::test]
    async fn test_failure_closes_built_parts() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "tuple keys are not json");

        let err = FormBuilder::new()
            .boundary("b")
            .source("before", Counted(closes.clone()), 0)
            .json("broken", &bad)
            .source("after", Counted(closes.clone()), 0)
            .build()
            .await
            .unwrap_err();

        match err {
            Error::BuildPart { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, Error::Json { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overflow_closes_every_part() {
        let closes = Arc::new(AtomicUsize::new(0));

        let err = FormBuilder::new()
            .boundary("b")
            .source("a", Counted(closes.clone()), u64::MAX)
            .source("b", Counted(closes.clone()), 1)
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::LengthOverflow));
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = FormBuilder::new()
            .text("ok", "1")
            .file("upload", "/definitely/not/here.bin")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BuildPart { index: 1, .. }));
        assert!(err.to_string().starts_with("error building part[1]: file part"));
    }

    #[tokio::test]
    async fn test_checks_before_building() {
        let closes = Arc::new(AtomicUsize::new(0));
        assert!(matches!(
            FormBuilder::new().build().await,
            Err(Error::NoParts)
        ));
        assert!(matches!(
            FormBuilder::new()
                .boundary("")
                .file("upload", "/definitely/not/here.bin")
                .build()
                .await,
            Err(Error::InvalidBoundaryLength(0))
        ));
        assert!(FormBuilder::with_config(Config::new().boundary("b"))
            .source("s", Counted(closes), 0)
            .build()
            .await
            .is_ok());
    }
}
