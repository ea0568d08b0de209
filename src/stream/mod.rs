//! The streaming multipart encoder.
//!
//! [`FormStream`] yields delimiters, header blocks and part bodies as one
//! byte sequence. Its length is computed from part metadata before the first
//! byte, and every body is pulled exactly once, in order.

mod body_stream;

pub use body_stream::BodyStream;

use crate::boundary::{self, Delimiters};
use crate::config::Config;
use crate::error::{CloseError, Error, PartCloseFailure, Result, SizeMismatch};
use crate::part::Part;
use crate::size;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, trace, warn};

/// The section of the body the encoder is emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening or middle delimiter before `parts[index]`.
    Delimiter,
    /// Header block of `parts[index]`.
    Header,
    /// Body of `parts[index]`.
    Body,
    /// Closing delimiter.
    Trailer,
    /// Everything has been emitted.
    Done,
}

/// A snapshot of the encoder position, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    /// Index of the current part.
    pub index: usize,
    /// Bytes already emitted from the current section.
    pub offset: u64,
}

/// A `multipart/form-data` body with a known length.
///
/// # Examples
///
/// ```
/// use tokio_mpstream::{FormStream, Part};
/// use tokio::io::AsyncReadExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut stream = FormStream::with_boundary(
///     "xxxtestboundaryxxx",
///     vec![Part::text("foo", "fux"), Part::text("bar", "yolo")],
/// )?;
/// assert_eq!(stream.content_length(), 171);
///
/// let mut body = Vec::new();
/// stream.read_to_end(&mut body).await?;
/// stream.close()?;
/// assert_eq!(body.len() as u64, 171);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FormStream {
    boundary: String,
    delimiters: Delimiters,
    content_length: u64,
    parts: Vec<Part>,
    verify_sizes: bool,
    chunk_size: usize,

    phase: Phase,
    index: usize,
    offset: usize,
    // only the current part's block is rendered
    header_block: Vec<u8>,
    body_read: u64,
    deferred_error: Option<io::Error>,
}

impl FormStream {
    /// Builds a stream over `parts` with a random boundary.
    pub fn new(parts: Vec<Part>) -> Result<Self> {
        Self::with_config(&Config::default(), parts)
    }

    /// Builds a stream over `parts` with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>, parts: Vec<Part>) -> Result<Self> {
        Self::with_config(&Config::new().boundary(boundary), parts)
    }

    /// Builds a stream over `parts`.
    ///
    /// Fails on an invalid boundary, an empty part list, or a total length
    /// that does not fit in a `u64`.
    pub fn with_config(config: &Config, parts: Vec<Part>) -> Result<Self> {
        let boundary = resolve_boundary(config)?;
        if parts.is_empty() {
            return Err(Error::NoParts);
        }
        let content_length = size::content_length(&boundary, &parts)?;

        debug!(
            boundary = %boundary,
            parts = parts.len(),
            content_length,
            "built multipart stream"
        );

        Ok(Self {
            delimiters: Delimiters::new(&boundary),
            boundary,
            content_length,
            parts,
            verify_sizes: config.get_verify_sizes(),
            chunk_size: config.get_chunk_size(),
            phase: Phase::Delimiter,
            index: 0,
            // the first part takes the middle delimiter without its CRLF
            offset: 2,
            header_block: Vec::new(),
            body_read: 0,
            deferred_error: None,
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value for this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact number of bytes the stream yields.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn progress(&self) -> Progress {
        let offset = match self.phase {
            Phase::Body => self.body_read,
            _ => self.offset as u64,
        };
        Progress {
            phase: self.phase,
            index: self.index,
            offset,
        }
    }

    /// Whether end-of-stream has been reached.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Closes every part body.
    ///
    /// All bodies are visited even when some fail. Safe to call at any
    /// point, and more than once if the bodies tolerate it.
    pub fn close(&mut self) -> std::result::Result<(), CloseError> {
        let failures: Vec<_> = self
            .parts
            .iter_mut()
            .enumerate()
            .filter_map(|(index, part)| {
                part.body_mut().close().err().map(|source| {
                    warn!(index, error = %source, "failed to close part body");
                    PartCloseFailure { index, source }
                })
            })
            .collect();

        match CloseError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Turns the stream into a stream of `Bytes` chunks.
    pub fn into_body_stream(self) -> BodyStream {
        let chunk_size = self.chunk_size;
        BodyStream::new(self, chunk_size)
    }

    fn enter_header(&mut self) {
        self.header_block.clear();
        self.parts[self.index]
            .header()
            .encode_into(&mut self.header_block);
        self.phase = Phase::Header;
    }

    /// Reads from the current body into `buf`, returning the byte count.
    ///
    /// With `verify_sizes`, reads stop at the declared size and any further
    /// body byte goes to a scratch buffer, so an overrun is never emitted.
    fn poll_body(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<usize>> {
        let left = self.parts[self.index].size().saturating_sub(self.body_read);
        let body = self.parts[self.index].body_mut();

        if !self.verify_sizes {
            let before = buf.filled().len();
            ready!(Pin::new(body).poll_read(cx, buf))?;
            return Poll::Ready(Ok(buf.filled().len() - before));
        }

        if left == 0 {
            let mut scratch = [0u8; 1];
            let mut scratch = ReadBuf::new(&mut scratch);
            ready!(Pin::new(body).poll_read(cx, &mut scratch))?;
            // zero tells advance_body the body ended; a stray byte makes it fail
            self.body_read += scratch.filled().len() as u64;
            return Poll::Ready(Ok(0));
        }

        let limit = usize::try_from(left).unwrap_or(usize::MAX).min(buf.remaining());
        let mut capped = ReadBuf::new(buf.initialize_unfilled_to(limit));
        ready!(Pin::new(body).poll_read(cx, &mut capped))?;
        let n = capped.filled().len();
        buf.advance(n);
        Poll::Ready(Ok(n))
    }

    /// Accounts for `n` body bytes; zero means the body is exhausted.
    fn advance_body(&mut self, n: usize) -> io::Result<()> {
        let declared = self.parts[self.index].size();

        if n > 0 {
            self.body_read += n as u64;
            if self.verify_sizes && self.body_read > declared {
                return Err(self.size_mismatch(declared).into());
            }
            return Ok(());
        }

        if self.verify_sizes && self.body_read != declared {
            return Err(self.size_mismatch(declared).into());
        }

        trace!(index = self.index, bytes = self.body_read, "part body complete");
        self.index += 1;
        self.body_read = 0;
        self.offset = 0;
        self.phase = if self.index < self.parts.len() {
            Phase::Delimiter
        } else {
            Phase::Trailer
        };
        Ok(())
    }

    fn size_mismatch(&self, declared: u64) -> SizeMismatch {
        SizeMismatch {
            index: self.index,
            declared,
            actual: self.body_read,
        }
    }
}

impl AsyncRead for FormStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if let Some(err) = this.deferred_error.take() {
            return Poll::Ready(Err(err));
        }

        let start = buf.filled().len();

        loop {
            if buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            match this.phase {
                Phase::Delimiter => {
                    if copy_out(this.delimiters.middle(), &mut this.offset, buf) {
                        this.enter_header();
                    }
                }
                Phase::Header => {
                    if copy_out(&this.header_block, &mut this.offset, buf) {
                        this.phase = Phase::Body;
                    }
                }
                Phase::Body => {
                    let result = match this.poll_body(cx, buf) {
                        Poll::Pending if buf.filled().len() > start => {
                            return Poll::Ready(Ok(()));
                        }
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(result) => result.and_then(|n| this.advance_body(n)),
                    };

                    if let Err(err) = result {
                        // hand out what this call produced, fail on the next one
                        if buf.filled().len() > start {
                            this.deferred_error = Some(err);
                            return Poll::Ready(Ok(()));
                        }
                        return Poll::Ready(Err(err));
                    }
                }
                Phase::Trailer => {
                    if copy_out(this.delimiters.close(), &mut this.offset, buf) {
                        this.phase = Phase::Done;
                        debug!(
                            boundary = %this.boundary,
                            content_length = this.content_length,
                            "multipart stream finished"
                        );
                    }
                }
                Phase::Done => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// Copies `src[offset..]` into `buf` as far as it fits. Returns true and
/// resets `offset` once `src` is fully copied.
fn copy_out(src: &[u8], offset: &mut usize, buf: &mut ReadBuf<'_>) -> bool {
    let n = (src.len() - *offset).min(buf.remaining());
    buf.put_slice(&src[*offset..*offset + n]);
    *offset += n;

    if *offset == src.len() {
        *offset = 0;
        true
    } else {
        false
    }
}

pub(crate) fn resolve_boundary(config: &Config) -> Result<String> {
    match config.get_boundary() {
        Some(boundary) => {
            boundary::validate(boundary)?;
            Ok(boundary.to_string())
        }
        None => boundary::generate(),
    }
}
