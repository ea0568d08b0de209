//! `Bytes` chunk stream over a [`FormStream`].

use super::FormStream;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::poll_read_buf;
use tracing::warn;

/// A stream of body chunks, suitable as an HTTP request body.
///
/// The parts are closed when the form ends or a read fails. A close failure
/// at the end is yielded as a last error item.
#[pin_project]
#[derive(Debug)]
pub struct BodyStream {
    #[pin]
    inner: FormStream,
    buf: BytesMut,
    chunk_size: usize,
    done: bool,
}

impl BodyStream {
    pub(super) fn new(inner: FormStream, chunk_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            chunk_size,
            done: false,
        }
    }

    pub fn content_length(&self) -> u64 {
        self.inner.content_length()
    }

    pub fn content_type(&self) -> String {
        self.inner.content_type()
    }

    /// Gives the form back, e.g. to inspect its progress after a failure.
    pub fn into_inner(self) -> FormStream {
        self.inner
    }
}

impl Stream for BodyStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        if this.buf.capacity() == 0 {
            this.buf.reserve(*this.chunk_size);
        }

        match poll_read_buf(this.inner.as_mut(), cx, &mut *this.buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => {
                *this.done = true;
                if let Err(close_err) = this.inner.get_mut().close() {
                    warn!(error = %close_err, "failed to close parts after read error");
                }
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(Ok(0)) => {
                *this.done = true;
                match this.inner.get_mut().close() {
                    Ok(()) => Poll::Ready(None),
                    Err(err) => Poll::Ready(Some(Err(io::Error::new(io::ErrorKind::Other, err)))),
                }
            }
            Poll::Ready(Ok(_)) => Poll::Ready(Some(Ok(this.buf.split().freeze()))),
        }
    }
}
