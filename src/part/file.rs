//! Lazily opened file bodies.

use futures::future::BoxFuture;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::trace;

enum State {
    Unopened,
    Opening(BoxFuture<'static, io::Result<File>>),
    Open(File),
    Closed,
}

/// A file body that is opened on its first read.
///
/// Parts that are never read never hold a descriptor. The handle is released
/// by [`LazyFile::close`] or on drop.
pub struct LazyFile {
    path: PathBuf,
    state: State,
}

impl LazyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: State::Unopened,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a file handle is currently held.
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Releases the file handle. Later reads fail.
    pub fn close(&mut self) -> io::Result<()> {
        if matches!(self.state, State::Open(_) | State::Opening(_)) {
            trace!(path = %self.path.display(), "closing file part");
        }
        self.state = State::Closed;
        Ok(())
    }
}

impl AsyncRead for LazyFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                State::Unopened => {
                    trace!(path = %this.path.display(), "opening file part");
                    this.state = State::Opening(Box::pin(File::open(this.path.clone())));
                }
                State::Opening(open) => match ready!(open.as_mut().poll(cx)) {
                    Ok(file) => this.state = State::Open(file),
                    Err(e) => {
                        // a completed future must not be polled again
                        this.state = State::Unopened;
                        return Poll::Ready(Err(io::Error::new(
                            e.kind(),
                            format!("opening {}: {}", this.path.display(), e),
                        )));
                    }
                },
                State::Open(file) => return Pin::new(file).poll_read(cx, buf),
                State::Closed => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("file part {} already closed", this.path.display()),
                    )));
                }
            }
        }
    }
}

impl std::fmt::Debug for LazyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Unopened => "unopened",
            State::Opening(_) => "opening",
            State::Open(_) => "open",
            State::Closed => "closed",
        };
        f.debug_struct("LazyFile")
            .field("path", &self.path)
            .field("state", &state)
            .finish()
    }
}
