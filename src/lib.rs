//! Streaming `multipart/form-data` bodies with a known length, async-first.
//!
//! This crate encodes form fields and files (RFC 2046, RFC 7578) as a single
//! byte stream whose exact length is computed before the first byte is
//! produced, so an HTTP client can send a `Content-Length` header without
//! buffering the body:
//! - [`FormStream`] is the encoder; it implements `tokio::io::AsyncRead`
//! - [`Part`] describes one field or file; file bodies open lazily
//! - [`FormBuilder`] assembles a form and cleans up when a part fails
//! - [`BodyStream`] adapts the form to a stream of `Bytes` chunks
//!
//! # Examples
//!
//! ```
//! use tokio_mpstream::{FormStream, Part};
//! use tokio::io::AsyncReadExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut form = FormStream::new(vec![
//!     Part::text("name", "gopher"),
//!     Part::bytes("blob", vec![0u8; 1024]),
//! ])?;
//! let content_type = form.content_type();
//! let content_length = form.content_length();
//!
//! let mut body = Vec::new();
//! form.read_to_end(&mut body).await?;
//! form.close()?;
//! assert_eq!(body.len() as u64, content_length);
//! # let _ = content_type;
//! # Ok(())
//! # }
//! ```

pub mod boundary;
pub mod builder;
pub mod config;
pub mod error;
pub mod header;
pub mod mime_type;
pub mod part;
pub mod size;
pub mod stream;

// Re-export commonly used types
pub use builder::FormBuilder;
pub use config::Config;
pub use error::{CloseError, Error, PartCloseFailure, Result, SizeMismatch};
pub use header::Header;
pub use part::{Body, LazyFile, Part, Source};
pub use size::content_length;
pub use stream::{BodyStream, FormStream, Phase, Progress};
