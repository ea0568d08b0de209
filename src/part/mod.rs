//! Form parts: a header block, a declared size and a body read exactly once.

mod body;
mod file;

pub use body::{Body, Source};
pub use file::LazyFile;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::mime_type;
use bytes::Bytes;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncRead;

/// One form field or file.
///
/// `size` must be exactly the number of bytes `body` yields. It is trusted
/// when the content length is computed; see `Config::verify_sizes` for a
/// checked mode.
#[derive(Debug)]
pub struct Part {
    header: Header,
    size: u64,
    body: Body,
}

impl Part {
    /// Creates a part from its raw pieces.
    pub fn new(header: Header, size: u64, body: Body) -> Self {
        Self { header, size, body }
    }

    /// A form field with an in-memory value.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio_mpstream::Part;
    ///
    /// let part = Part::bytes("avatar", vec![0u8; 16]);
    /// assert_eq!(part.size(), 16);
    /// ```
    pub fn bytes(fieldname: &str, value: impl Into<Bytes>) -> Self {
        let value = value.into();
        Self::new(
            Header::form_data(fieldname, None),
            value.len() as u64,
            Body::bytes(value),
        )
    }

    /// A form field with a text value.
    pub fn text(fieldname: &str, value: impl Into<String>) -> Self {
        Self::bytes(fieldname, value.into())
    }

    /// A form field holding `value` encoded as JSON.
    pub fn json<T: Serialize + ?Sized>(fieldname: &str, value: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(value).map_err(|source| Error::Json {
            field: fieldname.to_string(),
            source,
        })?;
        Ok(Self::from_json_bytes(fieldname, encoded))
    }

    pub(crate) fn from_json_bytes(fieldname: &str, encoded: Vec<u8>) -> Self {
        let mut part = Self::bytes(fieldname, encoded);
        part.header.set("Content-Type", "application/json");
        part
    }

    /// A form field read from `reader`, which must yield exactly `size` bytes.
    pub fn reader<R>(fieldname: &str, reader: R, size: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::new(Header::form_data(fieldname, None), size, Body::reader(reader))
    }

    /// A form field read from a closable source of exactly `size` bytes.
    pub fn source<S: Source + 'static>(fieldname: &str, source: S, size: u64) -> Self {
        Self::new(Header::form_data(fieldname, None), size, Body::source(source))
    }

    /// A file upload.
    ///
    /// The file is sized now and opened on first read. `filename` is the
    /// path's last component and `Content-Type` comes from its extension.
    pub async fn file(fieldname: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(Error::IsDirectory(path.to_path_buf()));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let mut header = Header::form_data(fieldname, Some(&filename));
        header.set("Content-Type", mime_type::type_by_path(path));

        Ok(Self::new(header, metadata.len(), Body::File(LazyFile::new(path))))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Declared body length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn into_parts(self) -> (Header, u64, Body) {
        (self.header, self.size, self.body)
    }
}
