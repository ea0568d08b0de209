//! Stream configuration.

/// Default read size for [`BodyStream`](crate::BodyStream) chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Options for building a [`FormStream`](crate::FormStream).
///
/// # Examples
///
/// ```
/// use tokio_mpstream::Config;
///
/// let config = Config::new()
///     .boundary("xxxtestboundaryxxx")
///     .verify_sizes(true);
/// assert_eq!(config.get_boundary(), Some("xxxtestboundaryxxx"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    boundary: Option<String>,
    verify_sizes: bool,
    chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            boundary: None,
            verify_sizes: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed boundary instead of a random one.
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Fails reads when a body yields more or fewer bytes than declared.
    pub fn verify_sizes(mut self, verify: bool) -> Self {
        self.verify_sizes = verify;
        self
    }

    /// Read size used when the stream is turned into a chunk stream.
    /// Zero falls back to the default.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = if size == 0 { DEFAULT_CHUNK_SIZE } else { size };
        self
    }

    pub fn get_boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn get_verify_sizes(&self) -> bool {
        self.verify_sizes
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }
}
