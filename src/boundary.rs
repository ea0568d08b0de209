//! Boundary validation, generation and delimiter rendering.
//!
//! Implements the boundary rules of RFC 2046 section 5.1.1.

use crate::error::{Error, Result};
use bytes::Bytes;

/// Longest boundary RFC 2046 allows.
pub const MAX_BOUNDARY_LEN: usize = 69;

const RANDOM_BYTES: usize = 30;

/// Checks that a boundary is 1 to 69 characters from the RFC 2046 set.
///
/// # Examples
///
/// ```
/// use tokio_mpstream::boundary::validate;
///
/// assert!(validate("xxxtestboundaryxxx").is_ok());
/// assert!(validate("").is_err());
/// assert!(validate("no spaces").is_err());
/// ```
pub fn validate(boundary: &str) -> Result<()> {
    if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
        return Err(Error::InvalidBoundaryLength(boundary.len()));
    }

    for ch in boundary.chars() {
        let valid = ch.is_ascii_alphanumeric()
            || matches!(ch, '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?');
        if !valid {
            return Err(Error::InvalidBoundaryCharacter(ch));
        }
    }

    Ok(())
}

/// Generates a random 60 character hex boundary from the OS random source.
pub fn generate() -> Result<String> {
    let mut buf = [0u8; RANDOM_BYTES];
    getrandom::getrandom(&mut buf).map_err(Error::Random)?;

    Ok(buf.iter().map(|b| format!("{:02x}", b)).collect())
}

/// The three delimiter forms for one boundary.
#[derive(Debug, Clone)]
pub struct Delimiters {
    middle: Bytes,
    close: Bytes,
}

impl Delimiters {
    /// Renders the delimiters for an already validated boundary.
    pub fn new(boundary: &str) -> Self {
        Self {
            middle: Bytes::from(format!("\r\n--{}\r\n", boundary)),
            close: Bytes::from(format!("\r\n--{}--\r\n", boundary)),
        }
    }

    /// `--boundary\r\n`, written once before the first part.
    pub fn open(&self) -> &[u8] {
        &self.middle[2..]
    }

    /// `\r\n--boundary\r\n`, written before every later part.
    pub fn middle(&self) -> &[u8] {
        &self.middle
    }

    /// `\r\n--boundary--\r\n`, written once after the last body.
    pub fn close(&self) -> &[u8] {
        &self.close
    }

    /// Mean delimiter length for a boundary.
    ///
    /// The opening delimiter is 4 bytes shorter and the closing one 2 bytes
    /// longer than the middle form, so over `parts + 1` delimiters every
    /// delimiter costs `len + 6` on average.
    pub fn average_len(boundary: &str) -> u64 {
        boundary.len() as u64 + 6
    }
}
