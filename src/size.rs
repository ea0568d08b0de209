//! Content length precomputation.

use crate::boundary::Delimiters;
use crate::error::{Error, Result};
use crate::part::Part;

/// Computes the exact encoded length of `parts` framed by `boundary`.
///
/// Only declared sizes and header lengths are used; no body is touched.
/// There are `parts.len() + 1` delimiters.
pub fn content_length(boundary: &str, parts: &[Part]) -> Result<u64> {
    let delimiters = (parts.len() as u64 + 1)
        .checked_mul(Delimiters::average_len(boundary))
        .ok_or(Error::LengthOverflow)?;

    parts.iter().try_fold(delimiters, |total, part| {
        total
            .checked_add(part.header().encoded_len())
            .and_then(|total| total.checked_add(part.size()))
            .ok_or(Error::LengthOverflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::Body;
    use crate::Header;

    #[test]
    fn test_two_fields() {
        let parts = vec![Part::text("foo", "fux"), Part::text("bar", "yolo")];
        // 3 delimiters of 24 + 2 header blocks of 46 + 7 body bytes
        assert_eq!(content_length("xxxtestboundaryxxx", &parts).unwrap(), 171);
    }

    #[test]
    fn test_single_empty_part() {
        let parts = vec![Part::new(Header::new(), 0, Body::bytes(""))];
        // "--b\r\n" "\r\n" "\r\n--b--\r\n"
        assert_eq!(content_length("b", &parts).unwrap(), 5 + 2 + 9);
    }

    #[test]
    fn test_overflow() {
        let parts = vec![
            Part::new(Header::new(), u64::MAX, Body::bytes("")),
            Part::new(Header::new(), 1, Body::bytes("")),
        ];
        assert!(matches!(
            content_length("b", &parts),
            Err(Error::LengthOverflow)
        ));
    }
}
