//! Part headers.
//!
//! MIME header keys are case-insensitive, but the rendered block must be byte
//! for byte reproducible, so entries keep their insertion order.

/// An ordered, case-insensitive MIME header map for one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<(String, Vec<String>)>,
}

impl Header {
    /// Creates an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `Content-Disposition: form-data` header for a field.
    ///
    /// Both names are escaped with [`escape_quotes`].
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio_mpstream::Header;
    ///
    /// let header = Header::form_data("avatar", Some("me.png"));
    /// assert_eq!(
    ///     header.get("content-disposition"),
    ///     Some(r#"form-data; name="avatar"; filename="me.png""#)
    /// );
    /// ```
    pub fn form_data(fieldname: &str, filename: Option<&str>) -> Self {
        let value = match filename {
            Some(filename) => format!(
                "form-data; name=\"{}\"; filename=\"{}\"",
                escape_quotes(fieldname),
                escape_quotes(filename)
            ),
            None => format!("form-data; name=\"{}\"", escape_quotes(fieldname)),
        };

        let mut header = Self::new();
        header.set("Content-Disposition", value);
        header
    }

    /// Replaces every value of `key` with `value`.
    ///
    /// An existing key keeps its position; a new key goes last.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        match self.position(key) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self
                .entries
                .push((canonical_key(key), vec![value.into()])),
        }
    }

    /// Appends a value to `key`.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        match self.position(key) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self
                .entries
                .push((canonical_key(key), vec![value.into()])),
        }
    }

    /// Returns the first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// Returns every value of `key`, empty when absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        match self.position(key) {
            Some(i) => self.entries[i].1.as_slice(),
            None => &[],
        }
    }

    /// Removes `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over every key/value pair in render order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .flat_map(|(k, vv)| vv.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Length of the rendered header block, including the blank line.
    pub fn encoded_len(&self) -> u64 {
        // "K: V\r\n" per pair, then "\r\n"
        self.iter()
            .map(|(k, v)| (k.len() + v.len() + 4) as u64)
            .sum::<u64>()
            + 2
    }

    /// Renders the header block into `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        for (key, value) in self.iter() {
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

/// Returns the canonical form of a MIME header key.
///
/// The first letter and any letter after a hyphen are upper-cased and the
/// rest lower-cased. Keys with characters outside the token set are returned
/// unchanged.
pub fn canonical_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}

/// Escapes quotes and backslashes in a string.
pub fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
