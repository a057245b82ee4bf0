//! Outgoing header chain.
//!
//! Lines are kept exactly as the caller wrote them, in insertion order, and
//! the same name may appear more than once. The chain is validated on
//! append so a malformed line never reaches the transport.

use crate::error::{Error, Result};

/// Ordered collection of raw `Name: value` lines attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderChain {
    lines: Vec<String>,
}

impl HeaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one raw header line.
    ///
    /// Accepts `Name: value`, `Name:` and `Name;` (header sent with an empty
    /// value). Rejects control characters other than horizontal tab, DEL,
    /// and names that are not HTTP tokens.
    pub fn append(&mut self, line: &str) -> Result<()> {
        if line.bytes().any(|b| (b < b' ' && b != b'\t') || b == 0x7f) {
            return Err(Error::Header(format!(
                "header line contains a control character: {line:?}"
            )));
        }
        let name = match line.find(':') {
            Some(pos) => &line[..pos],
            None => line
                .trim_end()
                .strip_suffix(';')
                .ok_or_else(|| Error::Header(format!("malformed header line: {line:?}")))?,
        };
        let name = name.trim();
        if !is_token(name) {
            return Err(Error::Header(format!("invalid header name: {name:?}")));
        }
        self.lines.push(line.to_string());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line sets `name` (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|line| {
            line.split([':', ';'])
                .next()
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
    }
}

/// Split a header line on its first colon, trimming both halves.
///
/// Returns `None` for lines without a colon (status lines, separators).
pub fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_duplicates_in_insertion_order() {
        let mut chain = HeaderChain::new();
        chain.append("X-Dup: one").unwrap();
        chain.append("Accept: */*").unwrap();
        chain.append("X-Dup: two").unwrap();
        let lines: Vec<_> = chain.iter().collect();
        assert_eq!(lines, vec!["X-Dup: one", "Accept: */*", "X-Dup: two"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn accepts_empty_value_forms() {
        let mut chain = HeaderChain::new();
        chain.append("X-Empty;").unwrap();
        chain.append("Accept:").unwrap();
        assert!(chain.contains("x-empty"));
        assert!(chain.contains("ACCEPT"));
    }

    #[test]
    fn rejects_injected_line_breaks() {
        let mut chain = HeaderChain::new();
        let err = chain.append("X-Foo: 1\r\nX-Evil: 2").unwrap_err();
        assert!(matches!(err, Error::Header(_)));
        assert!(chain.is_empty());
    }

    #[test]
    fn rejects_other_control_bytes() {
        let mut chain = HeaderChain::new();
        for line in ["X-Foo: a\x01b", "X-Foo: a\x7fb", "X-Foo: \x1b[0m"] {
            assert!(matches!(chain.append(line), Err(Error::Header(_))), "{line:?}");
        }
        assert!(chain.is_empty());
        chain.append("X-Tab: a\tb").unwrap();
        chain.append("X-Utf8: caf\u{e9}").unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn rejects_missing_separator_and_bad_names() {
        let mut chain = HeaderChain::new();
        assert!(matches!(chain.append("no separator"), Err(Error::Header(_))));
        assert!(matches!(chain.append(": value"), Err(Error::Header(_))));
        assert!(matches!(chain.append("Bad Name: v"), Err(Error::Header(_))));
    }

    #[test]
    fn split_trims_and_uses_first_colon() {
        assert_eq!(
            split_header_line("  Location :  http://x/y:z \r\n"),
            Some(("Location", "http://x/y:z"))
        );
        assert_eq!(split_header_line("HTTP/1.1 200 OK"), None);
        assert_eq!(split_header_line("\r\n"), None);
    }
}
