//! Response value and the sink that assembles it during a transfer.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};

use crate::headers::split_header_line;
use crate::http::Progress;
use crate::transport::TransferSink;

/// User predicate receiving progress; returning `true` aborts the attempt.
pub type ProgressFn = dyn FnMut(Progress) -> bool + Send;

/// Result of a successful `send`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Empty when the body was downloaded to a file.
    pub body: Vec<u8>,
    /// Lower-cased header name to its values in arrival order.
    pub headers: BTreeMap<String, Vec<String>>,
}

impl Response {
    /// All values received for `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "status: {}", self.status)?;
        writeln!(f, "body:\n{}", self.text())?;
        writeln!(f, "headers:")?;
        for (name, values) in &self.headers {
            write!(f, "{name}: ")?;
            for value in values {
                write!(f, "{value} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Collects one attempt's header lines and body.
pub(crate) struct ResponseAssembler<'a> {
    headers: BTreeMap<String, Vec<String>>,
    body: Vec<u8>,
    file: Option<&'a mut File>,
    progress: Option<&'a mut ProgressFn>,
}

impl<'a> ResponseAssembler<'a> {
    pub fn new(file: Option<&'a mut File>, progress: Option<&'a mut ProgressFn>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: Vec::new(),
            file,
            progress,
        }
    }

    pub fn finish(self, status: u16) -> Response {
        Response {
            status,
            body: self.body,
            headers: self.headers,
        }
    }
}

impl TransferSink for ResponseAssembler<'_> {
    fn on_header(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() || line.starts_with("HTTP/") {
            return;
        }
        if let Some((name, value)) = split_header_line(line) {
            self.headers
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.to_string());
        }
    }

    fn on_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self.file.as_deref_mut() {
            Some(file) => file.write_all(chunk),
            None => {
                self.body.extend_from_slice(chunk);
                Ok(())
            }
        }
    }

    fn on_progress(&mut self, progress: Progress) -> bool {
        self.progress
            .as_deref_mut()
            .is_some_and(|predicate| predicate(progress))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek};

    use super::*;

    fn feed(sink: &mut ResponseAssembler<'_>, lines: &[&str]) {
        for line in lines {
            sink.on_header(line.as_bytes());
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut sink = ResponseAssembler::new(None, None);
        feed(&mut sink, &["HTTP/1.1 200 OK\r\n", "X-Foo:  1 \r\n", "\r\n"]);
        let response = sink.finish(200);
        assert_eq!(response.header("x-foo"), ["1"]);
        assert_eq!(response.header("X-FOO"), ["1"]);
        assert!(response.header("missing").is_empty());
    }

    #[test]
    fn repeated_names_accumulate_across_blocks() {
        let mut sink = ResponseAssembler::new(None, None);
        feed(
            &mut sink,
            &[
                "HTTP/1.1 302 Found\r\n",
                "Location: /next\r\n",
                "Set-Cookie: a=1\r\n",
                "\r\n",
                "HTTP/1.1 200 OK\r\n",
                "Set-Cookie: b=2\r\n",
                "\r\n",
            ],
        );
        let response = sink.finish(200);
        assert_eq!(response.header("set-cookie"), ["a=1", "b=2"]);
        assert_eq!(response.header("location"), ["/next"]);
        assert_eq!(response.headers.len(), 2);
    }

    #[test]
    fn value_keeps_text_after_first_colon() {
        let mut sink = ResponseAssembler::new(None, None);
        feed(&mut sink, &["Date: Tue, 01 Jan 2030 10:00:00 GMT\r\n"]);
        assert_eq!(
            sink.finish(200).header("date"),
            ["Tue, 01 Jan 2030 10:00:00 GMT"]
        );
    }

    #[test]
    fn body_goes_to_file_when_set() {
        let mut file = tempfile::tempfile().unwrap();
        let mut sink = ResponseAssembler::new(Some(&mut file), None);
        sink.on_body(b"hello ").unwrap();
        sink.on_body(b"file").unwrap();
        let response = sink.finish(200);
        assert!(response.body.is_empty());

        file.rewind().unwrap();
        let mut written = String::new();
        file.read_to_string(&mut written).unwrap();
        assert_eq!(written, "hello file");
    }

    #[test]
    fn progress_reaches_predicate() {
        let mut predicate: Box<ProgressFn> = Box::new(|p: Progress| p.dl_now >= 10);
        let mut sink = ResponseAssembler::new(None, Some(predicate.as_mut()));
        assert!(!sink.on_progress(Progress {
            dl_now: 5,
            ..Progress::default()
        }));
        assert!(sink.on_progress(Progress {
            dl_now: 10,
            ..Progress::default()
        }));
    }

    #[test]
    fn without_predicate_never_aborts() {
        let mut sink = ResponseAssembler::new(None, None);
        assert!(!sink.on_progress(Progress::default()));
    }

    #[test]
    fn display_lists_status_body_and_headers() {
        let mut response = Response {
            status: 201,
            body: b"done".to_vec(),
            headers: BTreeMap::new(),
        };
        response
            .headers
            .insert("x-dup".into(), vec!["a".into(), "b".into()]);
        assert_eq!(
            response.to_string(),
            "status: 201\nbody:\ndone\nheaders:\nx-dup: a b \n"
        );
    }
}
