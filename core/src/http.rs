//! Plain value types describing how a request is sent.
//!
//! # Design
//! The multipart mode is not just another verb: once a request is in
//! multipart mode it stays there until reset. `Method` makes that explicit
//! by wrapping the ordinary verbs in `Method::Standard` and keeping
//! `Method::Multipart` as its own variant, so the exclusivity rule is checked
//! in one place (`Request::set_method`).

use std::fmt;

/// HTTP verb for a standard (non-multipart) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Whether a body set with `Request::set_body` is transmitted.
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request mode: an ordinary verb, or a multipart/form-data POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Standard(HttpMethod),
    Multipart,
}

impl Default for Method {
    fn default() -> Self {
        Method::Standard(HttpMethod::Get)
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        Method::Standard(method)
    }
}

/// Protocol version preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    /// Let the transport negotiate.
    #[default]
    Default,
    Http1_1,
    Http2,
    Http3,
}

/// Authentication scheme for the server or the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    #[default]
    Basic,
    Digest,
    Ntlm,
}

/// A username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transfer counters handed to a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub dl_total: u64,
    pub dl_now: u64,
    pub ul_total: u64,
    pub ul_now: u64,
}

/// Common browser User-Agent strings.
///
/// These values are public and do not imply affiliation with the
/// respective browser vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAgent {
    Curl,
    Firefox,
    Chrome,
    Edge,
    Safari,
    Android,
    IPhone,
}

impl UserAgent {
    pub fn as_str(self) -> &'static str {
        match self {
            UserAgent::Curl => "curl/8.6.0",
            UserAgent::Firefox => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0"
            }
            UserAgent::Chrome => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
            }
            UserAgent::Edge => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0"
            }
            UserAgent::Safari => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15"
            }
            UserAgent::Android => {
                "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36"
            }
            UserAgent::IPhone => {
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1"
            }
        }
    }
}
