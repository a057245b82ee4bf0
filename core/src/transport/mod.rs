//! The transfer engine consumed by `Request`.
//!
//! # Design
//! The engine is an opaque capability: DNS, TLS and socket I/O live behind
//! `TransferEngine` and `TransferHandle`. A handle is configured with typed
//! `TransferOption`s, then `perform` runs one blocking transfer and drives a
//! `TransferSink` with header lines, body chunks and progress counters.
//!
//! Resources that must outlive the transfer (the header chain, the body, the
//! multipart form) are lent to `perform` through `Payload` rather than
//! handed over, so the borrow checker enforces that they stay alive for the
//! whole call while `Session` keeps owning them.
//!
//! Two engines ship with the crate: `UreqEngine`, the default network
//! engine, and `ScriptedEngine`, which replays canned outcomes for tests.

mod agent;
mod options;
mod scripted;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::headers::HeaderChain;
use crate::http::{AuthMethod, Credentials, HttpVersion, Progress};
use crate::mime::MimeForm;

pub use agent::{UreqEngine, UreqHandle};
pub use scripted::{AttemptRecord, Journal, Outcome, ScriptedEngine, ScriptedHandle};

/// Protocol support compiled into the running transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub http2: bool,
    pub http3: bool,
}

/// A single setting applied to a transfer handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOption {
    Url(String),
    HttpGet(bool),
    Post(bool),
    CustomRequest(Option<String>),
    NoBody(bool),
    Timeout(Option<Duration>),
    ConnectTimeout(Option<Duration>),
    FollowLocation(bool),
    MaxRedirects(u32),
    Proxy(Option<String>),
    ProxyCredentials(Credentials),
    ProxyAuth(AuthMethod),
    Credentials(Credentials),
    HttpAuth(AuthMethod),
    UserAgent(String),
    CookieFile(PathBuf),
    CookieJar(PathBuf),
    Verbose(bool),
    HttpVersion(HttpVersion),
    NoProgress(bool),
}

/// Request body lent to one transfer.
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    None,
    Bytes(&'a [u8]),
    Form(&'a MimeForm),
}

/// Everything a transfer borrows from its owner for the duration of
/// `perform`.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    pub headers: Option<&'a HeaderChain>,
    pub body: Body<'a>,
}

impl<'a> Payload<'a> {
    pub fn header_lines(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.into_iter().flat_map(|chain| chain.iter())
    }
}

/// Receiver of the data a transfer produces.
pub trait TransferSink {
    /// One received header line, status lines and the blank line closing
    /// each header block included.
    fn on_header(&mut self, line: &[u8]);

    /// A chunk of the response body.
    fn on_body(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Progress notification. Returning `true` aborts the transfer.
    /// Only called when `NoProgress(false)` is set on the handle.
    fn on_progress(&mut self, progress: Progress) -> bool;
}

/// Transport-level failure of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("URL using bad/illegal format or missing URL: {0}")]
    UrlMalformat(String),
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    #[error("Couldn't resolve host name: {0}")]
    CouldntResolveHost(String),
    #[error("Couldn't connect to server: {0}")]
    CouldntConnect(String),
    #[error("Timeout was reached")]
    OperationTimedOut,
    #[error("Number of redirects hit maximum amount")]
    TooManyRedirects,
    #[error("Failed sending data to the peer: {0}")]
    Send(String),
    #[error("Failure when receiving data from the peer: {0}")]
    Recv(String),
    #[error("Failed writing received data to disk/application: {0}")]
    Write(String),
    #[error("Failed to open/read local data from file/application: {0}")]
    Read(String),
    #[error("Operation was aborted by an application callback")]
    AbortedByCallback,
    #[error("Authentication scheme not supported by this transport: {0}")]
    AuthUnsupported(String),
}

/// One configured, reusable transfer session.
///
/// Handles are not shared: a handle is driven by one thread at a time and
/// may be moved between threads between transfers.
pub trait TransferHandle: Send {
    fn set_option(&mut self, option: TransferOption);

    /// Run one blocking transfer with the current options.
    fn perform(
        &mut self,
        payload: &Payload<'_>,
        sink: &mut dyn TransferSink,
    ) -> Result<(), TransferError>;

    /// Status code of the last response seen, 0 if none arrived.
    fn response_code(&self) -> u16;
}

/// Factory for handles plus the process-wide library setup they require.
pub trait TransferEngine: Send + Sync + 'static {
    type Handle: TransferHandle;

    fn global_init(&self) -> Result<(), String>;

    fn global_cleanup(&self);

    fn features(&self) -> Features;

    /// A fresh handle, or `None` if the transport cannot allocate one.
    fn create_handle(&self) -> Option<Self::Handle>;
}
