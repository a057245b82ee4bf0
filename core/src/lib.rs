//! Blocking HTTP request execution engine.
//!
//! # Overview
//! `Request` accumulates configuration (method, URL, query arguments,
//! headers, body, auth, proxy, multipart form, timeouts, protocol version)
//! and executes it against a transfer engine, returning a `Response` with
//! the status, body and case-insensitive headers, or a typed `Error`.
//!
//! # Design
//! - The network transport is consumed through the `TransferEngine` and
//!   `TransferHandle` traits. `UreqEngine` is the default; `ScriptedEngine`
//!   replays canned outcomes so the engine can be tested without sockets.
//! - Global transport setup is reference counted in `LibraryState`: the
//!   first live `Request` initializes it, the last one tears it down.
//! - A `Request` owns one handle plus the header chain, multipart form and
//!   output file lent to it, all released together on reset and drop.
//! - `send(attempts)` retries transport failures with exponential backoff
//!   and leaves the request reset and reusable whatever the outcome.
//!
//! Everything is synchronous. A `Request` may move between threads but is
//! never shared; `send` blocks the calling thread, backoff sleeps included.

pub mod client;
pub mod config;
pub mod error;
pub mod global;
pub mod headers;
pub mod http;
pub mod mime;
pub mod response;
pub mod retry;
mod session;
pub mod transport;

pub use client::Request;
pub use config::Config;
pub use error::{Error, Result};
pub use global::{default_library, LibraryState};
pub use headers::HeaderChain;
pub use http::{AuthMethod, Credentials, HttpMethod, HttpVersion, Method, Progress, UserAgent};
pub use mime::MimeForm;
pub use response::Response;
pub use transport::{
    Features, ScriptedEngine, TransferEngine, TransferError, TransferHandle, UreqEngine,
};

/// Version of this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
