//! Network transfer engine built on `ureq`.
//!
//! # Design
//! A `UreqHandle` keeps the options set on it and lazily builds a
//! `ureq::Agent` from the connection-level ones (timeouts, proxy); the
//! agent is reused across transfers until one of those options changes.
//!
//! Redirects are followed here rather than inside ureq so that every header
//! block of a redirect chain reaches the sink, and so that cookies set on an
//! intermediate hop are stored. ureq speaks HTTP/1.1 only, which is what
//! `features()` reports.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};

use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use cookie_store::CookieStore;
use ureq::http;
use url::Url;

use super::options::HandleOptions;
use super::{
    Body, Features, Payload, TransferEngine, TransferError, TransferHandle, TransferOption,
    TransferSink,
};
use crate::headers::split_header_line;
use crate::http::{AuthMethod, HttpVersion, Progress};
use crate::mime::{new_boundary, MimeForm};

const VERBOSE_TARGET: &str = "request_core::verbose";
const CHUNK_SIZE: usize = 16 * 1024;

/// The default transfer engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqEngine;

impl TransferEngine for UreqEngine {
    type Handle = UreqHandle;

    fn global_init(&self) -> Result<(), String> {
        tracing::debug!("ureq transfer engine initialized");
        Ok(())
    }

    fn global_cleanup(&self) {
        tracing::debug!("ureq transfer engine torn down");
    }

    fn features(&self) -> Features {
        Features::default()
    }

    fn create_handle(&self) -> Option<UreqHandle> {
        Some(UreqHandle {
            options: HandleOptions::default(),
            agent: None,
            status: 0,
        })
    }
}

/// A configured ureq session.
pub struct UreqHandle {
    options: HandleOptions,
    agent: Option<ureq::Agent>,
    status: u16,
}

impl fmt::Debug for UreqHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqHandle")
            .field("options", &self.options)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl TransferHandle for UreqHandle {
    fn set_option(&mut self, option: TransferOption) {
        if self.options.apply(option) {
            self.agent = None;
        }
    }

    fn perform(
        &mut self,
        payload: &Payload<'_>,
        sink: &mut dyn TransferSink,
    ) -> Result<(), TransferError> {
        self.status = 0;
        let mut cookies = self.load_cookies();
        let result = self.transfer(payload, sink, cookies.as_mut());
        if let Some(store) = &cookies {
            self.save_cookies(store);
        }
        result
    }

    fn response_code(&self) -> u16 {
        self.status
    }
}

impl UreqHandle {
    fn transfer(
        &mut self,
        payload: &Payload<'_>,
        sink: &mut dyn TransferSink,
        mut cookies: Option<&mut CookieStore>,
    ) -> Result<(), TransferError> {
        match self.options.version {
            HttpVersion::Http2 | HttpVersion::Http3 => {
                return Err(TransferError::UnsupportedProtocol(format!(
                    "{:?} is not available in this transport",
                    self.options.version
                )));
            }
            HttpVersion::Default | HttpVersion::Http1_1 => {}
        }

        let mut url = parse_url(self.options.url.as_deref().unwrap_or_default())?;
        let agent = self.agent()?;
        let authorization = self.authorization(payload)?;
        let name = self.options.method_name(&payload.body);
        let mut method = http::Method::from_bytes(name.as_bytes())
            .map_err(|e| TransferError::Send(format!("invalid method {name:?}: {e}")))?;
        let (mut body, mut content_type) = outgoing_body(payload, &method)?;
        let uploaded = body.as_ref().map_or(0, |b| b.len() as u64);
        let origin = url.origin();
        let mut redirects = 0;

        loop {
            let cross_origin = url.origin() != origin;
            let withheld =
                authorization.is_some() || payload.header_lines().any(is_credential);
            if cross_origin && withheld {
                tracing::debug!(%url, "redirected to another host, credentials withheld");
            }
            let builder = self.request_builder(
                &method,
                &url,
                payload,
                authorization.as_deref().filter(|_| !cross_origin),
                cross_origin,
                cookies.as_deref(),
                content_type.as_deref(),
            );
            let mut response = match &body {
                Some(bytes) => run(&agent, builder.body(bytes.clone()))?,
                None => run(&agent, builder.body(()))?,
            };
            self.status = response.status().as_u16();
            self.emit_headers(&response, sink);

            if let Some(store) = cookies.as_deref_mut() {
                for value in response.headers().get_all(http::header::SET_COOKIE) {
                    if let Ok(cookie) = value.to_str() {
                        if let Err(e) = store.parse(cookie, &url) {
                            tracing::debug!(error = %e, "ignoring unparseable cookie");
                        }
                    }
                }
            }

            let location = response
                .headers()
                .get(http::header::LOCATION)
                .and_then(|v| v.to_str().ok());
            if let (true, true, Some(location)) = (
                self.options.follow_location,
                response.status().is_redirection(),
                location,
            ) {
                if redirects >= self.options.max_redirects {
                    return Err(TransferError::TooManyRedirects);
                }
                let next = url
                    .join(location)
                    .map_err(|e| TransferError::UrlMalformat(e.to_string()))?;
                let downgrade = match self.status {
                    303 => method != http::Method::HEAD,
                    301 | 302 => method == http::Method::POST,
                    _ => false,
                };
                if downgrade {
                    method = http::Method::GET;
                    body = None;
                    content_type = None;
                }
                redirects += 1;
                url = next;
                continue;
            }

            if method != http::Method::HEAD {
                self.read_body(&mut response, sink, uploaded)?;
            }
            return Ok(());
        }
    }

    fn agent(&mut self) -> Result<ureq::Agent, TransferError> {
        if let Some(agent) = &self.agent {
            return Ok(agent.clone());
        }
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(self.options.timeout)
            .timeout_connect(self.options.connect_timeout);
        if let Some(proxy) = self.proxy()? {
            builder = builder.proxy(Some(proxy));
        }
        let agent = builder.build().new_agent();
        self.agent = Some(agent.clone());
        Ok(agent)
    }

    fn proxy(&self) -> Result<Option<ureq::Proxy>, TransferError> {
        let Some(raw) = self.options.proxy.as_deref() else {
            return Ok(None);
        };
        let mut uri = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        if let Some(creds) = &self.options.proxy_credentials {
            if self.options.proxy_auth != AuthMethod::Basic {
                return Err(TransferError::AuthUnsupported(format!(
                    "{:?} proxy authentication",
                    self.options.proxy_auth
                )));
            }
            let mut url =
                Url::parse(&uri).map_err(|e| TransferError::UrlMalformat(e.to_string()))?;
            url.set_username(&creds.username)
                .and_then(|()| url.set_password(Some(&creds.password)))
                .map_err(|()| {
                    TransferError::UrlMalformat(format!("proxy {raw} cannot carry credentials"))
                })?;
            uri = url.as_str().trim_end_matches('/').to_string();
        }
        ureq::Proxy::new(&uri)
            .map(Some)
            .map_err(|e| TransferError::UrlMalformat(e.to_string()))
    }

    fn authorization(&self, payload: &Payload<'_>) -> Result<Option<String>, TransferError> {
        let Some(creds) = &self.options.credentials else {
            return Ok(None);
        };
        if payload.headers.is_some_and(|h| h.contains("authorization")) {
            return Ok(None);
        }
        match self.options.http_auth {
            AuthMethod::Basic => {
                let token =
                    BASE64_STANDARD.encode(format!("{}:{}", creds.username, creds.password));
                Ok(Some(format!("Basic {token}")))
            }
            other => Err(TransferError::AuthUnsupported(format!(
                "{other:?} authentication"
            ))),
        }
    }

    fn request_builder(
        &self,
        method: &http::Method,
        url: &Url,
        payload: &Payload<'_>,
        authorization: Option<&str>,
        cross_origin: bool,
        cookies: Option<&CookieStore>,
        content_type: Option<&str>,
    ) -> http::request::Builder {
        let custom = |name: &str| payload.headers.is_some_and(|h| h.contains(name));
        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(url.as_str());

        if let Some(agent) = self.options.user_agent.as_deref() {
            if !custom("user-agent") {
                builder = builder.header(http::header::USER_AGENT, agent);
            }
        }
        if let Some(value) = authorization {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        if let Some(store) = cookies {
            let pairs: Vec<String> = store
                .get_request_values(url)
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            if !pairs.is_empty() && !custom("cookie") {
                builder = builder.header(http::header::COOKIE, pairs.join("; "));
            }
        }
        if let Some(value) = content_type {
            if !custom("content-type") || value.starts_with("multipart/") {
                builder = builder.header(http::header::CONTENT_TYPE, value);
            }
        }
        let lines = || {
            payload
                .header_lines()
                .filter(move |line| !(cross_origin && is_credential(line)))
        };
        for line in lines() {
            if let Some((name, value)) = outgoing_header(line) {
                builder = builder.header(name, value);
            }
        }

        if self.options.verbose {
            tracing::info!(target: VERBOSE_TARGET, "> {method} {url}");
            for line in lines() {
                tracing::info!(target: VERBOSE_TARGET, "> {line}");
            }
        }
        builder
    }

    fn emit_headers(&self, response: &http::Response<ureq::Body>, sink: &mut dyn TransferSink) {
        let status = response.status();
        let status_line = format!(
            "{:?} {} {}\r\n",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        if self.options.verbose {
            tracing::info!(target: VERBOSE_TARGET, "< {}", status_line.trim_end());
        }
        sink.on_header(status_line.as_bytes());

        for (name, value) in response.headers() {
            let mut line = Vec::with_capacity(name.as_str().len() + value.len() + 4);
            line.extend_from_slice(name.as_str().as_bytes());
            line.extend_from_slice(b": ");
            line.extend_from_slice(value.as_bytes());
            line.extend_from_slice(b"\r\n");
            if self.options.verbose {
                tracing::info!(
                    target: VERBOSE_TARGET,
                    "< {}",
                    String::from_utf8_lossy(&line).trim_end()
                );
            }
            sink.on_header(&line);
        }
        sink.on_header(b"\r\n");
    }

    fn read_body(
        &self,
        response: &mut http::Response<ureq::Body>,
        sink: &mut dyn TransferSink,
        uploaded: u64,
    ) -> Result<(), TransferError> {
        let report = !self.options.no_progress;
        let mut progress = Progress {
            dl_total: response
                .headers()
                .get(http::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dl_now: 0,
            ul_total: uploaded,
            ul_now: uploaded,
        };
        if report && sink.on_progress(progress) {
            return Err(TransferError::AbortedByCallback);
        }

        let mut reader = response.body_mut().as_reader();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(TransferError::OperationTimedOut)
                }
                Err(e) => return Err(TransferError::Recv(e.to_string())),
            };
            sink.on_body(&buf[..n])
                .map_err(|e| TransferError::Write(e.to_string()))?;
            progress.dl_now += n as u64;
            if report && sink.on_progress(progress) {
                return Err(TransferError::AbortedByCallback);
            }
        }
    }

    fn load_cookies(&self) -> Option<CookieStore> {
        if self.options.cookie_file.is_none() && self.options.cookie_jar.is_none() {
            return None;
        }
        let loaded = self.options.cookie_file.as_deref().and_then(|path| {
            let file = File::open(path).ok()?;
            cookie_store::serde::json::load(BufReader::new(file))
                .map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cookie file");
                })
                .ok()
        });
        Some(loaded.unwrap_or_default())
    }

    fn save_cookies(&self, store: &CookieStore) {
        let Some(path) = self.options.cookie_jar.as_deref() else {
            return;
        };
        let result = File::create(path)
            .map_err(|e| e.to_string())
            .and_then(|mut file| {
                cookie_store::serde::json::save_incl_expired_and_nonpersistent(store, &mut file)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cookie jar");
        }
    }
}

fn run<S: ureq::AsSendBody>(
    agent: &ureq::Agent,
    request: Result<http::Request<S>, http::Error>,
) -> Result<http::Response<ureq::Body>, TransferError> {
    let request = request.map_err(|e| TransferError::Send(e.to_string()))?;
    agent.run(request).map_err(transfer_error)
}

fn parse_url(raw: &str) -> Result<Url, TransferError> {
    if raw.is_empty() {
        return Err(TransferError::UrlMalformat("no URL set".to_string()));
    }
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{raw}"))
            .map_err(|e| TransferError::UrlMalformat(e.to_string()))?,
        Err(e) => return Err(TransferError::UrlMalformat(e.to_string())),
    };
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransferError::UnsupportedProtocol(other.to_string())),
    }
}

/// Body bytes and content type for the first hop of a transfer.
fn outgoing_body(
    payload: &Payload<'_>,
    method: &http::Method,
) -> Result<(Option<Vec<u8>>, Option<String>), TransferError> {
    match payload.body {
        Body::Form(form) => {
            let boundary = new_boundary();
            let bytes = form
                .encode(&boundary)
                .map_err(|e| TransferError::Read(e.to_string()))?;
            Ok((Some(bytes), Some(MimeForm::content_type(&boundary))))
        }
        Body::Bytes(bytes) => Ok((
            Some(bytes.to_vec()),
            Some("application/x-www-form-urlencoded".to_string()),
        )),
        Body::None => {
            let empty = [http::Method::POST, http::Method::PUT, http::Method::PATCH]
                .contains(method)
                .then(Vec::new);
            Ok((empty, None))
        }
    }
}

/// Name/value to send for one custom header line. `Name:` with no value
/// suppresses the header; `Name;` sends it empty.
fn outgoing_header(line: &str) -> Option<(&str, &str)> {
    match split_header_line(line) {
        Some((name, value)) => (!value.is_empty()).then_some((name, value)),
        None => line.trim_end().strip_suffix(';').map(|name| (name.trim(), "")),
    }
}

/// Custom lines that only the host the transfer started on may see.
fn is_credential(line: &str) -> bool {
    line.split([':', ';']).next().is_some_and(|name| {
        let name = name.trim();
        name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("cookie")
    })
}

fn transfer_error(err: ureq::Error) -> TransferError {
    let text = err.to_string();
    match err {
        ureq::Error::Timeout(_) => TransferError::OperationTimedOut,
        ureq::Error::HostNotFound => TransferError::CouldntResolveHost(text),
        ureq::Error::ConnectionFailed => TransferError::CouldntConnect(text),
        ureq::Error::TooManyRedirects => TransferError::TooManyRedirects,
        ureq::Error::BadUri(_) => TransferError::UrlMalformat(text),
        ureq::Error::Io(e) => match e.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable => TransferError::CouldntConnect(text),
            io::ErrorKind::TimedOut => TransferError::OperationTimedOut,
            _ => TransferError::Recv(text),
        },
        _ => TransferError::Send(text),
    }
}
