//! `Request`: the builder surface and the execution/retry loop.
//!
//! # Design
//! A `Request` accumulates configuration, partly on itself (method, URL,
//! arguments, body, sink choice) and partly as options pushed straight onto
//! its transfer handle (auth, proxy, timeouts). `send` then prepares the
//! handle once, runs up to `attempts` transfers with exponential backoff in
//! between, and resets the request whatever the outcome so it can be reused.
//!
//! Each attempt gets a fresh `ResponseAssembler`; the header map and body of
//! a failed attempt never leak into the next one.

use std::fmt;
use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::global::{default_library, LibraryState};
use crate::headers::HeaderChain;
use crate::http::{AuthMethod, Credentials, HttpMethod, HttpVersion, Method, Progress};
use crate::mime::MimeForm;
use crate::response::{ProgressFn, Response, ResponseAssembler};
use crate::retry::backoff_delay;
use crate::session::Session;
use crate::transport::{
    Body, Payload, TransferEngine, TransferError, TransferHandle, TransferOption, UreqEngine,
};

/// A configurable, reusable HTTP request.
///
/// Setters mutate in place and return `&mut Self` for chaining; those that
/// validate their input return `Result<&mut Self>` and leave the request
/// untouched on error.
///
/// ```no_run
/// use request_core::{HttpMethod, Request};
///
/// let mut request = Request::new()?;
/// request
///     .set_method(HttpMethod::Post)?
///     .set_url("http://localhost:3000/echo")
///     .add_arg("q", "rust")
///     .set_body("name=value");
/// request.add_header("Accept: application/json")?;
/// let response = request.send(3)?;
/// println!("{}", response.status);
/// # Ok::<(), request_core::Error>(())
/// ```
pub struct Request<E: TransferEngine = UreqEngine> {
    library: Arc<LibraryState<E>>,
    session: Session<E::Handle>,
    config: Config,
    method: Method,
    url: String,
    args: Vec<String>,
    body: Vec<u8>,
    download_path: Option<PathBuf>,
    progress: Option<Box<ProgressFn>>,
    http_version: HttpVersion,
    cookie_path: Option<PathBuf>,
    verbose: bool,
}

impl Request<UreqEngine> {
    /// A request on the process-wide ureq engine, configured from the
    /// environment.
    pub fn new() -> Result<Self> {
        Self::with_config(default_library(), Config::from_env())
    }
}

impl<E: TransferEngine> Request<E> {
    pub fn with_library(library: Arc<LibraryState<E>>) -> Result<Self> {
        Self::with_config(library, Config::from_env())
    }

    pub fn with_config(library: Arc<LibraryState<E>>, config: Config) -> Result<Self> {
        library.acquire()?;
        let Some(handle) = library.engine().create_handle() else {
            library.release();
            return Err(handle_creation_failed());
        };
        tracing::debug!("transfer handle created");
        let mut request = Self {
            library,
            session: Session::new(handle),
            config,
            method: Method::default(),
            url: String::new(),
            args: Vec::new(),
            body: Vec::new(),
            download_path: None,
            progress: None,
            http_version: HttpVersion::Default,
            cookie_path: None,
            verbose: false,
        };
        request.apply_defaults();
        Ok(request)
    }

    /// Switch the request method.
    ///
    /// Fails once the request is in multipart mode, unless `method` is
    /// multipart too; only `reset` leaves that mode.
    pub fn set_method(&mut self, method: impl Into<Method>) -> Result<&mut Self> {
        let method = method.into();
        if self.method == Method::Multipart && method != Method::Multipart {
            return Err(Error::logic(
                "a multipart request cannot change method without a reset",
            ));
        }
        self.method = method;
        self.set_option(TransferOption::HttpGet(false));
        self.set_option(TransferOption::Post(false));
        self.set_option(TransferOption::CustomRequest(None));
        self.set_option(TransferOption::NoBody(false));
        match method {
            Method::Standard(HttpMethod::Get) => self.set_option(TransferOption::HttpGet(true)),
            Method::Standard(HttpMethod::Post) => self.set_option(TransferOption::Post(true)),
            Method::Standard(verb @ (HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete)) => {
                self.set_option(TransferOption::CustomRequest(Some(verb.as_str().to_string())))
            }
            Method::Standard(HttpMethod::Head) => self.set_option(TransferOption::NoBody(true)),
            Method::Multipart => {}
        }
        Ok(self)
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Append a query argument; key and value are percent-encoded.
    pub fn add_arg(&mut self, key: &str, value: &str) -> &mut Self {
        self.args.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        ));
        self
    }

    /// Append one raw `Name: value` line. Duplicate names are kept.
    pub fn add_header(&mut self, line: &str) -> Result<&mut Self> {
        match self.session.headers.as_mut() {
            Some(chain) => chain.append(line)?,
            None => {
                let mut chain = HeaderChain::new();
                chain.append(line)?;
                self.session.headers = Some(chain);
            }
        }
        Ok(self)
    }

    /// Body sent with POST, PUT and PATCH; ignored for other methods.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn set_auth_token(&mut self, token: &str) -> Result<&mut Self> {
        self.add_header(&format!("Authorization: Bearer {token}"))
    }

    pub fn set_http_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.set_option(TransferOption::Credentials(Credentials::new(
            username, password,
        )));
        self
    }

    pub fn set_http_auth_method(&mut self, method: AuthMethod) -> &mut Self {
        self.set_option(TransferOption::HttpAuth(method));
        self
    }

    pub fn set_proxy(&mut self, proxy: &str) -> &mut Self {
        self.set_option(TransferOption::Proxy(Some(proxy.to_string())));
        self
    }

    pub fn set_proxy_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.set_option(TransferOption::ProxyCredentials(Credentials::new(
            username, password,
        )));
        self
    }

    pub fn set_proxy_auth_method(&mut self, method: AuthMethod) -> &mut Self {
        self.set_option(TransferOption::ProxyAuth(method));
        self
    }

    /// Add a text part and switch the request to multipart mode.
    pub fn add_form_field(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        match self.session.form.as_mut() {
            Some(form) => form.add_field(name, value)?,
            None => {
                let mut form = MimeForm::new();
                form.add_field(name, value)?;
                self.session.form = Some(form);
            }
        }
        self.set_method(Method::Multipart)
    }

    /// Add a file part and switch the request to multipart mode. The file
    /// is read when the request is sent.
    pub fn add_form_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<&mut Self> {
        match self.session.form.as_mut() {
            Some(form) => form.add_file(name, path)?,
            None => {
                let mut form = MimeForm::new();
                form.add_file(name, path)?;
                self.session.form = Some(form);
            }
        }
        self.set_method(Method::Multipart)
    }

    /// Prefer a protocol version. Versions the transport library was built
    /// without are rejected here; a server that cannot speak the version is
    /// left to the transport's own fallback.
    pub fn set_http_version(&mut self, version: HttpVersion) -> Result<&mut Self> {
        let features = self.library.engine().features();
        let available = match version {
            HttpVersion::Http2 => features.http2,
            HttpVersion::Http3 => features.http3,
            HttpVersion::Default | HttpVersion::Http1_1 => true,
        };
        if !available {
            return Err(Error::logic(format!(
                "{version:?} is not supported by the transport library"
            )));
        }
        self.http_version = version;
        Ok(self)
    }

    /// Stream the response body into `path` instead of memory.
    pub fn download_to_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.download_path = Some(path.into());
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.set_option(TransferOption::Timeout(Some(timeout)));
        self
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.set_option(TransferOption::ConnectTimeout(Some(timeout)));
        self
    }

    pub fn set_follow_redirects(&mut self, follow: bool) -> &mut Self {
        self.set_option(TransferOption::FollowLocation(follow));
        self
    }

    /// Read cookies from `path` before each transfer and write them back
    /// after it.
    pub fn set_cookie_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        self.set_option(TransferOption::CookieFile(path.clone()));
        self.set_option(TransferOption::CookieJar(path.clone()));
        self.cookie_path = Some(path);
        self
    }

    pub fn set_user_agent(&mut self, agent: &str) -> &mut Self {
        self.set_option(TransferOption::UserAgent(agent.to_string()));
        self
    }

    pub fn enable_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self.set_option(TransferOption::Verbose(verbose));
        self
    }

    /// Install a progress predicate. Returning `true` aborts the current
    /// attempt. Without one, progress reporting is switched off entirely.
    pub fn set_progress_callback(
        &mut self,
        callback: impl FnMut(Progress) -> bool + Send + 'static,
    ) -> &mut Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Encoded `key=value` arguments in insertion order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> Option<&HeaderChain> {
        self.session.headers.as_ref()
    }

    pub fn form(&self) -> Option<&MimeForm> {
        self.session.form.as_ref()
    }

    pub fn download_path(&self) -> Option<&Path> {
        self.download_path.as_deref()
    }

    pub fn has_progress_callback(&self) -> bool {
        self.progress.is_some()
    }

    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    pub fn cookie_path(&self) -> Option<&Path> {
        self.cookie_path.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The URL a transfer would target: the base URL plus `?args` when any
    /// argument was added.
    pub fn effective_url(&self) -> String {
        if self.args.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, self.args.join("&"))
        }
    }

    /// Perform the request, trying up to `attempts` times.
    ///
    /// Between failed attempts the calling thread sleeps for the backoff
    /// delay. The request is reset before this returns, on success and on
    /// error alike.
    pub fn send(&mut self, attempts: u32) -> Result<Response> {
        let result = self.execute(attempts);
        let reset = self.reset().map(|_| ());
        let response = result?;
        reset?;
        Ok(response)
    }

    /// Replace the transfer handle and return every setting to its default.
    ///
    /// The new handle is created before the old one is released, so on
    /// failure the request keeps its current state.
    pub fn reset(&mut self) -> Result<&mut Self> {
        let handle = self
            .library
            .engine()
            .create_handle()
            .ok_or_else(handle_creation_failed)?;
        self.session.replace(handle);
        self.method = Method::default();
        self.url.clear();
        self.args.clear();
        self.body.clear();
        self.download_path = None;
        self.progress = None;
        self.http_version = HttpVersion::Default;
        self.cookie_path = None;
        self.verbose = false;
        self.apply_defaults();
        Ok(self)
    }

    fn apply_defaults(&mut self) {
        self.set_option(TransferOption::HttpGet(true));
        self.set_option(TransferOption::HttpVersion(HttpVersion::Default));
        self.set_option(TransferOption::MaxRedirects(self.config.max_redirects));
    }

    fn set_option(&mut self, option: TransferOption) {
        if let Some(handle) = self.session.handle.as_mut() {
            handle.set_option(option);
        }
    }

    fn execute(&mut self, attempts: u32) -> Result<Response> {
        if attempts == 0 {
            return Err(Error::logic("send needs at least one attempt"));
        }
        self.prepare()?;

        let base = self.config.retry_base_delay();
        for attempt in 1..=attempts {
            let (status, error) = match self.attempt()? {
                Ok(response) => {
                    tracing::debug!(attempt, status = response.status, "transfer complete");
                    return Ok(response);
                }
                Err(failure) => failure,
            };
            if attempt == attempts {
                return Err(Error::Request {
                    attempt,
                    status,
                    reason: error.to_string(),
                });
            }
            let delay = backoff_delay(base, attempt);
            tracing::warn!(
                attempt,
                status,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "transfer attempt failed, retrying"
            );
            thread::sleep(delay);
        }
        Err(Error::logic("retry loop terminated unexpectedly"))
    }

    /// Per-send setup: progress switch, body sink, final URL, version.
    fn prepare(&mut self) -> Result<()> {
        self.set_option(TransferOption::NoProgress(self.progress.is_none()));
        if let Some(path) = &self.download_path {
            let file = File::create(path).map_err(|source| Error::OutputFile {
                path: path.clone(),
                source,
            })?;
            self.session.output = Some(file);
        }
        let url = self.effective_url();
        self.set_option(TransferOption::Url(url));
        self.set_option(TransferOption::HttpVersion(self.http_version));
        Ok(())
    }

    /// One transfer. The outer error is a local failure that retrying cannot
    /// fix; the inner one is the transport's verdict plus the status seen.
    fn attempt(&mut self) -> Result<Result<Response, (u16, TransferError)>> {
        let Session {
            handle,
            headers,
            form,
            output,
        } = &mut self.session;
        let handle = handle
            .as_mut()
            .ok_or_else(|| Error::Initialization("no transfer handle".to_string()))?;

        if let Some(file) = output.as_mut() {
            file.set_len(0)
                .and_then(|()| file.rewind())
                .map_err(|source| Error::OutputFile {
                    path: self.download_path.clone().unwrap_or_default(),
                    source,
                })?;
        }

        let body = match self.method {
            Method::Multipart => Body::Form(form.get_or_insert_with(MimeForm::new)),
            Method::Standard(verb) if verb.carries_body() && !self.body.is_empty() => {
                Body::Bytes(&self.body)
            }
            Method::Standard(_) => Body::None,
        };
        let payload = Payload {
            headers: headers.as_ref(),
            body,
        };
        let mut sink = ResponseAssembler::new(output.as_mut(), self.progress.as_deref_mut());
        let outcome = handle.perform(&payload, &mut sink);
        let status = handle.response_code();
        Ok(match outcome {
            Ok(()) => Ok(sink.finish(status)),
            Err(error) => Err((status, error)),
        })
    }
}

impl<E: TransferEngine> Drop for Request<E> {
    fn drop(&mut self) {
        self.session.cleanup();
        self.library.release();
    }
}

impl<E: TransferEngine> fmt::Debug for Request<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("args", &self.args)
            .field("body_len", &self.body.len())
            .field("headers", &self.session.headers)
            .field("form", &self.session.form)
            .field("download_path", &self.download_path)
            .field("progress", &self.progress.is_some())
            .field("http_version", &self.http_version)
            .field("cookie_path", &self.cookie_path)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

fn handle_creation_failed() -> Error {
    Error::Initialization("failed to create transfer handle".to_string())
}
