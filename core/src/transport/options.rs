use std::path::PathBuf;
use std::time::Duration;

use super::{Body, TransferOption};
use crate::http::{AuthMethod, Credentials, HttpVersion};

/// Option state accumulated on a handle, last write wins.
#[derive(Debug, Clone)]
pub(crate) struct HandleOptions {
    pub url: Option<String>,
    pub post: bool,
    pub custom_request: Option<String>,
    pub no_body: bool,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub follow_location: bool,
    pub max_redirects: u32,
    pub proxy: Option<String>,
    pub proxy_credentials: Option<Credentials>,
    pub proxy_auth: AuthMethod,
    pub credentials: Option<Credentials>,
    pub http_auth: AuthMethod,
    pub user_agent: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub cookie_jar: Option<PathBuf>,
    pub verbose: bool,
    pub version: HttpVersion,
    pub no_progress: bool,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            url: None,
            post: false,
            custom_request: None,
            no_body: false,
            timeout: None,
            connect_timeout: None,
            follow_location: false,
            max_redirects: 30,
            proxy: None,
            proxy_credentials: None,
            proxy_auth: AuthMethod::Basic,
            credentials: None,
            http_auth: AuthMethod::Basic,
            user_agent: None,
            cookie_file: None,
            cookie_jar: None,
            verbose: false,
            version: HttpVersion::Default,
            no_progress: true,
        }
    }
}

impl HandleOptions {
    /// Record `option`. Returns true when it changes connection-level
    /// settings (timeouts, proxy) that a cached client must be rebuilt for.
    pub fn apply(&mut self, option: TransferOption) -> bool {
        match option {
            TransferOption::Url(url) => self.url = Some(url),
            TransferOption::HttpGet(enabled) => {
                if enabled {
                    self.post = false;
                    self.no_body = false;
                }
            }
            TransferOption::Post(enabled) => self.post = enabled,
            TransferOption::CustomRequest(verb) => self.custom_request = verb,
            TransferOption::NoBody(enabled) => self.no_body = enabled,
            TransferOption::Timeout(timeout) => {
                self.timeout = timeout;
                return true;
            }
            TransferOption::ConnectTimeout(timeout) => {
                self.connect_timeout = timeout;
                return true;
            }
            TransferOption::FollowLocation(follow) => self.follow_location = follow,
            TransferOption::MaxRedirects(max) => self.max_redirects = max,
            TransferOption::Proxy(proxy) => {
                self.proxy = proxy;
                return true;
            }
            TransferOption::ProxyCredentials(creds) => {
                self.proxy_credentials = Some(creds);
                return true;
            }
            TransferOption::ProxyAuth(method) => self.proxy_auth = method,
            TransferOption::Credentials(creds) => self.credentials = Some(creds),
            TransferOption::HttpAuth(method) => self.http_auth = method,
            TransferOption::UserAgent(agent) => self.user_agent = Some(agent),
            TransferOption::CookieFile(path) => self.cookie_file = Some(path),
            TransferOption::CookieJar(path) => self.cookie_jar = Some(path),
            TransferOption::Verbose(enabled) => self.verbose = enabled,
            TransferOption::HttpVersion(version) => self.version = version,
            TransferOption::NoProgress(disabled) => self.no_progress = disabled,
        }
        false
    }

    /// Verb the next transfer will use, given the body lent to it.
    pub fn method_name(&self, body: &Body<'_>) -> &str {
        if let Some(verb) = self.custom_request.as_deref() {
            return verb;
        }
        if self.no_body {
            "HEAD"
        } else if self.post || matches!(body, Body::Form(_)) {
            "POST"
        } else {
            "GET"
        }
    }
}
