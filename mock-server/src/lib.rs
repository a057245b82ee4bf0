use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// `Authorization` value accepted by `/basic-auth` (`user:pass`).
pub const BASIC_CREDENTIALS: &str = "Basic dXNlcjpwYXNz";

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct RedirectTo {
    pub url: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/reflect", any(reflect))
        .route("/status/{code}", any(status))
        .route("/redirect/{hops}", any(redirect))
        .route("/redirect-to", any(redirect_to))
        .route("/headers/repeat", get(repeat_headers))
        .route("/cookies/set", get(set_cookie))
        .route("/cookies/session", get(set_session_cookie))
        .route("/cookies", get(cookies))
        .route("/bytes/{n}", get(bytes))
        .route("/basic-auth", get(basic_auth))
        .route("/slow/{ms}", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Copy every `x-*` request header onto the response.
async fn reflect(headers: HeaderMap) -> impl IntoResponse {
    let mut reflected = HeaderMap::new();
    for (name, value) in &headers {
        if name.as_str().starts_with("x-") {
            reflected.append(name.clone(), value.clone());
        }
    }
    (reflected, "reflected")
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Redirect `hops` more times, then land on `/echo`.
async fn redirect(Path(hops): Path<u32>) -> Response {
    let location = match hops {
        0 | 1 => "/echo".to_string(),
        n => format!("/redirect/{}", n - 1),
    };
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (HeaderName::from_static("x-hop"), hops.to_string()),
        ],
    )
        .into_response()
}

/// Redirect to an absolute `url`, possibly on another host.
async fn redirect_to(Query(target): Query<RedirectTo>) -> Response {
    match HeaderValue::from_str(&target.url) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn repeat_headers() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.append("x-dup", HeaderValue::from_static("a"));
    headers.append("x-dup", HeaderValue::from_static("b"));
    (headers, "repeated")
}

async fn set_cookie(Query(cookie): Query<SetCookie>) -> Response {
    cookie_response(format!(
        "{}={}; Max-Age=3600; Path=/",
        cookie.name, cookie.value
    ))
}

/// Same as `/cookies/set` but without an expiry, so the cookie only lives
/// for the client's session.
async fn set_session_cookie(Query(cookie): Query<SetCookie>) -> Response {
    cookie_response(format!("{}={}; Path=/", cookie.name, cookie.value))
}

fn cookie_response(value: String) -> Response {
    match HeaderValue::from_str(&value) {
        Ok(value) => ([(header::SET_COOKIE, value)], "cookie set").into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// The `Cookie` header the client sent, or an empty body.
async fn cookies(headers: HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn bytes(Path(n): Path<usize>) -> Vec<u8> {
    vec![b'x'; n]
}

async fn basic_auth(headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .is_some_and(|v| v.as_bytes() == BASIC_CREDENTIALS.as_bytes());
    if authorized {
        "authenticated".into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"mock\"")],
        )
            .into_response()
    }
}

async fn slow(Path(ms): Path<u64>, Query(params): Query<HashMap<String, String>>) -> String {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    params.get("body").cloned().unwrap_or_else(|| "slow".to_string())
}
