use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, BASIC_CREDENTIALS};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_query_headers_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/echo?q=a%20b&k=1")
                .header("x-one", "1")
                .header("x-one", "2")
                .header(http::header::CONTENT_TYPE, "text/plain")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PATCH");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("q=a%20b&k=1"));
    assert_eq!(echo.headers["x-one"], ["1", "2"]);
    assert_eq!(echo.body, "payload");
}

// --- reflect / repeat ---

#[tokio::test]
async fn reflect_copies_custom_headers_only() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/reflect")
                .header("x-trace", "abc")
                .header("accept", "*/*")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.headers()["x-trace"], "abc");
    assert!(resp.headers().get("accept").is_none());
}

#[tokio::test]
async fn repeat_sends_duplicate_header() {
    let resp = app().oneshot(get("/headers/repeat")).await.unwrap();
    let values: Vec<_> = resp.headers().get_all("x-dup").iter().collect();
    assert_eq!(values, ["a", "b"]);
}

// --- status / redirect ---

#[tokio::test]
async fn status_route_returns_requested_code() {
    let resp = app().oneshot(get("/status/503")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_bytes(resp).await, "status 503");
}

#[tokio::test]
async fn status_route_rejects_invalid_code() {
    let resp = app().oneshot(get("/status/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn redirect_counts_down_to_echo() {
    let resp = app().oneshot(get("/redirect/2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "/redirect/1");
    assert_eq!(resp.headers()["x-hop"], "2");

    let resp = app().oneshot(get("/redirect/1")).await.unwrap();
    assert_eq!(resp.headers()[http::header::LOCATION], "/echo");
}

#[tokio::test]
async fn redirect_to_uses_absolute_target() {
    let resp = app()
        .oneshot(get("/redirect-to?url=http%3A%2F%2Flocalhost%3A9%2Fecho"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()[http::header::LOCATION],
        "http://localhost:9/echo"
    );
}

// --- cookies ---

#[tokio::test]
async fn set_cookie_is_persistent() {
    let resp = app()
        .oneshot(get("/cookies/set?name=session&value=abc"))
        .await
        .unwrap();
    let cookie = resp.headers()[http::header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session=abc;"));
    assert!(cookie.contains("Max-Age="));
}

#[tokio::test]
async fn session_cookie_has_no_expiry() {
    let resp = app()
        .oneshot(get("/cookies/session?name=sid&value=abc"))
        .await
        .unwrap();
    let cookie = resp.headers()[http::header::SET_COOKIE].to_str().unwrap();
    assert_eq!(cookie, "sid=abc; Path=/");
}

#[tokio::test]
async fn cookies_route_returns_cookie_header() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/cookies")
                .header(http::header::COOKIE, "session=abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_bytes(resp).await, "session=abc");
}

// --- bytes / auth ---

#[tokio::test]
async fn bytes_returns_exact_length() {
    let resp = app().oneshot(get("/bytes/1024")).await.unwrap();
    assert_eq!(body_bytes(resp).await.len(), 1024);
}

#[tokio::test]
async fn basic_auth_accepts_known_credentials() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/basic-auth")
                .header(http::header::AUTHORIZATION, BASIC_CREDENTIALS)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app().oneshot(get("/basic-auth")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(http::header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn slow_route_returns_requested_body() {
    let resp = app().oneshot(get("/slow/1?body=late")).await.unwrap();
    assert_eq!(body_bytes(resp).await, "late");
}
