//! Replay the JSON vectors in `test-vectors/` through the scripted engine.
//!
//! Header vectors feed raw header lines to a real `Request` and compare the
//! resulting header map and debug rendering; query vectors compare the URL
//! that reaches the transfer handle.

use std::collections::BTreeMap;
use std::sync::Arc;

use request_core::transport::Outcome;
use request_core::{Config, LibraryState, Request, ScriptedEngine};

fn scripted() -> (ScriptedEngine, Request<ScriptedEngine>) {
    let engine = ScriptedEngine::new();
    let library = Arc::new(LibraryState::new(engine.clone()));
    let request = Request::with_config(library, Config::default()).unwrap();
    (engine, request)
}

#[test]
fn header_block_vectors() {
    let raw = include_str!("../../test-vectors/header_blocks.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let lines: Vec<String> = serde_json::from_value(case["lines"].clone()).unwrap();
        let body = case["body"].as_str().unwrap();
        let expected: BTreeMap<String, Vec<String>> =
            serde_json::from_value(case["expected_headers"].clone()).unwrap();

        let (engine, mut request) = scripted();
        engine.push(Outcome::Complete {
            status,
            headers: lines,
            body: body.as_bytes().to_vec(),
        });
        let response = request.set_url("http://scripted/").send(1).unwrap();

        assert_eq!(response.status, status, "{name}: status");
        assert_eq!(response.headers, expected, "{name}: headers");
        assert_eq!(response.text(), body, "{name}: body");
        assert_eq!(
            response.to_string(),
            case["expected_display"].as_str().unwrap(),
            "{name}: display"
        );
        for (header, values) in &expected {
            assert_eq!(
                response.header(&header.to_uppercase()),
                values.as_slice(),
                "{name}: lookup {header}"
            );
        }
    }
}

#[test]
fn query_arg_vectors() {
    let raw = include_str!("../../test-vectors/query_args.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let args: Vec<(String, String)> = serde_json::from_value(case["args"].clone()).unwrap();
        let expected = case["expected_url"].as_str().unwrap();

        let (engine, mut request) = scripted();
        request.set_url(case["url"].as_str().unwrap());
        for (key, value) in &args {
            request.add_arg(key, value);
        }
        assert_eq!(request.effective_url(), expected, "{name}: effective url");

        request.send(1).unwrap();
        let journal = engine.journal();
        assert_eq!(journal.attempts.len(), 1, "{name}: attempts");
        assert_eq!(journal.attempts[0].url, expected, "{name}: sent url");
    }
}
