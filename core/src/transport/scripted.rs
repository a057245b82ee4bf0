//! Deterministic transfer engine that replays queued outcomes.
//!
//! # Design
//! All handles created by one `ScriptedEngine` share a journal and a script
//! queue behind a mutex. Each `perform` records what would have been sent,
//! pops the next `Outcome`, and feeds it to the sink exactly as a network
//! engine would: header lines verbatim, then the body, with progress
//! notifications around the body when progress is enabled. An empty script
//! answers `200` with no body.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::options::HandleOptions;
use super::{
    Body, Features, Payload, TransferEngine, TransferError, TransferHandle, TransferOption,
    TransferSink,
};
use crate::http::Progress;

/// What the next transfer attempt produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transfer completes. `headers` are raw lines handed to the sink
    /// unchanged, separators included.
    Complete {
        status: u16,
        headers: Vec<String>,
        body: Vec<u8>,
    },
    /// The transfer fails after observing `status` (0 for none).
    Fail { status: u16, error: TransferError },
}

impl Outcome {
    /// A single header block with a status line and `Content-Length`.
    pub fn ok(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Outcome::Complete {
            status,
            headers: vec![
                format!("HTTP/1.1 {status}\r\n"),
                format!("Content-Length: {}\r\n", body.len()),
                "\r\n".to_string(),
            ],
            body,
        }
    }

    pub fn fail(error: TransferError) -> Self {
        Outcome::Fail { status: 0, error }
    }
}

/// One recorded call to `perform`.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub at: Instant,
    pub method: String,
    pub url: String,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
    /// Every option set on the handle so far, in order.
    pub options: Vec<TransferOption>,
}

/// Snapshot of everything the engine has observed.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    pub global_inits: usize,
    pub global_cleanups: usize,
    /// Cleanups requested while the library was not initialized.
    pub unbalanced_cleanups: usize,
    pub handles_created: usize,
    pub handles_released: usize,
    pub attempts: Vec<AttemptRecord>,
}

impl Journal {
    pub fn live_handles(&self) -> usize {
        self.handles_created - self.handles_released
    }
}

#[derive(Debug, Default)]
struct Shared {
    journal: Journal,
    script: VecDeque<Outcome>,
    initialized: bool,
    fail_init: bool,
    fail_handles: bool,
}

/// Transfer engine whose results are queued by the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    shared: Arc<Mutex<Shared>>,
    features: Features,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Queue the outcome of a future attempt.
    pub fn push(&self, outcome: Outcome) -> &Self {
        self.lock().script.push_back(outcome);
        self
    }

    pub fn journal(&self) -> Journal {
        self.lock().journal.clone()
    }

    pub fn fail_global_init(&self, fail: bool) {
        self.lock().fail_init = fail;
    }

    pub fn fail_handle_creation(&self, fail: bool) {
        self.lock().fail_handles = fail;
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TransferEngine for ScriptedEngine {
    type Handle = ScriptedHandle;

    fn global_init(&self) -> Result<(), String> {
        let mut shared = self.lock();
        if shared.fail_init {
            return Err("scripted global initialization failure".to_string());
        }
        if shared.initialized {
            return Err("transport library initialized twice".to_string());
        }
        shared.initialized = true;
        shared.journal.global_inits += 1;
        Ok(())
    }

    fn global_cleanup(&self) {
        let mut shared = self.lock();
        if !shared.initialized {
            shared.journal.unbalanced_cleanups += 1;
            return;
        }
        shared.initialized = false;
        shared.journal.global_cleanups += 1;
    }

    fn features(&self) -> Features {
        self.features
    }

    fn create_handle(&self) -> Option<ScriptedHandle> {
        let mut shared = self.lock();
        if shared.fail_handles {
            return None;
        }
        shared.journal.handles_created += 1;
        Some(ScriptedHandle {
            shared: Arc::clone(&self.shared),
            options: HandleOptions::default(),
            history: Vec::new(),
            status: 0,
        })
    }
}

/// Handle produced by `ScriptedEngine`.
#[derive(Debug)]
pub struct ScriptedHandle {
    shared: Arc<Mutex<Shared>>,
    options: HandleOptions,
    history: Vec<TransferOption>,
    status: u16,
}

impl TransferHandle for ScriptedHandle {
    fn set_option(&mut self, option: TransferOption) {
        self.history.push(option.clone());
        self.options.apply(option);
    }

    fn perform(
        &mut self,
        payload: &Payload<'_>,
        sink: &mut dyn TransferSink,
    ) -> Result<(), TransferError> {
        self.status = 0;
        let sent = match payload.body {
            Body::None => Vec::new(),
            Body::Bytes(bytes) => bytes.to_vec(),
            Body::Form(form) => form
                .encode("scripted-boundary")
                .map_err(|e| TransferError::Read(e.to_string()))?,
        };
        let method = self.options.method_name(&payload.body).to_string();
        let url = self.options.url.clone().unwrap_or_default();
        let uploaded = sent.len() as u64;

        let outcome = {
            let mut shared = lock(&self.shared);
            shared.journal.attempts.push(AttemptRecord {
                at: Instant::now(),
                method: method.clone(),
                url: url.clone(),
                headers: payload.header_lines().map(str::to_string).collect(),
                body: sent,
                options: self.history.clone(),
            });
            if url.is_empty() {
                return Err(TransferError::UrlMalformat("no URL set".to_string()));
            }
            shared.script.pop_front()
        }
        .unwrap_or_else(|| Outcome::ok(200, Vec::new()));

        match outcome {
            Outcome::Fail { status, error } => {
                self.status = status;
                Err(error)
            }
            Outcome::Complete {
                status,
                headers,
                body,
            } => {
                self.status = status;
                for line in &headers {
                    sink.on_header(line.as_bytes());
                }
                let report = !self.options.no_progress;
                let mut progress = Progress {
                    dl_total: body.len() as u64,
                    dl_now: 0,
                    ul_total: uploaded,
                    ul_now: uploaded,
                };
                if report && sink.on_progress(progress) {
                    return Err(TransferError::AbortedByCallback);
                }
                if method != "HEAD" && !body.is_empty() {
                    sink.on_body(&body)
                        .map_err(|e| TransferError::Write(e.to_string()))?;
                    progress.dl_now = progress.dl_total;
                    if report && sink.on_progress(progress) {
                        return Err(TransferError::AbortedByCallback);
                    }
                }
                Ok(())
            }
        }
    }

    fn response_code(&self) -> u16 {
        self.status
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        lock(&self.shared).journal.handles_released += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture {
        headers: Vec<String>,
        body: Vec<u8>,
        progress: Vec<Progress>,
    }

    impl TransferSink for Capture {
        fn on_header(&mut self, line: &[u8]) {
            self.headers.push(String::from_utf8_lossy(line).into_owned());
        }

        fn on_body(&mut self, chunk: &[u8]) -> std::io::Result<()> {
            self.body.extend_from_slice(chunk);
            Ok(())
        }

        fn on_progress(&mut self, progress: Progress) -> bool {
            self.progress.push(progress);
            false
        }
    }

    fn payload() -> Payload<'static> {
        Payload {
            headers: None,
            body: Body::None,
        }
    }

    #[test]
    fn replays_script_in_order_then_defaults_to_ok() {
        let engine = ScriptedEngine::new();
        engine.push(Outcome::ok(201, "created"));
        engine.push(Outcome::fail(TransferError::OperationTimedOut));

        let mut handle = engine.create_handle().unwrap();
        handle.set_option(TransferOption::Url("http://scripted/".into()));

        let mut sink = Capture::default();
        handle.perform(&payload(), &mut sink).unwrap();
        assert_eq!(handle.response_code(), 201);
        assert_eq!(sink.body, b"created");
        assert_eq!(sink.headers.last().map(String::as_str), Some("\r\n"));

        let err = handle.perform(&payload(), &mut Capture::default()).unwrap_err();
        assert_eq!(err, TransferError::OperationTimedOut);
        assert_eq!(handle.response_code(), 0);

        handle.perform(&payload(), &mut Capture::default()).unwrap();
        assert_eq!(handle.response_code(), 200);
        assert_eq!(engine.journal().attempts.len(), 3);
    }

    #[test]
    fn progress_only_reported_when_enabled() {
        let engine = ScriptedEngine::new();
        let mut handle = engine.create_handle().unwrap();
        handle.set_option(TransferOption::Url("http://scripted/".into()));
        engine.push(Outcome::ok(200, "abc"));

        let mut quiet = Capture::default();
        handle.perform(&payload(), &mut quiet).unwrap();
        assert!(quiet.progress.is_empty());

        handle.set_option(TransferOption::NoProgress(false));
        engine.push(Outcome::ok(200, "abc"));
        let mut loud = Capture::default();
        handle.perform(&payload(), &mut loud).unwrap();
        assert_eq!(loud.progress.last().map(|p| p.dl_now), Some(3));
    }

    #[test]
    fn refuses_double_initialization() {
        let engine = ScriptedEngine::new();
        engine.global_init().unwrap();
        assert!(engine.global_init().is_err());
        engine.global_cleanup();
        engine.global_cleanup();
        let journal = engine.journal();
        assert_eq!(journal.global_inits, 1);
        assert_eq!(journal.global_cleanups, 1);
        assert_eq!(journal.unbalanced_cleanups, 1);
    }

    #[test]
    fn handle_release_is_journaled() {
        let engine = ScriptedEngine::new();
        let handle = engine.create_handle().unwrap();
        assert_eq!(engine.journal().live_handles(), 1);
        drop(handle);
        assert_eq!(engine.journal().live_handles(), 0);
    }
}
