//! Owner of one transfer handle and the resources lent to it.

use std::fs::File;

use crate::headers::HeaderChain;
use crate::mime::MimeForm;

/// A transfer handle together with its header chain, multipart form and
/// output file.
///
/// The chain and the form are lent to the handle for each transfer and must
/// outlive that use; `cleanup` drops them before the handle, and is safe to
/// call any number of times.
#[derive(Debug)]
pub(crate) struct Session<H> {
    pub handle: Option<H>,
    pub headers: Option<HeaderChain>,
    pub form: Option<MimeForm>,
    pub output: Option<File>,
}

impl<H> Session<H> {
    pub fn new(handle: H) -> Self {
        Self {
            handle: Some(handle),
            headers: None,
            form: None,
            output: None,
        }
    }

    /// Release every owned resource, then install `handle`.
    pub fn replace(&mut self, handle: H) {
        self.cleanup();
        self.handle = Some(handle);
    }

    pub fn cleanup(&mut self) {
        self.form = None;
        self.headers = None;
        self.output = None;
        self.handle = None;
    }

    #[cfg(test)]
    pub fn is_clean(&self) -> bool {
        self.handle.is_none()
            && self.headers.is_none()
            && self.form.is_none()
            && self.output.is_none()
    }
}

impl<H> Drop for Session<H> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptedEngine, TransferEngine};

    #[test]
    fn cleanup_is_idempotent() {
        let engine = ScriptedEngine::new();
        let mut session = Session::new(engine.create_handle().unwrap());
        session.headers = Some(HeaderChain::new());
        session.form = Some(MimeForm::new());
        session.output = Some(tempfile::tempfile().unwrap());

        session.cleanup();
        assert!(session.is_clean());
        assert_eq!(engine.journal().live_handles(), 0);

        session.cleanup();
        drop(session);
        assert_eq!(engine.journal().handles_released, 1);
    }

    #[test]
    fn replace_releases_old_handle_first() {
        let engine = ScriptedEngine::new();
        let mut session = Session::new(engine.create_handle().unwrap());
        session.headers = Some(HeaderChain::new());

        let next = engine.create_handle().unwrap();
        session.replace(next);
        assert!(session.headers.is_none());
        assert!(session.handle.is_some());
        assert_eq!(engine.journal().handles_released, 1);
        assert_eq!(engine.journal().live_handles(), 1);
    }

    #[test]
    fn moving_transfers_ownership() {
        let engine = ScriptedEngine::new();
        let session = Session::new(engine.create_handle().unwrap());
        let moved = session;
        assert!(moved.handle.is_some());
        drop(moved);
        assert_eq!(engine.journal().live_handles(), 0);
    }
}
