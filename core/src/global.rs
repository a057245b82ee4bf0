//! Process-wide transport library state.
//!
//! # Design
//! The transport library must be initialized before the first handle is
//! created and torn down after the last one is released. `LibraryState`
//! pairs the engine with a mutex-guarded count of live `Request`s; the lock
//! covers both the count change and the init/teardown call so two threads
//! can never race on either transition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::transport::{TransferEngine, UreqEngine};

static DEFAULT_LIBRARY: Lazy<Arc<LibraryState<UreqEngine>>> =
    Lazy::new(|| Arc::new(LibraryState::new(UreqEngine)));

/// The process-wide state shared by every `Request::new()`.
pub fn default_library() -> Arc<LibraryState<UreqEngine>> {
    Arc::clone(&DEFAULT_LIBRARY)
}

/// A transfer engine plus the reference count guarding its global setup.
#[derive(Debug)]
pub struct LibraryState<E> {
    engine: E,
    live: Mutex<usize>,
}

impl<E: TransferEngine> LibraryState<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            live: Mutex::new(0),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Register one live instance, initializing the library on the first.
    ///
    /// The count is left untouched when initialization fails, so the next
    /// caller retries it.
    pub fn acquire(&self) -> Result<()> {
        let mut live = self.lock();
        if *live == 0 {
            self.engine.global_init().map_err(Error::Initialization)?;
            tracing::debug!("transport library initialized");
        }
        *live += 1;
        Ok(())
    }

    /// Unregister one live instance, tearing the library down after the last.
    pub fn release(&self) {
        let mut live = self.lock();
        match *live {
            0 => tracing::warn!("transport library released more often than acquired"),
            1 => {
                self.engine.global_cleanup();
                *live = 0;
                tracing::debug!("transport library torn down");
            }
            _ => *live -= 1,
        }
    }

    pub fn live_instances(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
