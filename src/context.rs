//! The execution context owning backend access and binding state.

use crate::backend::{ProgramHandle, ShaderBackend};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One graphics execution context: the backend plus the identity of the
/// program currently active in it.
///
/// Holding "currently bound" here rather than in a process-wide static keeps
/// multiple contexts independent and lets tests substitute a stub backend.
/// Backend calls themselves must still happen on the thread owning the
/// underlying graphics context.
#[derive(Debug)]
pub struct ShaderContext {
    backend: Arc<dyn ShaderBackend>,
    bound: Mutex<Option<ProgramHandle>>,
}

impl ShaderContext {
    /// Creates a context over the given backend with nothing bound.
    pub fn new(backend: Arc<dyn ShaderBackend>) -> Self {
        Self {
            backend,
            bound: Mutex::new(None),
        }
    }

    /// The backend this context drives.
    pub fn backend(&self) -> &dyn ShaderBackend {
        self.backend.as_ref()
    }

    /// Whether `program` is the currently active program in this context.
    pub fn is_bound(&self, program: ProgramHandle) -> bool {
        *self.lock_bound() == Some(program)
    }

    /// Makes `program` current, skipping the backend call when it already is.
    pub(crate) fn bind(&self, program: ProgramHandle) {
        let mut bound = self.lock_bound();
        if *bound != Some(program) {
            self.backend.use_program(Some(program));
            *bound = Some(program);
        }
    }

    /// Deactivates whatever program is current.
    pub(crate) fn unbind(&self) {
        let mut bound = self.lock_bound();
        self.backend.use_program(None);
        *bound = None;
    }

    /// Deactivates `program` if and only if it is the current one. Used on
    /// disposal, which must never leave a deleted handle bound.
    pub(crate) fn unbind_if_current(&self, program: ProgramHandle) {
        let mut bound = self.lock_bound();
        if *bound == Some(program) {
            self.backend.use_program(None);
            *bound = None;
        }
    }

    // Binding state stays meaningful even if a panic poisoned the lock.
    fn lock_bound(&self) -> MutexGuard<'_, Option<ProgramHandle>> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
