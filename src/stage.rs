//! A single compiled shader stage.

use crate::backend::StageHandle;
use crate::context::ShaderContext;
use crate::error::ShaderError;
use crate::source::{ShaderSource, StageKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A compiled shader stage owning exactly one backend shader object.
///
/// The backend object is released by [`CompiledStage::close`], which is
/// idempotent, or on drop, so every early-return path in program construction
/// releases it without explicit bookkeeping.
#[derive(Debug)]
pub struct CompiledStage {
    context: Arc<ShaderContext>,
    handle: StageHandle,
    kind: StageKind,
    disposed: AtomicBool,
}

impl CompiledStage {
    /// Compiles one stage's (already preprocessed) source into a backend
    /// shader object.
    ///
    /// On compile failure the partially created backend object is deleted
    /// before the error is returned; no stage value is produced.
    ///
    /// # Errors
    /// [`ShaderError::CompilationFailed`] carrying the stage kind and the
    /// backend's diagnostic log.
    pub fn compile(context: Arc<ShaderContext>, source: &ShaderSource) -> Result<Self, ShaderError> {
        let kind = source.kind();
        let backend = context.backend();
        let handle = backend
            .create_stage(kind)
            .map_err(|log| ShaderError::CompilationFailed { stage: kind, log })?;
        backend.set_source(handle, source.text());
        if let Err(log) = backend.compile(handle) {
            backend.delete_stage(handle);
            return Err(ShaderError::CompilationFailed { stage: kind, log });
        }
        log::debug!("compiled {kind} shader from '{}'", source.path());
        Ok(Self {
            context,
            handle,
            kind,
            disposed: AtomicBool::new(false),
        })
    }

    /// The backend handle of this stage object.
    pub fn handle(&self) -> StageHandle {
        self.handle
    }

    /// The pipeline stage this object was compiled for.
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Whether the backend object has been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Releases the backend shader object. Safe to call more than once.
    pub fn close(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.context.backend().delete_stage(self.handle);
        }
    }
}

impl Drop for CompiledStage {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;

    #[test]
    fn compile_produces_a_live_stage() {
        let (backend, context) = test_context();
        let source = ShaderSource::new("void main() {}", "a.vert", StageKind::Vertex);
        let stage = CompiledStage::compile(context, &source).map_err(|e| e.to_string());
        let stage = stage.unwrap_or_else(|e| panic!("compile failed: {e}"));
        assert_eq!(stage.kind(), StageKind::Vertex);
        assert!(!stage.is_disposed());
        assert_eq!(backend.live_stage_count(), 1);
    }

    #[test]
    fn compile_failure_deletes_the_partial_object() {
        let (backend, context) = test_context();
        backend.fail_compile(StageKind::Fragment, "syntax error at line 3");
        let source = ShaderSource::new("oops", "a.frag", StageKind::Fragment);
        match CompiledStage::compile(context, &source) {
            Err(ShaderError::CompilationFailed { stage, log }) => {
                assert_eq!(stage, StageKind::Fragment);
                assert!(log.contains("syntax error"));
            }
            other => panic!("expected CompilationFailed, got {other:?}"),
        }
        assert_eq!(backend.live_stage_count(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let (backend, context) = test_context();
        let source = ShaderSource::new("void main() {}", "a.vert", StageKind::Vertex);
        let stage = CompiledStage::compile(context, &source).ok();
        let stage = stage.unwrap_or_else(|| panic!("compile failed"));
        stage.close();
        stage.close();
        assert!(stage.is_disposed());
        assert_eq!(backend.live_stage_count(), 0);
        assert_eq!(backend.deleted_stage_count(), 1);
    }

    #[test]
    fn drop_releases_the_backend_object() {
        let (backend, context) = test_context();
        let source = ShaderSource::new("void main() {}", "a.vert", StageKind::Vertex);
        drop(CompiledStage::compile(context, &source));
        assert_eq!(backend.live_stage_count(), 0);
    }
}
