//! Lifecycle management for GPU shader programs: source composition with
//! recursive `#include` resolution, compile/link/validate orchestration with
//! deterministic cleanup, memoized uniform location lookups, and a lazy named
//! program registry with hot reload.
//!
//! The graphics API itself sits behind the [`ShaderBackend`] trait; all
//! backend calls must run on the single thread owning the graphics context,
//! while registry registration and lookup are safe from any thread.

// --- Private/Internal Modules ---
// Shared test doubles, only compiled for tests.
#[cfg(test)]
mod test_utils;

// --- Public Modules ---
// These form the public API surface of the crate.
pub mod backend;
pub mod context;
pub mod error;
pub mod loader;
pub mod preprocessor;
pub mod program;
pub mod registry;
pub mod source;
pub mod stage;
pub mod uniform;

// --- Public Re-exports --- //
// Re-export key types for easier access by users of the crate.

pub use backend::{ProgramHandle, ShaderBackend, StageHandle, UniformValue};
pub use context::ShaderContext;
pub use error::ShaderError;
pub use preprocessor::Preprocessor;
pub use program::{ProgramBuilder, ShaderProgram};
pub use registry::{ShaderRegistry, ShaderSupplier};
pub use source::{FsSourceReader, ShaderSource, SourceReader, StageKind};
pub use stage::CompiledStage;
pub use uniform::UniformCache;
