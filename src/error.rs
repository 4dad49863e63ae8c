//! Error types for the shader lifecycle.

use crate::source::StageKind;
use thiserror::Error;

/// Errors that can occur while loading, preprocessing, compiling, linking or
/// looking up shader programs.
///
/// Post-link validation failures are deliberately absent: they are surfaced
/// as `log::warn!` events and never block program creation.
#[derive(Error, Debug)]
pub enum ShaderError {
    /// Compilation of a single shader stage failed.
    #[error("failed to compile {stage} shader: {log}")]
    CompilationFailed {
        /// Stage that failed to compile.
        stage: StageKind,
        /// Diagnostic log reported by the backend compiler.
        log: String,
    },

    /// Program linking failed after all stages compiled successfully.
    #[error("failed to link shader program: {log}")]
    LinkingFailed {
        /// Diagnostic log reported by the backend linker.
        log: String,
    },

    /// A shader source could not be located.
    #[error("shader source not found: {path}")]
    ResourceNotFound {
        /// Logical path that failed to resolve.
        path: String,
    },

    /// I/O error while reading shader source.
    #[error("failed to read shader '{path}': {source}")]
    Io {
        /// Path being read when the error occurred.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An `#include` chain revisited a file already on the expansion stack.
    #[error("cyclic #include detected involving '{path}'")]
    CyclicInclude {
        /// Resolved path that reappeared on the expansion stack.
        path: String,
    },

    /// Logical state violation, e.g. building a program with zero stages or
    /// binding a disposed program.
    #[error("invalid shader state: {0}")]
    InvalidState(String),

    /// Registry lookup for a name that is neither realized nor registered.
    #[error("unknown shader: {0}")]
    UnknownShader(String),

    /// File extension does not map to any shader stage.
    #[error("unknown shader extension: {0}")]
    UnknownExtension(String),
}
