//! Filesystem shader loading with include preprocessing.
//!
//! Convenience layer over [`Preprocessor`] and [`ProgramBuilder`]: reads
//! stage sources from disk, expands their `#include` directives relative to
//! each file's directory, and hands the result to the compile/link sequence.

use crate::context::ShaderContext;
use crate::error::ShaderError;
use crate::preprocessor::Preprocessor;
use crate::program::{ProgramBuilder, ShaderProgram};
use crate::source::{FsSourceReader, ShaderSource, SourceReader, StageKind};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads a shader file and expands its `#include` directives, resolving
/// include paths relative to the file's directory.
pub fn read_file(path: &Path) -> Result<String, ShaderError> {
    let logical = logical_path(path);
    let reader = FsSourceReader::new();
    let text = reader.read_text(&logical)?;
    Preprocessor::new(&reader).expand(&text, &logical)
}

/// Determines the stage kind from a file's extension.
///
/// # Errors
/// [`ShaderError::UnknownExtension`] when the path has no extension or the
/// extension maps to no stage.
pub fn stage_from_path(path: &Path) -> Result<StageKind, ShaderError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| ShaderError::UnknownExtension(path.display().to_string()))?;
    StageKind::from_extension(ext)
}

/// Loads, preprocesses, compiles and links a vertex + fragment pair.
pub fn from_files(
    context: &Arc<ShaderContext>,
    vertex: &Path,
    fragment: &Path,
) -> Result<ShaderProgram, ShaderError> {
    FileLoader::new(Arc::clone(context))
        .vertex(vertex)?
        .fragment(fragment)?
        .build()
}

/// Loads a program using the implicit naming convention: `base.vert` and
/// `base.frag`.
pub fn from_base_path(
    context: &Arc<ShaderContext>,
    base: &Path,
) -> Result<ShaderProgram, ShaderError> {
    from_files(
        context,
        &with_appended_extension(base, "vert"),
        &with_appended_extension(base, "frag"),
    )
}

// `Path::with_extension` would replace an existing extension; the naming
// convention appends instead, so "water.fx" becomes "water.fx.vert".
fn with_appended_extension(base: &Path, ext: &str) -> PathBuf {
    let mut os: OsString = base.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

fn logical_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Fluent loader accumulating preprocessed stage files for one program.
#[derive(Debug)]
pub struct FileLoader {
    builder: ProgramBuilder,
}

impl FileLoader {
    /// Creates an empty loader on the given context.
    pub fn new(context: Arc<ShaderContext>) -> Self {
        Self {
            builder: ProgramBuilder::new(context),
        }
    }

    /// Loads and preprocesses a stage file of an explicit kind.
    pub fn stage(mut self, kind: StageKind, path: &Path) -> Result<Self, ShaderError> {
        let text = read_file(path)?;
        self.builder = self
            .builder
            .stage(ShaderSource::new(text, logical_path(path), kind));
        Ok(self)
    }

    /// Loads a stage file, inferring its kind from the file extension.
    pub fn stage_auto(self, path: &Path) -> Result<Self, ShaderError> {
        let kind = stage_from_path(path)?;
        self.stage(kind, path)
    }

    /// Loads a vertex stage file.
    pub fn vertex(self, path: &Path) -> Result<Self, ShaderError> {
        self.stage(StageKind::Vertex, path)
    }

    /// Loads a fragment stage file.
    pub fn fragment(self, path: &Path) -> Result<Self, ShaderError> {
        self.stage(StageKind::Fragment, path)
    }

    /// Loads a geometry stage file.
    pub fn geometry(self, path: &Path) -> Result<Self, ShaderError> {
        self.stage(StageKind::Geometry, path)
    }

    /// Loads a compute stage file.
    pub fn compute(self, path: &Path) -> Result<Self, ShaderError> {
        self.stage(StageKind::Compute, path)
    }

    /// Compiles and links the accumulated stages.
    pub fn build(self) -> Result<ShaderProgram, ShaderError> {
        self.builder.build()
    }
}
