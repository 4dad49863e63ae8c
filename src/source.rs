//! Shader source values, stage kinds and the source-reading seam.

use crate::error::ShaderError;
use std::fmt;
use std::path::PathBuf;

/// The closed set of shader pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Vertex stage, processes each vertex independently.
    Vertex,
    /// Fragment stage, produces final pixel colors.
    Fragment,
    /// Geometry stage, generates primitives from input vertices.
    Geometry,
    /// Tessellation control stage.
    TessControl,
    /// Tessellation evaluation stage.
    TessEvaluation,
    /// Compute stage, general-purpose GPU work.
    Compute,
}

impl StageKind {
    /// All stage kinds, in pipeline order.
    pub const ALL: [StageKind; 6] = [
        StageKind::Vertex,
        StageKind::Fragment,
        StageKind::Geometry,
        StageKind::TessControl,
        StageKind::TessEvaluation,
        StageKind::Compute,
    ];

    /// The backend numeric type tag for this stage (GL shader type constants).
    pub fn gl_type(self) -> u32 {
        match self {
            StageKind::Vertex => 0x8B31,
            StageKind::Fragment => 0x8B30,
            StageKind::Geometry => 0x8DD9,
            StageKind::TessControl => 0x8E88,
            StageKind::TessEvaluation => 0x8E87,
            StageKind::Compute => 0x91B9,
        }
    }

    /// The canonical file extension, without leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            StageKind::Vertex => "vert",
            StageKind::Fragment => "frag",
            StageKind::Geometry => "geom",
            StageKind::TessControl => "tesc",
            StageKind::TessEvaluation => "tese",
            StageKind::Compute => "comp",
        }
    }

    /// Human-readable stage name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Geometry => "geometry",
            StageKind::TessControl => "tess_control",
            StageKind::TessEvaluation => "tess_evaluation",
            StageKind::Compute => "compute",
        }
    }

    /// Maps a file extension (with or without leading dot) to its stage kind.
    ///
    /// Accepts canonical extensions, full stage names, and common aliases
    /// (`vs`/`vsh` for vertex, `fs`/`fsh`/`ps` for fragment, `gs`/`gsh` for
    /// geometry, `cs`/`csh` for compute).
    pub fn from_extension(ext: &str) -> Result<Self, ShaderError> {
        let normalized = ext.strip_prefix('.').unwrap_or(ext);
        match normalized {
            "vert" | "vertex" | "vs" | "vsh" => Ok(StageKind::Vertex),
            "frag" | "fragment" | "fs" | "fsh" | "ps" => Ok(StageKind::Fragment),
            "geom" | "geometry" | "gs" | "gsh" => Ok(StageKind::Geometry),
            "tesc" | "tess_control" => Ok(StageKind::TessControl),
            "tese" | "tess_evaluation" => Ok(StageKind::TessEvaluation),
            "comp" | "compute" | "cs" | "csh" => Ok(StageKind::Compute),
            _ => Err(ShaderError::UnknownExtension(ext.to_string())),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable shader source text with its logical origin.
///
/// The logical path uses forward slashes regardless of platform; it anchors
/// relative `#include` resolution and shows up in diagnostics. Sources are
/// created when text is read and discarded after compilation.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    text: String,
    path: String,
    kind: StageKind,
}

impl ShaderSource {
    /// Creates a source value from raw text.
    pub fn new(text: impl Into<String>, path: impl Into<String>, kind: StageKind) -> Self {
        Self {
            text: text.into(),
            path: path.into(),
            kind,
        }
    }

    /// The source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The logical path this source was read from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The pipeline stage this source targets.
    pub fn kind(&self) -> StageKind {
        self.kind
    }
}

/// Seam for reading shader source text by logical path.
///
/// Implemented over the filesystem here; tests substitute an in-memory tree.
pub trait SourceReader {
    /// Reads the full text of the source at `path`.
    ///
    /// # Errors
    /// [`ShaderError::ResourceNotFound`] when the path does not resolve,
    /// [`ShaderError::Io`] for any other read failure.
    fn read_text(&self, path: &str) -> Result<String, ShaderError>;
}

/// Filesystem-backed [`SourceReader`].
///
/// Logical paths are interpreted relative to the optional root directory, or
/// to the process working directory when no root is set.
#[derive(Debug, Default)]
pub struct FsSourceReader {
    root: Option<PathBuf>,
}

impl FsSourceReader {
    /// A reader resolving logical paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader resolving logical paths against `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl SourceReader for FsSourceReader {
    fn read_text(&self, path: &str) -> Result<String, ShaderError> {
        let fs_path = match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        };
        std::fs::read_to_string(&fs_path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ShaderError::ResourceNotFound {
                    path: path.to_string(),
                }
            } else {
                ShaderError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }
}
