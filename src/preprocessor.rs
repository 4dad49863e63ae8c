//! Recursive `#include` expansion for shader source text.
//!
//! Directives are recognized per physical line and replaced inline with the
//! fully expanded contents of the referenced source, so line-based compiler
//! diagnostics stay approximately locatable. Include paths resolve relative
//! to the directory of the file containing the directive, and cycles are
//! detected by tracking the full resolved-path expansion stack.

use crate::error::ShaderError;
use crate::source::SourceReader;
use once_cell::sync::Lazy;
use regex::Regex;

// Matches `#include "path/to/file"` or `#include <path/to/file>` on a line of
// its own. Anything else passes through to the compiler untouched.
static INCLUDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*#include\s+["<](.+?)[">]\s*$"#).expect("include pattern is valid")
});

/// Expands `#include` directives using a [`SourceReader`] to fetch referenced
/// sources.
pub struct Preprocessor<'r> {
    reader: &'r dyn SourceReader,
}

impl<'r> Preprocessor<'r> {
    /// Creates a preprocessor reading included sources through `reader`.
    pub fn new(reader: &'r dyn SourceReader) -> Self {
        Self { reader }
    }

    /// Produces `text` with every include directive replaced by the
    /// recursively expanded contents of the referenced source.
    ///
    /// `logical_path` is the path `text` was read from; it anchors relative
    /// include resolution and seeds the cycle-detection stack, so a file
    /// including itself fails immediately.
    ///
    /// # Errors
    /// [`ShaderError::CyclicInclude`] when a resolved path reappears on the
    /// expansion stack; read failures propagate from the reader.
    pub fn expand(&self, text: &str, logical_path: &str) -> Result<String, ShaderError> {
        let root = normalize(logical_path);
        let mut stack = vec![root.clone()];
        self.expand_into(text, &directory_of(&root), &mut stack)
    }

    fn expand_into(
        &self,
        text: &str,
        base_dir: &str,
        stack: &mut Vec<String>,
    ) -> Result<String, ShaderError> {
        let mut lines = Vec::new();
        for line in text.split('\n') {
            let Some(captures) = INCLUDE_PATTERN.captures(line) else {
                lines.push(line.to_string());
                continue;
            };
            let resolved = resolve(base_dir, &captures[1]);
            if stack.contains(&resolved) {
                return Err(ShaderError::CyclicInclude { path: resolved });
            }
            let included = self.reader.read_text(&resolved)?;
            log::trace!("expanding include '{resolved}'");
            stack.push(resolved.clone());
            let expanded = self.expand_into(&included, &directory_of(&resolved), stack)?;
            stack.pop();
            lines.push(expanded);
        }
        Ok(lines.join("\n"))
    }
}

/// Joins an include path onto the directory of the including file and
/// normalizes the result.
fn resolve(base_dir: &str, include: &str) -> String {
    if base_dir.is_empty() {
        normalize(include)
    } else {
        normalize(&format!("{base_dir}/{include}"))
    }
}

/// Collapses `.` and `..` segments and unifies separators, giving every file
/// one canonical spelling for cycle detection.
fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Relative paths may climb above their starting point;
                // absolute paths cannot climb above the root.
                if matches!(segments.last(), None | Some(&"..")) {
                    if !absolute {
                        segments.push("..");
                    }
                } else {
                    segments.pop();
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// The directory component of a logical path, or empty for bare filenames.
fn directory_of(path: &str) -> String {
    match path.rfind('/') {
        Some(index) => path[..index].to_string(),
        None => String::new(),
    }
}
