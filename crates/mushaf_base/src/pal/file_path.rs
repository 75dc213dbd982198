use relative_path::{RelativePath, RelativePathBuf};
use std::path::Path;

/* 📖 # Why use RelativePathBuf for FilePath?

Data files (the corpus, the translation directory, the config file) are
always addressed relative to the PAL's base directory. Wrapping
RelativePathBuf keeps absolute system paths out of the engine, so the same
loader code runs against RealPal and against the in-memory MockPal.
*/

/// Type-safe wrapper for file paths relative to the PAL base directory.
///
/// # Examples
///
/// ```
/// use mushaf_base::FilePath;
///
/// let dir = FilePath::from("data/translations");
/// assert_eq!(dir.join("en.json").to_string(), "data/translations/en.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePath.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }

    /// Appends a path segment.
    pub fn join(&self, segment: impl AsRef<str>) -> FilePath {
        Self(self.0.join(segment.as_ref()))
    }

    /// Returns the final component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Returns true if `self` lies inside `dir` (or is `dir` itself).
    pub fn starts_with(&self, dir: &FilePath) -> bool {
        let dir = dir.0.normalize();
        dir.as_str().is_empty() || dir.as_str() == "." || self.0.normalize().starts_with(&dir)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(p.to_string_lossy().into_owned()))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}
