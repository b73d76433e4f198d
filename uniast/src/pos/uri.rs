//! A small, version-stable wrapper around `file://` URIs.
//!
//! `lsp-types` has churned its URI representation across major versions
//! (`Url` -> `Uri`); the rest of the crate should never have to care. This
//! newtype is the only place that conversion happens.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileUri(String);

impl FileUri {
    /// Builds a `file://` URI from an absolute filesystem path.
    pub fn from_path(path: &Path) -> Self {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(path)
        };
        Self(format!("file://{}", abs.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strips the `file://` prefix back down to a filesystem path. Panics on
    /// non-file URIs, which should never reach the collector (everything it
    /// queries is a local file).
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(self.0.trim_start_matches("file://"))
    }

    pub fn from_lsp_uri(uri: &lsp_types::Uri) -> Self {
        Self(uri.as_str().to_string())
    }

    pub fn to_lsp_uri(&self) -> lsp_types::Uri {
        self.0
            .parse()
            .unwrap_or_else(|_| panic!("invalid file uri: {}", self.0))
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for FileUri {
    fn from(p: &Path) -> Self {
        Self::from_path(p)
    }
}
