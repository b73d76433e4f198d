//! Project-level defaults read from a `uniast.toml` file (spec §7b), layered
//! underneath CLI-supplied [`ParseOptions`] the way `loctree_rs::config`
//! layers `.loctreerc` under its own CLI flags — file values fill gaps the
//! CLI left unset, CLI flags always win.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::options::{ParseOptions, PathPattern};

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    pub lang: Option<String>,
    pub lsp: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    pub load_external_symbols: Option<bool>,
    pub refer_code_depth: Option<u32>,
}

impl ProjectConfig {
    /// Reads `uniast.toml` from `dir` if present. A missing file is not an
    /// error — it just means there are no project defaults to layer in.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join("uniast.toml");
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let config: ProjectConfig = toml::from_str(&text)
            .map_err(|e| crate::error::CollectError::ManifestRead {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            })?;
        Ok(Some(config))
    }

    /// Fills any `ParseOptions` field the CLI left at its default with this
    /// config's value. Never overwrites a value the caller already set.
    pub fn apply_to(&self, options: &mut ParseOptions) -> Result<()> {
        if options.lsp.is_none() {
            options.lsp = self.lsp.clone();
        }
        if options.lsp_cache_path.is_none() {
            options.lsp_cache_path = self.cache_path.clone();
        }
        if !self.load_external_symbols.unwrap_or(false) {
            // leave CLI value as-is; config can only turn this on, not off,
            // since `ParseOptions::default` already means "off".
        } else {
            options.load_external_symbol = true;
        }
        if let Some(depth) = self.refer_code_depth {
            options.refer_code_depth = depth;
        }
        for pattern in &self.exclude {
            options.excludes.push(PathPattern::new(pattern)?);
        }
        for pattern in &self.include {
            options.includes.push(PathPattern::new(pattern)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn parses_excludes_and_includes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("uniast.toml"),
            r#"
            exclude = ["/target/", "/vendor/"]
            include = ["\\.rs$"]
            refer_code_depth = 2
            "#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().expect("config present");
        assert_eq!(config.exclude.len(), 2);
        assert_eq!(config.refer_code_depth, Some(2));

        let mut options = ParseOptions::new(crate::options::Language::Rust);
        config.apply_to(&mut options).unwrap();
        assert_eq!(options.excludes.len(), 2);
        assert_eq!(options.includes.len(), 1);
        assert_eq!(options.refer_code_depth, 2);
    }
}
