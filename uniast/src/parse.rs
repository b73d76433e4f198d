//! The top-level `Parse` entry point (spec §6): ties workspace discovery,
//! LSP client boot, collection, and graph building into the single call
//! callers actually use.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::collector::{CollectStats, Collector};
use crate::error::Result;
use crate::langspec::{self, LanguageSpec};
use crate::lsp::LspClient;
use crate::model::Repository;
use crate::options::{Language, ParseOptions};

/// Everything `Parse` hands back: the artifact plus the run's recoverable
/// failure counters (spec §7, verbose-mode accumulator).
pub struct ParseOutcome {
    pub repository: Repository,
    pub stats: CollectStats,
}

/// Scans `root` per `options` and returns the resulting UniAST JSON bytes
/// plus run statistics. Fatal boot errors (toolchain missing, LSP capability
/// shortfall, manifest unreadable) return `Err` immediately; everything else
/// is recorded on `ParseOutcome::stats` and logged.
#[instrument(skip(options, cancel), fields(root = %root.display()))]
pub async fn parse(
    root: &Path,
    options: &ParseOptions,
    cancel: CancellationToken,
) -> Result<ParseOutcome> {
    let language = options
        .language
        .ok_or_else(|| crate::error::CollectError::UnknownLanguage("none specified".into()))?;

    let mut lang_spec = langspec::for_language(language);
    let members = lang_spec.workspace(root)?;
    info!(modules = members.len(), "workspace discovered");

    if language.bypasses_lsp() {
        return parse_native(root, options, lang_spec.as_ref(), members, cancel).await;
    }

    if language == Language::Rust {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || langspec::ensure_toolchain(&root))
            .await
            .map_err(|e| crate::error::CollectError::ToolchainMissing(format!("toolchain check task panicked: {e}")))??;
    }

    let (command, args) = server_command(language, options)?;
    let language_id = language_id(language);

    let boot_timeout = estimate_boot_timeout(members.len());
    let client = tokio::time::timeout(
        boot_timeout,
        LspClient::spawn(
            &command,
            &args,
            root,
            language_id,
            options
                .lsp_cache_path
                .clone()
                .or_else(|| crate::lsp::default_cache_path(options.repo_id.as_deref().unwrap_or("default"))),
        ),
    )
    .await
    .map_err(|_| crate::error::CollectError::InitializeFailed(format!("server boot exceeded {boot_timeout:?}")))??;

    let client = Arc::new(client);

    let mut repo = Repository::new(options.repo_id.clone().unwrap_or_else(|| root.display().to_string()));
    let modules: Vec<(String, std::path::PathBuf)> = members.into_iter().collect();

    let mut collector = Collector::new(client.clone(), lang_spec.as_ref(), options, cancel);
    collector.scan(&mut repo, &modules).await?;

    crate::graph::build_graph(&mut repo);

    if let Err(e) = client.flush_disk_cache() {
        warn!("failed to flush LSP disk cache: {e}");
    }

    Ok(ParseOutcome {
        repository: repo,
        stats: collector.stats(),
    })
}

/// Go and TypeScript/JavaScript skip the LSP client entirely per spec §6:
/// their Function/Type/Var entities come from `crate::treesitter::go`
/// (tree-sitter-go) and `crate::treesitter::typescript` (OXC) respectively,
/// walked directly off each file's source text. Workspace/namespace/imports
/// population happens here regardless of language; the per-file entity
/// extraction below is the native-AST counterpart to what `Collector::scan`
/// does for LSP-backed languages.
async fn parse_native(
    root: &Path,
    options: &ParseOptions,
    lang_spec: &dyn LanguageSpec,
    members: std::collections::BTreeMap<String, std::path::PathBuf>,
    _cancel: CancellationToken,
) -> Result<ParseOutcome> {
    let mut repo = Repository::new(options.repo_id.clone().unwrap_or_else(|| root.display().to_string()));
    let mut stats = CollectStats::default();

    for (name, dir) in &members {
        let module = repo.module_mut(name);
        module.dir = dir.to_string_lossy().to_string();
        module.language = lang_spec.language().as_str().to_string();

        for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || lang_spec.should_skip(entry.path()) {
                continue;
            }
            if options.not_need_test && lang_spec.is_test_file(entry.path()) {
                continue;
            }
            let Ok(bytes) = std::fs::read(entry.path()) else {
                continue;
            };
            let (mod_path, pkg_path) = lang_spec.name_space(entry.path());
            let imports = lang_spec.file_imports(&bytes);
            let file_path = entry.path().to_string_lossy().to_string();
            let package = module.package_mut(&pkg_path);
            package.is_test = lang_spec.is_test_file(entry.path());
            module.files.insert(
                file_path.clone(),
                crate::model::File {
                    path: file_path.clone(),
                    package: pkg_path.clone(),
                    imports,
                },
            );

            let Ok(source) = String::from_utf8(bytes) else {
                continue;
            };
            let package = module.package_mut(&pkg_path);
            let extracted = match lang_spec.language() {
                Language::Go => crate::treesitter::go::collect_file(&source, &file_path, &mod_path, &pkg_path, package),
                Language::TypeScript => {
                    crate::treesitter::typescript::collect_file(&source, &file_path, &mod_path, &pkg_path, package)
                }
                _ => Ok(()),
            };
            match extracted {
                Ok(()) => stats.files_scanned += 1,
                Err(e) => {
                    warn!(file = %file_path, error = %e, "native entity extraction failed, skipping file");
                    stats.files_skipped += 1;
                }
            }
        }

        for package in module.packages.values_mut() {
            crate::linking::link_methods_in_package(package);
        }
    }

    crate::graph::build_graph(&mut repo);
    Ok(ParseOutcome { repository: repo, stats })
}

fn server_command(language: Language, options: &ParseOptions) -> Result<(String, Vec<String>)> {
    if let Some(path) = &options.lsp {
        return Ok((path.to_string_lossy().to_string(), Vec::new()));
    }
    match language {
        Language::Rust => Ok(("rust-analyzer".to_string(), Vec::new())),
        Language::Python => Ok(("pylsp".to_string(), Vec::new())),
        Language::C => Ok(("clangd".to_string(), Vec::new())),
        Language::Java => Ok(("jdtls".to_string(), Vec::new())),
        Language::Go | Language::TypeScript => Err(crate::error::CollectError::UnknownLanguage(
            "Go/TypeScript bypass the LSP client; no server command needed".to_string(),
        )),
    }
}

fn language_id(language: Language) -> &'static str {
    match language {
        Language::Rust => "rust",
        Language::Python => "python",
        Language::C => "c",
        Language::Java => "java",
        Language::Go => "go",
        Language::TypeScript => "typescript",
    }
}

/// Spec §4.4 step 2: "wait CheckRepo-returned duration scaled by repo size
/// (minimum ~15s for Rust, higher for larger repos; up to 5 minutes)".
fn estimate_boot_timeout(module_count: usize) -> Duration {
    let scaled = Duration::from_secs(15 + (module_count as u64).saturating_mul(2));
    scaled.min(Duration::from_secs(5 * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_timeout_is_clamped_to_five_minutes() {
        assert_eq!(estimate_boot_timeout(0), Duration::from_secs(15));
        assert_eq!(estimate_boot_timeout(1000), Duration::from_secs(300));
    }
}
