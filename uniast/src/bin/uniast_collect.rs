//! `uniast-collect` — a thin CLI wrapper over [`uniast::parse`] (spec §6).
//! Not a general-purpose tool: it exists to invoke `Parse`/`LoadRepo` from a
//! shell the way `loct.rs` is a thin wrapper over `loctree::analyzer`.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use uniast::options::{Language, ParseOptions, PathPattern};
use uniast::{config, logging, repo_io};

#[derive(Parser, Debug)]
#[command(name = "uniast-collect", about = "Collect a UniAST artifact from a repository")]
struct Cli {
    /// Repository root to scan.
    root: PathBuf,

    /// Source language to collect (drives which LanguageSpec + server is used).
    #[arg(long, value_enum)]
    lang: CliLanguage,

    /// Explicit language-server binary, overriding the default for `--lang`.
    #[arg(long)]
    lsp: Option<PathBuf>,

    /// Output path for the UniAST JSON artifact. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path regex to exclude; repeatable.
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// Path regex to restrict collection to; repeatable.
    #[arg(long = "include")]
    includes: Vec<String>,

    /// Follow external (non-repository) symbol definitions up to the
    /// configured `ReferCodeDepth`.
    #[arg(long)]
    load_external_symbols: bool,

    /// Skip attaching doc comments to entity content.
    #[arg(long)]
    no_comment: bool,

    /// Skip test files entirely (filename/path conventions per language).
    #[arg(long)]
    no_test: bool,

    /// Eagerly materialize every public symbol of a referenced external
    /// package, instead of loading referenced symbols one at a time.
    #[arg(long)]
    load_by_packages: bool,

    /// Verbose logging (`uniast=debug`) and a stats summary on stderr.
    #[arg(long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliLanguage {
    Rust,
    Python,
    C,
    Java,
    Go,
    Typescript,
}

impl From<CliLanguage> for Language {
    fn from(l: CliLanguage) -> Self {
        match l {
            CliLanguage::Rust => Language::Rust,
            CliLanguage::Python => Language::Python,
            CliLanguage::C => Language::C,
            CliLanguage::Java => Language::Java,
            CliLanguage::Go => Language::Go,
            CliLanguage::Typescript => Language::TypeScript,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let root = cli.root.canonicalize().unwrap_or(cli.root.clone());
    let mut options = ParseOptions::new(cli.lang.into());
    options.lsp = cli.lsp.clone();
    options.load_external_symbol = cli.load_external_symbols;
    options.no_need_comment = cli.no_comment;
    options.not_need_test = cli.no_test;
    options.load_by_packages = cli.load_by_packages;
    options.verbose = cli.verbose;
    options.repo_id = Some(root.display().to_string());

    for pattern in &cli.excludes {
        options.excludes.push(PathPattern::new(pattern)?);
    }
    for pattern in &cli.includes {
        options.includes.push(PathPattern::new(pattern)?);
    }

    if let Some(project_config) = config::ProjectConfig::load(&root)? {
        project_config.apply_to(&mut options)?;
    }

    let outcome = uniast::parse(&root, &options, CancellationToken::new()).await?;

    if cli.verbose {
        eprintln!(
            "scanned {} files ({} skipped), {} symbols, {} definition-follows, {} rpc failures",
            outcome.stats.files_scanned,
            outcome.stats.files_skipped,
            outcome.stats.symbols_collected,
            outcome.stats.definition_follows,
            outcome.stats.rpc_failures,
        );
    }

    match &cli.out {
        Some(path) => repo_io::save(&outcome.repository, path)?,
        None => {
            let bytes = repo_io::to_bytes(&outcome.repository)?;
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
        }
    }

    Ok(())
}
