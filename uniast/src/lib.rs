//! UniAST: a language-agnostic source-code knowledge extractor.
//!
//! Point [`parse::parse`] at a repository root and it drives a language
//! server (or, for Go/TypeScript, a native-AST bypass) over every file in
//! the workspace, collecting [`model::Function`]/[`model::Type`]/
//! [`model::Var`] entities and the dependency graph between them into a
//! single [`model::Repository`]. [`repo_io`] serializes that artifact to
//! JSON and reads it back.
//!
//! ```no_run
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//! use uniast::options::{Language, ParseOptions};
//!
//! # async fn run() -> uniast::error::Result<()> {
//! let options = ParseOptions::new(Language::Rust);
//! let outcome = uniast::parse::parse(Path::new("."), &options, CancellationToken::new()).await?;
//! uniast::repo_io::save(&outcome.repository, Path::new("uniast.json"))?;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod graph;
pub mod langspec;
pub mod linking;
pub mod logging;
pub mod lsp;
pub mod model;
pub mod options;
pub mod parse;
pub mod pos;
pub mod repo_io;
pub mod treesitter;

pub use error::{CollectError, Result};
pub use model::Repository;
pub use options::{Language, ParseOptions};
pub use parse::{parse, ParseOutcome};
