//! Shell-based test execution engine.
//!
//! Discovers declarative test files under a source tree, expands `%token`
//! placeholders in their embedded `RUN:` command lines into concrete paths,
//! executes the expanded commands through `sh`, and aggregates per-test
//! outcomes into a deterministic report.
//!
//! Configuration assembly (locating build output directories, choosing
//! substitutions) is the caller's concern; the engine only consumes a frozen
//! [`SuiteConfig`].

use std::io;
use thiserror::Error;

pub mod cancel;
pub mod config;
pub mod directives;
pub mod discover;
pub mod exec;
pub mod report;
pub mod runner;
pub mod substitute;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error("configuration error: {0}")]
  Config(String),
  #[error("invalid filter '{0}'")]
  InvalidFilter(String),
  #[error("invalid shard specification '{0}'")]
  InvalidShard(String),
}

pub use cancel::CancelToken;
pub use config::SuiteConfig;
pub use config::DEFAULT_SUFFIX;
pub use discover::build_filter;
pub use discover::discover_tests;
pub use discover::Filter;
pub use discover::Shard;
pub use discover::TestCase;
pub use report::OutcomeCounts;
pub use report::SuiteReport;
pub use report::Summary;
pub use report::TestOutcome;
pub use report::TestResult;
pub use runner::run_suite;
pub use runner::SuiteOptions;
pub use substitute::Substitutions;
