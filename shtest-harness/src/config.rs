use crate::substitute::Substitutions;
use crate::HarnessError;
use crate::Result;
use std::path::PathBuf;

pub const DEFAULT_SUFFIX: &str = ".test";

/// Immutable, process-wide suite configuration.
///
/// Assembled once before the engine runs and shared read-only across all
/// workers; every path in `substitutions` is supplied by the caller (computed
/// against `exec_root` or an explicit library path), never inferred from a
/// test file's own location.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
  /// Directory tree scanned for test files.
  pub source_root: PathBuf,
  /// Directory containing build artifacts; also the working directory for
  /// every spawned command.
  pub exec_root: PathBuf,
  /// File name suffixes that qualify a file as a test (exact, case-sensitive
  /// match; always carry a leading dot).
  pub suffixes: Vec<String>,
  pub substitutions: Substitutions,
}

impl SuiteConfig {
  /// Validate and freeze a configuration. `exec_root` defaults to the source
  /// root; both roots must exist, and are canonicalized to absolute paths so
  /// results do not depend on the invoking process's working directory.
  pub fn new(
    source_root: PathBuf,
    exec_root: Option<PathBuf>,
    suffixes: Vec<String>,
    substitutions: Substitutions,
  ) -> Result<Self> {
    if !source_root.is_dir() {
      return Err(HarnessError::Config(format!(
        "source root {} does not exist or is not a directory",
        source_root.display()
      )));
    }
    let source_root = source_root.canonicalize()?;

    let exec_root = match exec_root {
      Some(path) => {
        if !path.is_dir() {
          return Err(HarnessError::Config(format!(
            "exec root {} does not exist or is not a directory",
            path.display()
          )));
        }
        path.canonicalize()?
      }
      None => source_root.clone(),
    };

    let suffixes = normalize_suffixes(&suffixes);
    if suffixes.is_empty() {
      return Err(HarnessError::Config(
        "at least one test file suffix is required".to_string(),
      ));
    }

    Ok(Self {
      source_root,
      exec_root,
      suffixes,
      substitutions,
    })
  }
}

fn normalize_suffixes(raw: &[String]) -> Vec<String> {
  let mut normalized = Vec::new();
  for suffix in raw {
    let trimmed = suffix.trim().trim_start_matches('.');
    if trimmed.is_empty() {
      continue;
    }

    let needle = format!(".{trimmed}");
    if !normalized.contains(&needle) {
      normalized.push(needle);
    }
  }
  normalized
}
