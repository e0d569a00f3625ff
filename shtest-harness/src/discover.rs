use crate::config::SuiteConfig;
use crate::directives::parse_directives;
use crate::HarnessError;
use crate::Result;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;
use walkdir::WalkDir;

/// One discovered test file, parsed and frozen. Consumed exactly once by the
/// runner.
#[derive(Debug, Clone)]
pub struct TestCase {
  /// Path relative to the source root, `/`-separated. Doubles as the stable
  /// sort key for report ordering.
  pub id: String,
  pub path: PathBuf,
  /// `RUN:` command templates in source order.
  pub directives: Vec<String>,
  pub expected_failure: bool,
}

#[derive(Debug, Clone)]
pub enum Filter {
  All,
  Glob(GlobSet),
  Regex(Regex),
}

pub fn build_filter(pattern: Option<&str>) -> Result<Filter> {
  match pattern {
    None => Ok(Filter::All),
    Some(raw) => {
      if let Ok(glob) = Glob::new(raw) {
        let mut builder = GlobSetBuilder::new();
        builder.add(glob);
        let set = builder
          .build()
          .map_err(|err| HarnessError::InvalidFilter(err.to_string()))?;
        return Ok(Filter::Glob(set));
      }

      let regex = Regex::new(raw).map_err(|err| HarnessError::InvalidFilter(err.to_string()))?;
      Ok(Filter::Regex(regex))
    }
  }
}

impl Filter {
  pub fn matches(&self, id: &str) -> bool {
    match self {
      Filter::All => true,
      Filter::Glob(set) => set.is_match(id),
      Filter::Regex(re) => re.is_match(id),
    }
  }
}

/// Deterministic `index/total` sharding over the sorted case list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
  pub index: usize,
  pub total: usize,
}

impl Shard {
  pub fn includes(&self, position: usize) -> bool {
    position % self.total == self.index
  }
}

impl FromStr for Shard {
  type Err = HarnessError;

  fn from_str(raw: &str) -> Result<Shard> {
    let Some((index_raw, total_raw)) = raw.split_once('/') else {
      return Err(HarnessError::InvalidShard(raw.to_string()));
    };

    let index: usize = index_raw
      .parse()
      .map_err(|_| HarnessError::InvalidShard(raw.to_string()))?;
    let total: usize = total_raw
      .parse()
      .map_err(|_| HarnessError::InvalidShard(raw.to_string()))?;

    if total == 0 || index >= total {
      return Err(HarnessError::InvalidShard(raw.to_string()));
    }

    Ok(Shard { index, total })
  }
}

/// Walk the source root and return every qualifying test file, parsed and
/// sorted by relative id so repeated runs on an unmodified tree produce the
/// same ordering.
///
/// A file qualifies iff its name ends with one of the configured suffixes
/// (exact, case-sensitive). Directories are recursed into unconditionally.
/// A missing or unreadable root fails fast with a configuration error, never
/// a silently empty result; so does a qualifying file with zero `RUN:`
/// directives, since the suite itself is misconfigured.
pub fn discover_tests(config: &SuiteConfig, filter: &Filter) -> Result<Vec<TestCase>> {
  let root = &config.source_root;
  if !root.is_dir() {
    return Err(HarnessError::Config(format!(
      "source root {} does not exist or is not a directory",
      root.display()
    )));
  }

  let mut cases = Vec::new();
  for entry in WalkDir::new(root) {
    let entry = entry
      .map_err(|err| HarnessError::Config(format!("walk {}: {err}", root.display())))?;
    if !entry.file_type().is_file() {
      continue;
    }

    let path = entry.into_path();
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
      continue;
    };
    if !config.suffixes.iter().any(|suffix| name.ends_with(suffix)) {
      continue;
    }

    let id = relative_id(root, &path);
    if !filter.matches(&id) {
      continue;
    }

    let content = fs::read_to_string(&path)?;
    let parsed = parse_directives(&content);
    if parsed.run_lines.is_empty() {
      return Err(HarnessError::Config(format!(
        "{id}: test file contains no RUN: directives"
      )));
    }

    cases.push(TestCase {
      id,
      path,
      directives: parsed.run_lines,
      expected_failure: parsed.expected_failure,
    });
  }

  cases.sort_by(|a, b| a.id.cmp(&b.id));
  debug!(root = %root.display(), count = cases.len(), "discovered test files");
  Ok(cases)
}

/// Join the path components with `/` so ids are platform-independent without
/// touching characters inside the file names themselves (a Unix file name may
/// legitimately contain a backslash).
fn relative_id(root: &Path, path: &Path) -> String {
  let relative = path.strip_prefix(root).unwrap_or(path);
  let mut id = String::new();
  for component in relative.components() {
    if !id.is_empty() {
      id.push('/');
    }
    id.push_str(&component.as_os_str().to_string_lossy());
  }
  id
}
