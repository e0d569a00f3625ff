//! Ordered token → replacement registry with longest-token-first resolution.

/// An ordered mapping from placeholder token (e.g. `%paracl`) to replacement
/// text (typically an absolute path). Built once during configuration and
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
  entries: Vec<(String, String)>,
}

impl Substitutions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a token. Entries are kept sorted by descending token length so
  /// a token that is a prefix of another (`%pcl` vs `%pcllib`) never shadows
  /// the longer, more specific one.
  pub fn push(&mut self, token: impl Into<String>, replacement: impl Into<String>) {
    self.entries.push((token.into(), replacement.into()));
    self
      .entries
      .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(token, replacement)| (token.as_str(), replacement.as_str()))
  }

  /// Expand every registered token in `template`. Total: unknown tokens are
  /// left verbatim for the executor to flag via [`find_unresolved`].
  ///
  /// The scan is a single left-to-right pass over the template; replacement
  /// values are never re-scanned, so nested or recursive expansion cannot
  /// occur and resolution is bounded by the template length.
  pub fn resolve(&self, template: &str) -> String {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
      for (token, replacement) in &self.entries {
        if !token.is_empty() && rest.starts_with(token.as_str()) {
          expanded.push_str(replacement);
          rest = &rest[token.len()..];
          continue 'scan;
        }
      }

      let Some(ch) = rest.chars().next() else {
        break;
      };
      expanded.push(ch);
      rest = &rest[ch.len_utf8()..];
    }

    expanded
  }
}

/// Returns the first `%token`-shaped residue left in an expanded command, or
/// `None` if the command is fully resolved.
///
/// Only `%` followed by an ASCII identifier counts, so a bare `%` in shell
/// text (`50%`, `kill %1`) is not flagged.
pub fn find_unresolved(expanded: &str) -> Option<&str> {
  let mut search_from = 0;
  while let Some(offset) = expanded[search_from..].find('%') {
    let start = search_from + offset;
    let tail = &expanded[start + 1..];

    let leading_ok = tail
      .chars()
      .next()
      .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if leading_ok {
      let len = tail
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count();
      return Some(&expanded[start..start + 1 + len]);
    }

    search_from = start + 1;
  }

  None
}
