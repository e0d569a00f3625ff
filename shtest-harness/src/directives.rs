//! Extraction of run-directives and expectation markers from test file text.
//!
//! Markers are matched anywhere in a line, so any host language's comment
//! prefix works (`// RUN:`, `# RUN:`, `; RUN:`). The text after `RUN:` is a
//! shell command template; a trailing backslash joins it with the next
//! `RUN:` line's text into a single command.

const RUN_MARKER: &str = "RUN:";
const XFAIL_MARKER: &str = "XFAIL:";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedDirectives {
  /// Command templates in source order.
  pub run_lines: Vec<String>,
  /// Whether the file carries an `XFAIL:` marker.
  pub expected_failure: bool,
}

pub fn parse_directives(content: &str) -> ParsedDirectives {
  let mut parsed = ParsedDirectives::default();
  let mut pending: Option<String> = None;

  for line in content.lines() {
    if let Some(rest) = marker_suffix(line, RUN_MARKER) {
      let (fragment, continued) = match rest.strip_suffix('\\') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (rest, false),
      };

      let command = match pending.take() {
        Some(prefix) if fragment.is_empty() => prefix,
        Some(prefix) => format!("{prefix} {fragment}"),
        None => fragment.to_string(),
      };

      if continued {
        pending = Some(command);
      } else if !command.is_empty() {
        parsed.run_lines.push(command);
      }
    } else if marker_suffix(line, XFAIL_MARKER).is_some() {
      parsed.expected_failure = true;
    }
  }

  // A dangling continuation still counts as a directive.
  if let Some(tail) = pending {
    if !tail.is_empty() {
      parsed.run_lines.push(tail);
    }
  }

  parsed
}

fn marker_suffix<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
  line
    .find(marker)
    .map(|idx| line[idx + marker.len()..].trim())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_run_lines_in_source_order() {
    let parsed = parse_directives(
      "// RUN: %tool --first\nsome body text\n// RUN: %tool --second\n",
    );
    assert_eq!(parsed.run_lines, vec!["%tool --first", "%tool --second"]);
    assert!(!parsed.expected_failure);
  }

  #[test]
  fn marker_works_behind_any_comment_prefix() {
    let parsed = parse_directives("# RUN: a\n; RUN: b\n-- RUN: c\n");
    assert_eq!(parsed.run_lines, vec!["a", "b", "c"]);
  }

  #[test]
  fn backslash_joins_continuation_lines() {
    let parsed = parse_directives("// RUN: %tool --long \\\n// RUN: --flags here\n");
    assert_eq!(parsed.run_lines, vec!["%tool --long --flags here"]);
  }

  #[test]
  fn dangling_continuation_is_kept() {
    let parsed = parse_directives("// RUN: %tool --half \\\n");
    assert_eq!(parsed.run_lines, vec!["%tool --half"]);
  }

  #[test]
  fn xfail_marker_sets_expectation() {
    let parsed = parse_directives("// XFAIL: *\n// RUN: %tool\n");
    assert!(parsed.expected_failure);
    assert_eq!(parsed.run_lines, vec!["%tool"]);
  }

  #[test]
  fn empty_run_lines_are_dropped() {
    let parsed = parse_directives("// RUN:\n// RUN: real\n");
    assert_eq!(parsed.run_lines, vec!["real"]);
  }

  #[test]
  fn file_without_markers_yields_nothing() {
    let parsed = parse_directives("int main() { return 0; }\n");
    assert!(parsed.run_lines.is_empty());
    assert!(!parsed.expected_failure);
  }
}
