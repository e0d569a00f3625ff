//! Per-test outcomes, aggregation, and report rendering.

use serde::Deserialize;
use serde::Serialize;
use std::io;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
  Pass,
  Fail,
  ExpectedFail,
  /// An expected-failure test whose final directive exited 0. A regression
  /// signal: the test must be flagged, not silently accepted.
  UnexpectedPass,
  /// The harness could not run the test (unresolved token, spawn failure).
  Error,
  Timeout,
  /// Cancelled before (or while) running.
  Skipped,
}

impl TestOutcome {
  /// Outcomes that make the overall run fail. `Skipped` counts: a cancelled
  /// run is an incomplete run.
  pub fn is_unexpected(self) -> bool {
    !matches!(self, TestOutcome::Pass | TestOutcome::ExpectedFail)
  }

  pub fn label(self) -> &'static str {
    match self {
      TestOutcome::Pass => "PASS",
      TestOutcome::Fail => "FAIL",
      TestOutcome::ExpectedFail => "XFAIL",
      TestOutcome::UnexpectedPass => "XPASS",
      TestOutcome::Error => "ERROR",
      TestOutcome::Timeout => "TIMEOUT",
      TestOutcome::Skipped => "SKIPPED",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
  pub id: String,
  pub path: String,
  pub outcome: TestOutcome,
  /// Exit code of the last executed directive; `None` when nothing ran or
  /// the child died to a signal.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exit_code: Option<i32>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub stdout: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub stderr: String,
  pub duration_ms: u128,
  /// Human-readable cause for non-pass outcomes (failing step, unresolved
  /// token, timeout).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
  pub pass: usize,
  pub fail: usize,
  pub expected_fail: usize,
  pub unexpected_pass: usize,
  pub error: usize,
  pub timeout: usize,
  pub skipped: usize,
}

impl OutcomeCounts {
  fn increment(&mut self, outcome: TestOutcome) {
    match outcome {
      TestOutcome::Pass => self.pass += 1,
      TestOutcome::Fail => self.fail += 1,
      TestOutcome::ExpectedFail => self.expected_fail += 1,
      TestOutcome::UnexpectedPass => self.unexpected_pass += 1,
      TestOutcome::Error => self.error += 1,
      TestOutcome::Timeout => self.timeout += 1,
      TestOutcome::Skipped => self.skipped += 1,
    }
  }

  pub fn unexpected(&self) -> usize {
    self.fail + self.unexpected_pass + self.error + self.timeout + self.skipped
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
  pub total: usize,
  pub outcomes: OutcomeCounts,
}

impl Summary {
  pub fn from_results(results: &[TestResult]) -> Summary {
    let mut summary = Summary {
      total: results.len(),
      ..Summary::default()
    };
    for result in results {
      summary.outcomes.increment(result.outcome);
    }
    summary
  }

  pub fn success(&self) -> bool {
    self.outcomes.unexpected() == 0
  }
}

/// The aggregate of one run: results sorted by test id (discovery order), so
/// serialization and rendering are deterministic regardless of worker
/// scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
  pub summary: Summary,
  pub results: Vec<TestResult>,
}

impl SuiteReport {
  pub fn success(&self) -> bool {
    self.summary.success()
  }

  /// Human-readable report: one line per non-pass result, a detail section
  /// per unexpected result with captured streams, then the count summary.
  pub fn render_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
    for result in &self.results {
      if result.outcome == TestOutcome::Pass {
        continue;
      }
      writeln!(
        writer,
        "{} {} ({}ms)",
        result.outcome.label(),
        result.id,
        result.duration_ms
      )?;
    }

    for result in &self.results {
      if !result.outcome.is_unexpected() {
        continue;
      }

      writeln!(writer, "{}", "-".repeat(60))?;
      writeln!(writer, "{}: {}", result.outcome.label(), result.id)?;
      writeln!(writer, "  file: {}", result.path)?;
      if let Some(detail) = &result.detail {
        writeln!(writer, "  {detail}")?;
      }
      if let Some(code) = result.exit_code {
        writeln!(writer, "  exit code: {code}")?;
      }
      if !result.stdout.is_empty() {
        writeln!(writer, "  stdout:")?;
        for line in result.stdout.lines() {
          writeln!(writer, "    {line}")?;
        }
      }
      if !result.stderr.is_empty() {
        writeln!(writer, "  stderr:")?;
        for line in result.stderr.lines() {
          writeln!(writer, "    {line}")?;
        }
      }
    }

    let counts = &self.summary.outcomes;
    writeln!(
      writer,
      "Ran {} test(s): {} passed, {} failed, {} expected failures, \
       {} unexpectedly passed, {} errors, {} timed out, {} skipped",
      self.summary.total,
      counts.pass,
      counts.fail,
      counts.expected_fail,
      counts.unexpected_pass,
      counts.error,
      counts.timeout,
      counts.skipped
    )?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(id: &str, outcome: TestOutcome) -> TestResult {
    TestResult {
      id: id.to_string(),
      path: format!("/suite/{id}"),
      outcome,
      exit_code: Some(0),
      stdout: String::new(),
      stderr: String::new(),
      duration_ms: 1,
      detail: None,
    }
  }

  #[test]
  fn pass_and_expected_fail_are_successes() {
    let results = vec![
      result("a.test", TestOutcome::Pass),
      result("b.test", TestOutcome::ExpectedFail),
    ];
    let summary = Summary::from_results(&results);
    assert!(summary.success());
    assert_eq!(summary.outcomes.pass, 1);
    assert_eq!(summary.outcomes.expected_fail, 1);
  }

  #[test]
  fn any_unexpected_outcome_fails_the_run() {
    for outcome in [
      TestOutcome::Fail,
      TestOutcome::UnexpectedPass,
      TestOutcome::Error,
      TestOutcome::Timeout,
      TestOutcome::Skipped,
    ] {
      let results = vec![result("a.test", TestOutcome::Pass), result("b.test", outcome)];
      let summary = Summary::from_results(&results);
      assert!(!summary.success(), "{outcome:?} should fail the run");
    }
  }

  #[test]
  fn human_report_names_every_failing_test() {
    let mut failing = result("bad.test", TestOutcome::Fail);
    failing.exit_code = Some(2);
    failing.stderr = "unknown flag\n".to_string();
    failing.detail = Some("step 1 exited with code 2".to_string());

    let report = SuiteReport {
      summary: Summary::from_results(std::slice::from_ref(&failing)),
      results: vec![failing],
    };

    let mut rendered = Vec::new();
    report.render_human(&mut rendered).unwrap();
    let text = String::from_utf8(rendered).unwrap();

    assert!(text.contains("FAIL bad.test"));
    assert!(text.contains("exit code: 2"));
    assert!(text.contains("unknown flag"));
    assert!(text.contains("step 1 exited with code 2"));
  }

  #[test]
  fn json_round_trips_and_is_stable() {
    let report = SuiteReport {
      summary: Summary::from_results(&[result("a.test", TestOutcome::Pass)]),
      results: vec![result("a.test", TestOutcome::Pass)],
    };

    let first = serde_json::to_string_pretty(&report).unwrap();
    let second = serde_json::to_string_pretty(&report).unwrap();
    assert_eq!(first, second);

    let parsed: SuiteReport = serde_json::from_str(&first).unwrap();
    assert_eq!(parsed.results[0].outcome, TestOutcome::Pass);
  }
}
