//! Orchestration: discovery and parsing up front, parallel execution on a
//! bounded worker pool, deterministic aggregation.

use crate::cancel::CancelToken;
use crate::config::SuiteConfig;
use crate::discover::discover_tests;
use crate::discover::Filter;
use crate::discover::Shard;
use crate::discover::TestCase;
use crate::exec::run_shell_command;
use crate::exec::CapturedOutput;
use crate::exec::WaitOutcome;
use crate::report::SuiteReport;
use crate::report::Summary;
use crate::report::TestOutcome;
use crate::report::TestResult;
use crate::substitute::find_unresolved;
use crate::HarnessError;
use crate::Result;
use rayon::prelude::*;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SuiteOptions {
  pub filter: Filter,
  pub shard: Option<Shard>,
  /// Per-test timeout; `None` disables the bound.
  pub timeout: Option<Duration>,
  /// Worker pool size; 0 lets rayon pick one thread per logical CPU.
  pub jobs: usize,
  /// Zero discovered tests is a configuration error unless set.
  pub allow_empty: bool,
}

impl Default for SuiteOptions {
  fn default() -> Self {
    Self {
      filter: Filter::All,
      shard: None,
      timeout: Some(Duration::from_secs(60)),
      jobs: 0,
      allow_empty: false,
    }
  }
}

/// Run the whole suite: discover and parse every test file (configuration
/// errors abort here, before anything executes), execute the cases on a
/// bounded pool, then re-sort results into discovery order and summarize.
pub fn run_suite(
  config: &SuiteConfig,
  options: &SuiteOptions,
  cancel: &CancelToken,
) -> Result<SuiteReport> {
  let mut cases = discover_tests(config, &options.filter)?;

  if let Some(shard) = options.shard {
    cases = cases
      .into_iter()
      .enumerate()
      .filter(|(position, _)| shard.includes(*position))
      .map(|(_, case)| case)
      .collect();
  }

  if cases.is_empty() && !options.allow_empty {
    return Err(HarnessError::Config(format!(
      "no test files found under {}",
      config.source_root.display()
    )));
  }

  let pool = rayon::ThreadPoolBuilder::new()
    .num_threads(options.jobs)
    .build()
    .map_err(|err| HarnessError::Config(format!("build worker pool: {err}")))?;

  let mut results: Vec<TestResult> = pool.install(|| {
    cases
      .par_iter()
      .map(|case| run_test_case(case, config, options.timeout, cancel))
      .collect()
  });

  // Workers finish in scheduling order; re-sort into the discovery order so
  // the report is stable across runs.
  results.sort_by(|a, b| a.id.cmp(&b.id));

  if cancel.is_cancelled() {
    warn!("run cancelled; report covers partial results");
  }

  let summary = Summary::from_results(&results);
  Ok(SuiteReport { summary, results })
}

/// Execute one test case: expand and run each directive in order,
/// short-circuiting on the first failing step, then map the terminal state
/// through the case's expectation. Every error condition is converted into a
/// `TestOutcome` here; nothing escapes to abort the run.
pub fn run_test_case(
  case: &TestCase,
  config: &SuiteConfig,
  timeout: Option<Duration>,
  cancel: &CancelToken,
) -> TestResult {
  let started = Instant::now();

  if cancel.is_cancelled() {
    return finish(
      case,
      started,
      TestOutcome::Skipped,
      None,
      Some("cancelled before start".to_string()),
    );
  }

  let steps = case.directives.len();
  let mut last: Option<CapturedOutput> = None;

  for (index, template) in case.directives.iter().enumerate() {
    let step = index + 1;
    let command = config.substitutions.resolve(template);

    if let Some(token) = find_unresolved(&command) {
      return finish(
        case,
        started,
        TestOutcome::Error,
        None,
        Some(format!(
          "unresolved substitution token `{token}` in step {step}/{steps}"
        )),
      );
    }

    debug!(id = %case.id, step, %command, "running directive");

    match run_shell_command(&command, &config.exec_root, timeout, cancel) {
      Ok(WaitOutcome::Completed(output)) => {
        if output.exit_code != Some(0) {
          let outcome = if case.expected_failure {
            TestOutcome::ExpectedFail
          } else {
            TestOutcome::Fail
          };
          let detail = match output.exit_code {
            Some(code) => format!("step {step}/{steps} exited with code {code}"),
            None => format!("step {step}/{steps} was killed by a signal"),
          };
          return finish(case, started, outcome, Some(output), Some(detail));
        }
        last = Some(output);
      }
      Ok(WaitOutcome::TimedOut(output)) => {
        let detail = match timeout {
          Some(timeout) => format!(
            "step {step}/{steps} timed out after {}ms",
            timeout.as_millis()
          ),
          None => format!("step {step}/{steps} timed out"),
        };
        return finish(case, started, TestOutcome::Timeout, Some(output), Some(detail));
      }
      Ok(WaitOutcome::Cancelled) => {
        return finish(
          case,
          started,
          TestOutcome::Skipped,
          None,
          Some(format!("cancelled during step {step}/{steps}")),
        );
      }
      Err(err) => {
        return finish(
          case,
          started,
          TestOutcome::Error,
          None,
          Some(format!("step {step}/{steps}: failed to spawn shell: {err}")),
        );
      }
    }
  }

  // Every directive exited 0.
  if case.expected_failure {
    return finish(
      case,
      started,
      TestOutcome::UnexpectedPass,
      last,
      Some("expected-failure test passed".to_string()),
    );
  }

  finish(case, started, TestOutcome::Pass, last, None)
}

fn finish(
  case: &TestCase,
  started: Instant,
  outcome: TestOutcome,
  output: Option<CapturedOutput>,
  detail: Option<String>,
) -> TestResult {
  let (exit_code, stdout, stderr) = match output {
    Some(output) => (output.exit_code, output.stdout, output.stderr),
    None => (None, String::new(), String::new()),
  };

  TestResult {
    id: case.id.clone(),
    path: case.path.display().to_string(),
    outcome,
    exit_code,
    stdout,
    stderr,
    duration_ms: started.elapsed().as_millis(),
    detail,
  }
}
