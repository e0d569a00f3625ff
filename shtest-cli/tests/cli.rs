use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Child;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;
use tempfile::tempdir;

fn wait_with_output_timeout(mut child: Child, timeout: Duration) -> Option<Output> {
  let mut stdout = child.stdout.take().expect("child stdout");
  let mut stderr = child.stderr.take().expect("child stderr");
  let deadline = Instant::now() + timeout;
  loop {
    match child.try_wait().expect("try_wait") {
      Some(status) => {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let _ = stdout.read_to_end(&mut out);
        let _ = stderr.read_to_end(&mut err);
        return Some(Output {
          status,
          stdout: out,
          stderr: err,
        });
      }
      None => {
        if Instant::now() >= deadline {
          let _ = child.kill();
          let _ = child.wait();
          return None;
        }
        std::thread::sleep(Duration::from_millis(10));
      }
    }
  }
}

fn run_shtest(args: &[&str]) -> Output {
  let child = Command::new(env!("CARGO_BIN_EXE_shtest"))
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .expect("spawn shtest");

  wait_with_output_timeout(child, Duration::from_secs(30)).expect("shtest timed out")
}

fn write_suite(root: &Path, entries: &[(&str, &str)]) {
  for (name, content) in entries {
    fs::write(root.join(name), content).expect("write test file");
  }
}

#[test]
fn green_suite_exits_zero() {
  let dir = tempdir().unwrap();
  write_suite(
    dir.path(),
    &[("pass.test", "// RUN: %tool hello\n")],
  );

  let output = run_shtest(&[
    "--source-root",
    dir.path().to_str().unwrap(),
    "--sub",
    "%tool=/bin/echo",
  ]);

  assert_eq!(output.status.code(), Some(0));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("1 passed"), "summary missing: {stdout}");
}

#[test]
fn failing_suite_exits_one_and_names_the_test() {
  let dir = tempdir().unwrap();
  write_suite(
    dir.path(),
    &[
      ("bad.test", "// RUN: exit 2\n"),
      ("good.test", "// RUN: true\n"),
    ],
  );

  let output = run_shtest(&["--source-root", dir.path().to_str().unwrap()]);

  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("FAIL bad.test"), "report missing: {stdout}");
  assert!(stdout.contains("exit code: 2"), "report missing: {stdout}");
}

#[test]
fn missing_source_root_exits_two() {
  let output = run_shtest(&["--source-root", "/no/such/suite"]);

  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("error:"), "stderr missing: {stderr}");
}

#[test]
fn json_report_is_machine_readable() {
  let dir = tempdir().unwrap();
  write_suite(dir.path(), &[("pass.test", "// RUN: true\n")]);

  let output = run_shtest(&[
    "--source-root",
    dir.path().to_str().unwrap(),
    "--json",
  ]);

  assert_eq!(output.status.code(), Some(0));
  let parsed: serde_json::Value =
    serde_json::from_slice(&output.stdout).expect("valid JSON report");
  assert_eq!(parsed["summary"]["total"], 1);
  assert_eq!(parsed["results"][0]["outcome"], "pass");
}

#[test]
fn xfail_suite_is_green_until_it_starts_passing() {
  let dir = tempdir().unwrap();
  write_suite(
    dir.path(),
    &[("fails.test", "// XFAIL: *\n// RUN: exit 1\n")],
  );

  let output = run_shtest(&["--source-root", dir.path().to_str().unwrap()]);
  assert_eq!(output.status.code(), Some(0));

  write_suite(
    dir.path(),
    &[("fails.test", "// XFAIL: *\n// RUN: true\n")],
  );

  let output = run_shtest(&["--source-root", dir.path().to_str().unwrap()]);
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("XPASS fails.test"), "report missing: {stdout}");
}

#[test]
fn filter_narrows_the_run() {
  let dir = tempdir().unwrap();
  write_suite(
    dir.path(),
    &[
      ("keep.test", "// RUN: true\n"),
      ("drop.test", "// RUN: exit 1\n"),
    ],
  );

  let output = run_shtest(&[
    "--source-root",
    dir.path().to_str().unwrap(),
    "--filter",
    "keep*",
  ]);

  assert_eq!(output.status.code(), Some(0));
}
