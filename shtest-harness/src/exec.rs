//! Child process plumbing: spawn through the shell, bounded wait, forced reap.

use crate::cancel::CancelToken;
use std::io;
use std::io::Read;
use std::path::Path;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const KILL_GRACE: Duration = Duration::from_millis(200);

/// What the engine observes of a finished child: exit code (absent when the
/// child died to a signal), captured streams, nothing else.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
  pub exit_code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

#[derive(Debug)]
pub enum WaitOutcome {
  Completed(CapturedOutput),
  /// Deadline passed; the child was killed and reaped. Streams hold whatever
  /// the child wrote before dying.
  TimedOut(CapturedOutput),
  Cancelled,
}

/// Run one expanded command line as `sh -c <command>` with the working
/// directory set to `cwd`, waiting at most `timeout` (`None` = unbounded).
///
/// The wait polls `try_wait` so it can observe both the deadline and the
/// cancellation token; on either, the child is killed and reaped so no
/// zombie survives the run. Stream pipes are drained on dedicated reader
/// threads while the poll runs, so a child writing more than the OS pipe
/// buffer can still make progress and exit.
pub fn run_shell_command(
  command: &str,
  cwd: &Path,
  timeout: Option<Duration>,
  cancel: &CancelToken,
) -> io::Result<WaitOutcome> {
  let child = Command::new("sh")
    .arg("-c")
    .arg(command)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()?;

  wait_bounded(child, timeout, cancel)
}

fn wait_bounded(
  mut child: Child,
  timeout: Option<Duration>,
  cancel: &CancelToken,
) -> io::Result<WaitOutcome> {
  let stdout = spawn_drain(child.stdout.take());
  let stderr = spawn_drain(child.stderr.take());
  let deadline = timeout.map(|t| Instant::now() + t);

  loop {
    match child.try_wait()? {
      Some(status) => {
        return Ok(WaitOutcome::Completed(CapturedOutput {
          exit_code: status.code(),
          stdout: join_drain(stdout),
          stderr: join_drain(stderr),
        }));
      }
      None => {
        if cancel.is_cancelled() {
          kill_and_reap(&mut child);
          // Killing the child closes its pipe ends; the readers finish.
          join_drain(stdout);
          join_drain(stderr);
          return Ok(WaitOutcome::Cancelled);
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
          let exit_code = kill_and_reap(&mut child);
          return Ok(WaitOutcome::TimedOut(CapturedOutput {
            exit_code,
            stdout: join_drain(stdout),
            stderr: join_drain(stderr),
          }));
        }

        std::thread::sleep(POLL_INTERVAL);
      }
    }
  }
}

/// Drain a child stream to completion on its own thread, so the child never
/// blocks on a full pipe buffer while the poll loop waits for it to exit.
fn spawn_drain<R: Read + Send + 'static>(
  stream: Option<R>,
) -> Option<std::thread::JoinHandle<Vec<u8>>> {
  stream.map(|mut stream| {
    std::thread::spawn(move || {
      let mut buffer = Vec::new();
      let _ = stream.read_to_end(&mut buffer);
      buffer
    })
  })
}

fn join_drain(handle: Option<std::thread::JoinHandle<Vec<u8>>>) -> String {
  handle
    .and_then(|handle| handle.join().ok())
    .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
    .unwrap_or_default()
}

fn kill_and_reap(child: &mut Child) -> Option<i32> {
  if child.try_wait().ok().flatten().is_none() {
    let _ = child.kill();
  }

  let deadline = Instant::now() + KILL_GRACE;
  loop {
    match child.try_wait() {
      Ok(Some(status)) => return status.code(),
      Ok(None) => {
        if Instant::now() >= deadline {
          return None;
        }
        std::thread::sleep(POLL_INTERVAL);
      }
      Err(_) => return None,
    }
  }
}
