use clap::Parser;
use shtest_harness::build_filter;
use shtest_harness::run_suite;
use shtest_harness::CancelToken;
use shtest_harness::HarnessError;
use shtest_harness::Shard;
use shtest_harness::SuiteConfig;
use shtest_harness::SuiteOptions;
use shtest_harness::Substitutions;
use shtest_harness::DEFAULT_SUFFIX;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TIMEOUT: u64 = 60;

/// Discover `.test` files, expand `%token` placeholders in their `RUN:`
/// lines, execute them through the shell, and report pass/fail.
#[derive(Parser)]
#[command(name = "shtest", version, about = "Shell-based test suite runner")]
struct Cli {
  /// Directory tree scanned for test files
  #[arg(long, value_name = "DIR")]
  source_root: PathBuf,

  /// Working directory for spawned commands (default: source root)
  #[arg(long, value_name = "DIR")]
  exec_root: Option<PathBuf>,

  /// Test file suffix; repeatable
  #[arg(long = "suffix", value_name = "SUF", default_values_t = [DEFAULT_SUFFIX.to_string()])]
  suffixes: Vec<String>,

  /// Substitution as TOKEN=VALUE, e.g. `--sub %tool=/path/build/tool`; repeatable
  #[arg(long = "sub", value_name = "TOKEN=VALUE")]
  substitutions: Vec<String>,

  /// Glob or regex to filter tests by relative id
  #[arg(long)]
  filter: Option<String>,

  /// Run only a shard (zero-based): `i/n`
  #[arg(long)]
  shard: Option<String>,

  /// Per-test timeout in seconds; 0 disables the bound
  #[arg(long, default_value_t = DEFAULT_TIMEOUT)]
  timeout_secs: u64,

  /// Maximum number of tests to run concurrently
  #[arg(long, default_value_t = default_jobs())]
  jobs: usize,

  /// Emit the full report as JSON instead of the human summary
  #[arg(long)]
  json: bool,

  /// Allow running with zero discovered tests
  #[arg(long)]
  allow_empty: bool,

  /// Enable tracing output from the harness
  #[arg(long)]
  trace: bool,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.trace);

  let filter = match build_filter(cli.filter.as_deref()) {
    Ok(filter) => filter,
    Err(err) => return config_error(err),
  };
  let shard = match cli.shard.as_deref().map(str::parse::<Shard>).transpose() {
    Ok(shard) => shard,
    Err(err) => return config_error(err),
  };
  let substitutions = match parse_substitutions(&cli.substitutions) {
    Ok(subs) => subs,
    Err(err) => return config_error(err),
  };

  let config = match SuiteConfig::new(cli.source_root, cli.exec_root, cli.suffixes, substitutions)
  {
    Ok(config) => config,
    Err(err) => return config_error(err),
  };

  let options = SuiteOptions {
    filter,
    shard,
    timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
    jobs: cli.jobs,
    allow_empty: cli.allow_empty,
  };

  let cancel = CancelToken::new();
  let handler_token = cancel.clone();
  if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
    eprintln!("warning: could not install interrupt handler: {err}");
  }

  let report = match run_suite(&config, &options, &cancel) {
    Ok(report) => report,
    Err(err) => return config_error(err),
  };

  if cli.json {
    match serde_json::to_string_pretty(&report) {
      Ok(output) => println!("{output}"),
      Err(err) => return config_error(err),
    }
  } else {
    let stdout = std::io::stdout();
    if let Err(err) = report.render_human(&mut stdout.lock()) {
      return config_error(err);
    }
  }

  if report.success() {
    ExitCode::SUCCESS
  } else {
    ExitCode::from(1)
  }
}

fn parse_substitutions(raw: &[String]) -> Result<Substitutions, HarnessError> {
  let mut subs = Substitutions::new();
  for entry in raw {
    let Some((token, value)) = entry.split_once('=') else {
      return Err(HarnessError::Config(format!(
        "substitution `{entry}` must be TOKEN=VALUE"
      )));
    };

    let token = token.trim();
    if token.is_empty() {
      return Err(HarnessError::Config(format!(
        "substitution `{entry}` has an empty token"
      )));
    }

    subs.push(token, value);
  }
  Ok(subs)
}

fn config_error(err: impl std::fmt::Display) -> ExitCode {
  eprintln!("error: {err}");
  ExitCode::from(2)
}

fn init_tracing(enable: bool) {
  if !enable {
    return;
  }

  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
  let builder = fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr);
  if let Err(err) = builder.try_init() {
    eprintln!("failed to install tracing subscriber: {err}");
  }
}

fn default_jobs() -> usize {
  num_cpus::get().max(1)
}
