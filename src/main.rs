use anyhow::Result;
use clap::Parser;
use shtest::{Reporter, Runner, load_suite, parse_id_ranges};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "shtest",
    about = "Run a JSON conformance suite against an interactive shell",
    after_help = "Example: shtest -i boletin1.json -t 1,3-5,7",
    version
)]
struct Args {
    /// JSON file containing the list of tests
    #[arg(short = 'i', long = "in-test-file")]
    test_file: PathBuf,

    /// Comma-separated test ids or inclusive ranges, e.g. "1,3-5,7"
    #[arg(short = 't', long = "testids")]
    testids: Option<String>,

    /// Print command, expected pattern and produced output for every test
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Diagnostics go to stderr so the report stream on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: Error: {err:#}", env!("CARGO_PKG_NAME"));
            ExitCode::FAILURE
        }
    }
}

/// Load, set up, select, run, report. Test failures are reported, not
/// signaled: only fatal errors produce a non-zero exit.
async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "shtest");

    let suite = load_suite(&args.test_file)?;
    let ids = args.testids.as_deref().map(parse_id_ranges).transpose()?;

    let runner = Runner::initialize(suite.setup)?;
    let mut cases = runner.build_cases(&suite.tests)?;

    let mut reporter = Reporter::new(std::io::stdout(), args.debug);
    runner
        .run_selected(&mut cases, ids.as_deref(), &mut reporter)
        .await
}
