//! # Shtest
//!
//! A black-box conformance test runner for interactive line-oriented shells.
//!
//! Shtest spawns the shell under test inside a pseudo-terminal, feeds it one
//! command per test case, and classifies what comes back: the expected output
//! ([`Outcome::Success`]), the wrong output ([`Outcome::Failure`]), silence
//! ([`Outcome::Timeout`]), a dead process ([`Outcome::CrashedProcess`]), or
//! bytes that are not text ([`Outcome::UndecodableOutput`]). The shell being
//! buggy, hung, or crashing is never an error to the runner — every outcome
//! is a first-class result and the suite keeps going.
//!
//! ## Quick start
//!
//! ```no_run
//! use shtest::{Reporter, Runner, suite};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let suite = suite::load_suite("boletin1.json".as_ref())?;
//!     let runner = Runner::initialize(suite.setup)?;
//!     let mut cases = runner.build_cases(&suite.tests)?;
//!     let mut reporter = Reporter::new(std::io::stdout(), false);
//!     runner.run_selected(&mut cases, None, &mut reporter).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Suite files
//!
//! A suite is a JSON document with a `setup` object (shell, prompt, timeout,
//! one-time setup commands) and a `tests` list of `{cmd, out}` records. See
//! [`suite`] for the format and its defaults.
//!
//! ## Matching contract
//!
//! Both the prompt and each expected-output value are regular expressions.
//! The prompt string is compiled verbatim — a prompt containing regex
//! metacharacters must be escaped by the suite author. The expected-output
//! pattern is applied as a prefix match against the start of the captured
//! text; a test asserting exact output must anchor the end of its own
//! pattern. Note that pty line discipline translates `\n` to `\r\n` in
//! captured output.

pub mod case;
pub mod pty;
pub(crate) mod pty_reader;
pub mod report;
pub mod runner;
pub mod suite;

pub use case::{Outcome, TestCase};
pub use pty::{ExpectResult, PtySession};
pub use report::Reporter;
pub use runner::{Runner, parse_id_ranges};
pub use suite::{SetupSpec, SuiteConfig, SuiteFile, TestSpec, load_suite};
