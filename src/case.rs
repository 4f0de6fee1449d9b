//! One test scenario and the state machine that classifies its result.

use crate::pty::{ExpectResult, PtySession};
use crate::suite::{SuiteConfig, TestSpec};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

/// Terminal classification of a test case.
///
/// Every way a shell under test can respond — correctly, incorrectly, by
/// hanging, by dying, or by emitting garbage — maps to exactly one variant.
/// These are results, not errors: the runner keeps going regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Output matched the expected pattern.
    Success,
    /// Output decoded but did not match.
    Failure,
    /// The prompt never reappeared within the timeout; the shell stayed alive.
    Timeout,
    /// The shell exited non-cleanly (fatal signal or non-zero status).
    CrashedProcess,
    /// The captured bytes are not valid UTF-8.
    UndecodableOutput,
    /// Initial sentinel; never a reportable state.
    Unknown,
}

/// A single scenario: send one command, wait for the prompt, classify.
///
/// A case runs at most once. Re-running is undefined; callers wanting a rerun
/// construct a fresh case from the same spec.
pub struct TestCase {
    id: usize,
    command: String,
    /// Original pattern text, kept for reporting.
    expected_src: String,
    /// The pattern compiled with a `\A` anchor: matching is a prefix match
    /// against the start of the captured text.
    expected: regex::Regex,
    config: Arc<SuiteConfig>,
    status: Outcome,
    output: String,
}

impl TestCase {
    /// Build a case from its spec. `id` is the 1-based position in the suite.
    ///
    /// The expected pattern is compiled here so that a malformed pattern
    /// aborts the run before any shell is spawned.
    pub fn new(id: usize, spec: &TestSpec, config: Arc<SuiteConfig>) -> Result<Self> {
        let expected = regex::Regex::new(&format!(r"\A(?:{})", spec.out))
            .with_context(|| format!("Test {id:2}: invalid output pattern '{}'", spec.out))?;
        Ok(TestCase {
            id,
            command: spec.cmd.clone(),
            expected_src: spec.out.clone(),
            expected,
            config,
            status: Outcome::Unknown,
            output: String::new(),
        })
    }

    /// Drive one shell through the prompt protocol and record the outcome.
    ///
    /// Spawns the shell with echo off, waits for the initial prompt, sends
    /// the command, waits for the prompt again, and classifies the three-way
    /// result. The session is force-closed on every path before returning.
    /// Only a spawn failure is an error — it is fatal to the whole run.
    pub async fn run(&mut self) -> Result<Outcome> {
        debug_assert!(
            matches!(self.status, Outcome::Unknown),
            "TestCase::run called twice"
        );

        let mut session = PtySession::spawn(&self.config.shell, &[], false, self.config.timeout)
            .with_context(|| {
                format!(
                    "Test {:2}: error executing shell '{}'",
                    self.id, self.config.shell
                )
            })?;

        let outcome = self.drive(&mut session).await;
        session.close(true);

        debug!(id = self.id, ?outcome, "test case settled");
        self.status = outcome;
        Ok(outcome)
    }

    async fn drive(&mut self, session: &mut PtySession) -> Outcome {
        // A conforming shell prints its prompt immediately after spawn, so
        // this first wait is assumed to match; anything else settles through
        // the same classification as the post-command wait.
        match session.expect(&self.config.prompt).await {
            ExpectResult::Matched => {}
            early => return self.settle(early, session),
        }

        session.send_line(&self.command);

        let result = session.expect(&self.config.prompt).await;
        self.settle(result, session)
    }

    /// Map an expect result onto a terminal outcome.
    fn settle(&mut self, result: ExpectResult, session: &mut PtySession) -> Outcome {
        match result {
            ExpectResult::TimedOut => {
                debug_assert!(session.is_alive(), "timed out against a dead shell");
                Outcome::Timeout
            }
            ExpectResult::Ended(status) if !status.success() => Outcome::CrashedProcess,
            // Clean shutdown and a reappearing prompt classify identically:
            // decode what came before and match it against the expectation.
            ExpectResult::Ended(_) | ExpectResult::Matched => self.classify(session.before()),
        }
    }

    /// Decode the before-match bytes and match them against the expectation.
    fn classify(&mut self, before: &[u8]) -> Outcome {
        match std::str::from_utf8(before) {
            Err(_) => Outcome::UndecodableOutput,
            Ok(text) => {
                self.output = text.to_owned();
                if self.expected.is_match(text) {
                    Outcome::Success
                } else {
                    Outcome::Failure
                }
            }
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> Outcome {
        self.status
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// The expected-output pattern as written in the suite file.
    pub fn expected(&self) -> &str {
        &self.expected_src
    }

    /// The decoded captured output (empty unless the case decoded some).
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Classify raw captured bytes as if a run had produced them.
    #[cfg(test)]
    pub(crate) fn settle_for_tests(&mut self, before: &[u8]) {
        self.status = self.classify(before);
    }

    /// Clone the originating spec, for callers that need a fresh case.
    pub fn spec(&self) -> TestSpec {
        TestSpec {
            cmd: self.command.clone(),
            out: self.expected_src.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config() -> Arc<SuiteConfig> {
        Arc::new(SuiteConfig {
            desc: "B0".to_string(),
            shell: "sh".to_string(),
            prompt: regex::bytes::Regex::new(r"\$ ").unwrap(),
            timeout: Duration::from_secs(1),
            cmds: Vec::new(),
            work_dir: PathBuf::from("/tmp"),
        })
    }

    fn case(out: &str) -> TestCase {
        let spec = TestSpec {
            cmd: "echo hi".to_string(),
            out: out.to_string(),
        };
        TestCase::new(1, &spec, config()).unwrap()
    }

    #[test]
    fn prefix_match_is_success() {
        let mut c = case("hi");
        assert_eq!(c.classify(b"hi there\r\n"), Outcome::Success);
        assert_eq!(c.output(), "hi there\r\n");
    }

    #[test]
    fn match_is_anchored_at_start() {
        // The pattern occurs in the text but not at the start.
        let mut c = case("there");
        assert_eq!(c.classify(b"hi there\r\n"), Outcome::Failure);
    }

    #[test]
    fn empty_pattern_matches_anything() {
        assert_eq!(case("").classify(b""), Outcome::Success);
        assert_eq!(case("").classify(b"whatever\r\n"), Outcome::Success);
    }

    #[test]
    fn regex_syntax_reaches_the_matcher() {
        let mut c = case(r"h[io]\r\n");
        assert_eq!(c.classify(b"ho\r\n"), Outcome::Success);
        assert_eq!(c.classify(b"ha\r\n"), Outcome::Failure);
    }

    #[test]
    fn invalid_utf8_is_undecodable_not_failure() {
        let mut c = case("");
        assert_eq!(c.classify(&[0xC0, 0xA9, b'\n']), Outcome::UndecodableOutput);
    }

    #[test]
    fn invalid_pattern_fails_at_construction() {
        let spec = TestSpec {
            cmd: String::new(),
            out: "(unclosed".to_string(),
        };
        assert!(TestCase::new(1, &spec, config()).is_err());
    }

    #[test]
    fn new_case_starts_unknown() {
        assert_eq!(case("").status(), Outcome::Unknown);
    }
}
