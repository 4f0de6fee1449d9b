//! Suite definition file model and the runtime configuration built from it.
//!
//! A suite is a JSON document with two required members, `setup` and `tests`.
//! Every field inside them is optional and defaulted, matching the historical
//! file format:
//!
//! ```json
//! {
//!   "setup": { "desc": "B1", "shell": "simplesh", "prompt": "simplesh> ",
//!              "timeout": 3, "cmds": ["touch f1.txt"] },
//!   "tests": [ { "cmd": "echo hi", "out": "hi" } ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A parsed suite definition file.
#[derive(Debug, Deserialize)]
pub struct SuiteFile {
    pub setup: SetupSpec,
    pub tests: Vec<TestSpec>,
}

/// The `setup` member of a suite file: shared, one-time configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SetupSpec {
    /// Label prefixed to every report line.
    pub desc: String,
    /// Shell executable name or path.
    pub shell: String,
    /// Prompt pattern, used verbatim as a regex. Prompts containing regex
    /// metacharacters must be escaped by the suite author.
    pub prompt: String,
    /// Per-expect timeout in seconds.
    pub timeout: f64,
    /// Shell commands run once, in order, before any test.
    pub cmds: Vec<String>,
}

impl Default for SetupSpec {
    fn default() -> Self {
        SetupSpec {
            desc: "B0".to_string(),
            shell: "simplesh".to_string(),
            prompt: "simplesh> ".to_string(),
            timeout: 3.0,
            cmds: Vec::new(),
        }
    }
}

/// One test record: a command to send and the pattern its output must match.
///
/// The pattern is applied as a prefix match against the start of the captured
/// text; an empty pattern matches anything, including empty output. A test
/// asserting exact output must anchor the end of its own pattern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TestSpec {
    pub cmd: String,
    pub out: String,
}

/// Immutable per-run configuration shared (read-only) by every test case.
///
/// Built once by [`Runner::initialize`](crate::runner::Runner::initialize)
/// after the working directory exists; never mutated afterwards.
#[derive(Debug)]
pub struct SuiteConfig {
    pub desc: String,
    pub shell: String,
    /// Prompt compiled as a byte regex: it is matched against raw pty output,
    /// which may not be valid UTF-8.
    pub prompt: regex::bytes::Regex,
    pub timeout: Duration,
    pub cmds: Vec<String>,
    /// The temporary directory every setup command and spawned shell runs in.
    pub work_dir: PathBuf,
}

/// Read and parse a suite definition file.
///
/// An unreadable file, a file that is not UTF-8, or invalid JSON are all
/// fatal: no test runs with a half-understood suite.
pub fn load_suite(path: &Path) -> Result<SuiteFile> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read test file '{}'", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Invalid JSON format in '{}'", path.display()))
}
