//! Suite-level orchestration: one-time setup, case construction, and
//! selective execution.

use crate::case::{Outcome, TestCase};
use crate::report::Reporter;
use crate::suite::{SetupSpec, SuiteConfig, TestSpec};
use anyhow::{Context, Result, bail, ensure};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

/// Owns the shared configuration and the suite's working directory.
///
/// The temp directory lives as long as the runner; cleanup on drop is
/// best-effort, as with any `TempDir`.
#[derive(Debug)]
pub struct Runner {
    config: Arc<SuiteConfig>,
    _work_dir: TempDir,
}

impl Runner {
    /// Apply the one-time suite setup and freeze the shared configuration.
    ///
    /// In order: extends `PATH` with the current working directory (so a
    /// shell binary co-located with the runner is spawn-able by bare name),
    /// compiles the prompt pattern, creates an isolated temporary working
    /// directory and chdirs into it, then runs each setup command through
    /// `sh -c`. Any failure here aborts the whole run.
    pub fn initialize(setup: SetupSpec) -> Result<Self> {
        ensure!(
            setup.timeout.is_finite() && setup.timeout > 0.0,
            "Invalid timeout: {}",
            setup.timeout
        );

        let prompt = regex::bytes::Regex::new(&setup.prompt)
            .with_context(|| format!("Invalid prompt pattern '{}'", setup.prompt))?;

        extend_path_with_cwd()?;

        let work_dir = TempDir::new().context("Unable to create temporary directory")?;
        std::env::set_current_dir(work_dir.path())
            .with_context(|| format!("Unable to enter '{}'", work_dir.path().display()))?;
        info!(path = %work_dir.path().display(), "created temporary working directory");

        for cmd in &setup.cmds {
            run_setup_command(cmd, work_dir.path())?;
        }
        if !setup.cmds.is_empty() {
            info!(count = setup.cmds.len(), "executed setup commands");
        }

        let config = Arc::new(SuiteConfig {
            desc: setup.desc,
            shell: setup.shell,
            prompt,
            timeout: std::time::Duration::from_secs_f64(setup.timeout),
            cmds: setup.cmds,
            work_dir: work_dir.path().to_path_buf(),
        });

        Ok(Runner {
            config,
            _work_dir: work_dir,
        })
    }

    /// The frozen per-run configuration shared by all cases.
    pub fn config(&self) -> Arc<SuiteConfig> {
        Arc::clone(&self.config)
    }

    /// Construct one case per spec, assigning 1-based ids in input order.
    pub fn build_cases(&self, specs: &[TestSpec]) -> Result<Vec<TestCase>> {
        specs
            .iter()
            .enumerate()
            .map(|(i, spec)| TestCase::new(i + 1, spec, Arc::clone(&self.config)))
            .collect()
    }

    /// Run and report cases, either all of them or a selected id list.
    ///
    /// With `ids = None` every case runs once, in definition order. With a
    /// selection, every id is validated against `[1, len]` up front — an
    /// out-of-range id aborts before any test executes — and the named cases
    /// then run in the order given. An id that appears again after its case
    /// already ran gets a fresh case built from the same spec.
    ///
    /// Per-test outcomes never abort the batch; only a spawn failure does.
    pub async fn run_selected<W: std::io::Write>(
        &self,
        cases: &mut [TestCase],
        ids: Option<&[usize]>,
        reporter: &mut Reporter<W>,
    ) -> Result<()> {
        match ids {
            None => {
                for case in cases.iter_mut() {
                    case.run().await?;
                    reporter.report(case)?;
                }
            }
            Some(ids) => {
                let count = cases.len();
                if let Some(bad) = ids.iter().find(|&&id| id == 0 || id > count) {
                    bail!("Invalid test id {bad}: suite defines {count} tests");
                }
                for &id in ids {
                    let case = &mut cases[id - 1];
                    if case.status() != Outcome::Unknown {
                        // A case runs at most once; a repeated id gets a
                        // fresh case built from the same spec.
                        let spec = case.spec();
                        *case = TestCase::new(id, &spec, Arc::clone(&self.config))?;
                    }
                    case.run().await?;
                    reporter.report(case)?;
                }
            }
        }
        Ok(())
    }
}

/// Parse a test selection such as `1,3-5,7` into the flat id list
/// `[1, 3, 4, 5, 7]`.
///
/// Each comma-separated item is a single id or an inclusive `start-end`
/// range; anything else is fatal. A reversed range expands to nothing.
pub fn parse_id_ranges(list: &str) -> Result<Vec<usize>> {
    let item = regex::Regex::new(r"^(\d+)(?:-(\d+))?$")?;
    let mut ids = Vec::new();
    for part in list.split(',') {
        let caps = item
            .captures(part)
            .with_context(|| format!("Invalid test range '{part}'"))?;
        let start: usize = caps[1]
            .parse()
            .with_context(|| format!("Invalid test range '{part}'"))?;
        let end: usize = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse()
                .with_context(|| format!("Invalid test range '{part}'"))?,
            None => start,
        };
        ids.extend(start..=end);
    }
    Ok(ids)
}

/// Run one setup command through the system shell, capturing its output.
///
/// Distinguishes "the shell itself could not run" from "the command exited
/// non-zero"; both are fatal to the run. No time bound is imposed: setup
/// commands are expected to be near-instant, and a hung one hangs the suite.
fn run_setup_command(cmd: &str, work_dir: &std::path::Path) -> Result<()> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(work_dir)
        .output()
        .with_context(|| format!("Setup command not found: '{cmd}'"))?;
    if !output.status.success() {
        bail!(
            "Setup command failed: '{cmd}' ({})",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// Append the current working directory to `PATH` for the rest of the run.
fn extend_path_with_cwd() -> Result<()> {
    let cwd = std::env::current_dir().context("Unable to determine current directory")?;
    let path = std::env::var_os("PATH").unwrap_or_default();
    let mut paths: Vec<_> = std::env::split_paths(&path).collect();
    paths.push(cwd);
    let joined = std::env::join_paths(paths).context("Unable to extend PATH")?;
    // SAFETY: called once during single-threaded suite initialization, before
    // any test case or pty reader thread exists.
    unsafe { std::env::set_var("PATH", &joined) };
    Ok(())
}
