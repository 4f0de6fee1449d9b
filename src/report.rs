//! Rendering of completed test cases as human-readable report lines.

use crate::case::{Outcome, TestCase};
use anyhow::Result;
use std::io::Write;

/// Field width of the verbose detail columns.
const FIELD_WIDTH: usize = 60;

/// Renders completed cases to any writer: stdout in the binary, a byte
/// buffer in tests.
pub struct Reporter<W: Write> {
    out: W,
    verbose: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Reporter { out, verbose }
    }

    /// Write the report for one completed case.
    ///
    /// One `OK!`/`KO!` summary line always; in verbose mode also the command,
    /// and either the expected/produced pair or a placeholder describing the
    /// non-renderable outcome. Calling this on a case that has not run is a
    /// usage error.
    pub fn report(&mut self, case: &TestCase) -> Result<()> {
        assert!(
            case.status() != Outcome::Unknown,
            "Test {:2}: reported before TestCase::run",
            case.id()
        );

        let header = format!(
            "{}: {}.T{:02}: ",
            env!("CARGO_PKG_NAME"),
            case.config().desc,
            case.id()
        );

        if self.verbose {
            writeln!(self.out)?;
        }
        let verdict = if case.status() == Outcome::Success {
            "OK!"
        } else {
            "KO!"
        };
        writeln!(self.out, "{header}Result   : {verdict}")?;

        if self.verbose {
            self.detail(case, &header)?;
        }
        Ok(())
    }

    fn detail(&mut self, case: &TestCase, header: &str) -> Result<()> {
        writeln!(
            self.out,
            "{header}Command  : '{:<FIELD_WIDTH$}'",
            clip(case.command())
        )?;

        match case.status() {
            Outcome::Success | Outcome::Failure => {
                writeln!(
                    self.out,
                    "{header}Expected : '{:<FIELD_WIDTH$}'",
                    clip(case.expected())
                )?;
                writeln!(
                    self.out,
                    "{header}Produced : '{:<FIELD_WIDTH$}'",
                    clip(case.output())
                )?;
                // Escaped dump of the full text, so stray control characters
                // and line endings are visible.
                writeln!(self.out, "{header}Produced : {:?}", case.output())?;
            }
            Outcome::Timeout => self.placeholder(header, "TIMEOUT! Prompt not found!")?,
            Outcome::CrashedProcess => {
                self.placeholder(header, "CRASH! Shell process died abnormally")?;
            }
            Outcome::UndecodableOutput => {
                self.placeholder(header, "Undecodable (non-UTF-8) bytes in output")?;
            }
            Outcome::Unknown => unreachable!("checked in report"),
        }
        Ok(())
    }

    fn placeholder(&mut self, header: &str, text: &str) -> Result<()> {
        writeln!(self.out, "{header}Produced : '{text:^FIELD_WIDTH$}'")?;
        Ok(())
    }
}

/// Truncate to the detail field width on a character boundary.
fn clip(s: &str) -> &str {
    s.char_indices()
        .nth(FIELD_WIDTH)
        .map_or(s, |(i, _)| &s[..i])
}
