#![allow(dead_code)]

use shtest::SuiteConfig;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Prompt printed by the fake shell.
pub const PROMPT: &str = "fakesh> ";

/// A scripted stand-in for a shell under test. It speaks the prompt protocol
/// and misbehaves on demand: `exit` shuts down cleanly, `crash` dies from a
/// fatal signal, `hang` withholds the prompt while staying alive, and
/// `garbage` emits bytes that are not UTF-8. Anything else is evaluated and
/// its output echoed back before the next prompt.
const FAKE_SHELL: &str = r#"#!/bin/sh
printf 'fakesh> '
while IFS= read -r line; do
    case "$line" in
        exit) exit 0 ;;
        crash) kill -s SEGV $$ ;;
        hang) sleep 30 ;;
        garbage) printf '\300\251\n' ;;
        *) eval "$line" 2>&1 ;;
    esac
    printf 'fakesh> '
done
exit 0
"#;

/// Write the fake shell into `dir` as an executable named `fakesh`.
pub fn install_fake_shell(dir: &Path) -> PathBuf {
    let path = dir.join("fakesh");
    fs::write(&path, FAKE_SHELL).expect("write fake shell");
    let mut perms = fs::metadata(&path).expect("stat fake shell").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod fake shell");
    path
}

/// A suite configuration pointing at `shell`, with the fake shell's prompt.
pub fn fixture_config(shell: &str, timeout: Duration) -> Arc<SuiteConfig> {
    Arc::new(SuiteConfig {
        desc: "B1".to_string(),
        shell: shell.to_string(),
        prompt: regex::bytes::Regex::new(PROMPT).expect("prompt pattern"),
        timeout,
        cmds: Vec::new(),
        work_dir: std::env::temp_dir(),
    })
}
