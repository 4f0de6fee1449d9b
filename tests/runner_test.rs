//! Whole-suite end-to-end test: suite file loading, one-time setup, case
//! selection, and reporting.
//!
//! Kept as a single test function: suite initialization mutates process-wide
//! state (current directory, PATH), so the segments must run sequentially in
//! a known order.

mod common;

use shtest::{Outcome, Reporter, Runner, SetupSpec, load_suite};
use tempfile::TempDir;

const SUITE: &str = r#"{
    "setup": {
        "desc": "B1",
        "shell": "fakesh",
        "prompt": "fakesh> ",
        "timeout": 3,
        "cmds": ["touch marker.txt", "printf seed > seed.txt"]
    },
    "tests": [
        {"cmd": "echo hi", "out": "hi"},
        {"cmd": "echo hi", "out": "bye"},
        {"cmd": "exit"},
        {"cmd": "crash", "out": ""}
    ]
}"#;

fn render(sink: Vec<u8>) -> String {
    String::from_utf8(sink).unwrap()
}

#[tokio::test]
async fn suite_end_to_end() {
    // The fake shell sits next to the "runner" in the launch directory and is
    // referenced by bare name in the suite file: spawning it proves the PATH
    // extension works.
    let launch_dir = TempDir::new().unwrap();
    common::install_fake_shell(launch_dir.path());
    std::env::set_current_dir(launch_dir.path()).unwrap();

    let suite_path = launch_dir.path().join("suite.json");
    std::fs::write(&suite_path, SUITE).unwrap();
    let suite = load_suite(&suite_path).unwrap();

    let runner = Runner::initialize(suite.setup).unwrap();

    // Setup ran inside a fresh working directory, not the launch directory.
    let work_dir = std::env::current_dir().unwrap();
    assert_ne!(work_dir, launch_dir.path());
    assert!(work_dir.join("marker.txt").exists());
    assert_eq!(std::fs::read_to_string(work_dir.join("seed.txt")).unwrap(), "seed");

    // Unfiltered run: every case, in definition order, reported once.
    let mut cases = runner.build_cases(&suite.tests).unwrap();
    let mut sink = Vec::new();
    runner
        .run_selected(&mut cases, None, &mut Reporter::new(&mut sink, false))
        .await
        .unwrap();

    let statuses: Vec<Outcome> = cases.iter().map(|c| c.status()).collect();
    assert_eq!(
        statuses,
        vec![
            Outcome::Success,
            Outcome::Failure,
            Outcome::Success,
            Outcome::CrashedProcess,
        ]
    );
    let text = render(sink);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "shtest: B1.T01: Result   : OK!");
    assert_eq!(lines[1], "shtest: B1.T02: Result   : KO!");
    assert_eq!(lines[2], "shtest: B1.T03: Result   : OK!");
    assert_eq!(lines[3], "shtest: B1.T04: Result   : KO!");

    // Filtered run: only the named ids, in the order given.
    let mut cases = runner.build_cases(&suite.tests).unwrap();
    let mut sink = Vec::new();
    runner
        .run_selected(&mut cases, Some(&[3, 1]), &mut Reporter::new(&mut sink, false))
        .await
        .unwrap();
    let text = render(sink);
    assert!(text.find("T03").unwrap() < text.find("T01").unwrap());
    assert_eq!(cases[1].status(), Outcome::Unknown);
    assert_eq!(cases[3].status(), Outcome::Unknown);

    // A repeated id runs again on a fresh case.
    let mut cases = runner.build_cases(&suite.tests).unwrap();
    let mut sink = Vec::new();
    runner
        .run_selected(&mut cases, Some(&[1, 1]), &mut Reporter::new(&mut sink, false))
        .await
        .unwrap();
    let text = render(sink);
    assert_eq!(text.matches("T01: Result   : OK!").count(), 2);

    // Any out-of-range id aborts before a single test executes.
    let mut cases = runner.build_cases(&suite.tests).unwrap();
    let mut sink = Vec::new();
    let err = runner
        .run_selected(&mut cases, Some(&[2, 5]), &mut Reporter::new(&mut sink, false))
        .await
        .expect_err("id 5 is out of range");
    assert!(err.to_string().contains("Invalid test id 5"));
    assert!(cases.iter().all(|c| c.status() == Outcome::Unknown));
    assert!(sink.is_empty());

    // Failing setup commands abort initialization.
    let failing = SetupSpec {
        cmds: vec!["true".to_string(), "false".to_string()],
        ..SetupSpec::default()
    };
    let err = Runner::initialize(failing).expect_err("setup command fails");
    assert!(err.to_string().contains("Setup command failed"));

    // A prompt that does not compile as a regex is fatal.
    let bad_prompt = SetupSpec {
        prompt: "(".to_string(),
        ..SetupSpec::default()
    };
    assert!(Runner::initialize(bad_prompt).is_err());

    // A non-positive timeout is fatal.
    let bad_timeout = SetupSpec {
        timeout: 0.0,
        ..SetupSpec::default()
    };
    assert!(Runner::initialize(bad_timeout).is_err());
}
