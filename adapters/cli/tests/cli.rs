use std::{path::PathBuf, process::Command};

fn demo_scenario() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/demo.toml")
}

fn skirmish(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_skirmish"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("skirmish binary runs");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn route_subcommand_walks_around_the_blocker() {
    let scenario = demo_scenario();
    let (ok, stdout, stderr) = skirmish(&[
        "route",
        scenario.to_str().expect("utf-8 path"),
        "--from",
        "1,1",
        "--to",
        "3,1",
    ]);

    assert!(ok, "route failed: {stderr}");
    assert_eq!(stdout.trim(), "4 steps: (1, 0) (2, 0) (3, 0) (3, 1)");
}

#[test]
fn run_subcommand_reports_the_final_turn() {
    let scenario = demo_scenario();
    let (ok, stdout, stderr) = skirmish(&[
        "--log-level",
        "warn",
        "run",
        scenario.to_str().expect("utf-8 path"),
    ]);

    assert!(ok, "run failed: {stderr}");
    assert!(stdout.contains("Rook (p1) at (5.00, 3.00)"), "{stdout}");
    assert!(stdout.contains("health 1/3"), "{stdout}");
    assert!(stdout.trim_end().ends_with("turn: p2"), "{stdout}");
}

#[test]
fn missing_scenarios_fail_with_context() {
    let (ok, _, stderr) = skirmish(&["run", "does/not/exist.toml"]);

    assert!(!ok);
    assert!(stderr.contains("failed to read scenario"), "{stderr}");
}
