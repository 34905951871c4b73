//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_lists_targets_in_execution_order() {
  let env = TestEnv::from_fixture("two_targets.json");

  env
    .kiln_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("2 target(s) in execution order"))
    .stdout(predicate::str::contains("1. T1"))
    .stdout(predicate::str::contains("2. T2"))
    .stdout(predicate::str::contains("after: T1"))
    .stdout(predicate::str::contains("pkgA-1.0.0.pkg"));
}

#[test]
fn plan_does_not_run_actions() {
  let env = TestEnv::from_fixture("failing.json");

  env.kiln_cmd().arg("plan").assert().success();

  assert!(!env.path().join("package-ran").exists());
}

#[test]
fn plan_json_includes_versions_and_outputs() {
  let env = TestEnv::from_fixture("configurations.json");

  let output = env
    .kiln_cmd()
    .args(["-o", "json", "plan", "--platform", "linuxbsd", "-c", "release"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["platform"], "linuxbsd");
  assert_eq!(json["configuration"], "release");

  let outputs = json["targets"][0]["outputs"].as_array().unwrap();
  assert_eq!(outputs.len(), 1, "debug-only output is inactive in release");
  assert!(
    outputs[0]["path"]
      .as_str()
      .unwrap()
      .ends_with("tools-linuxbsd-release.txt")
  );
  assert_eq!(outputs[0]["exists"], false);
}

#[test]
fn plan_reports_versions() {
  let env = TestEnv::from_fixture("two_targets.json");

  let output = env.kiln_cmd().args(["-o", "json", "plan"]).output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["versions"][0]["package"], "pkgA");
  assert_eq!(json["versions"][0]["version"], "1.0.0");
}

#[test]
fn plan_explicit_file_argument() {
  let env = TestEnv::from_fixture("two_targets.json");
  let renamed = env.path().join("release.json");
  std::fs::rename(&env.plan_path, &renamed).unwrap();

  env
    .kiln_cmd()
    .arg("plan")
    .arg(&renamed)
    .assert()
    .success()
    .stdout(predicate::str::contains("2 target(s)"));
}

#[test]
fn plan_with_cycle_fails() {
  let env = TestEnv::from_fixture("cyclic.json");

  env
    .kiln_cmd()
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("A -> B -> A").or(predicate::str::contains("B -> A -> B")));
}
