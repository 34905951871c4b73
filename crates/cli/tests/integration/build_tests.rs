//! Build command integration tests.
//!
//! Fixtures run their actions through `/bin/sh`.
#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_runs_dependencies_first() {
  let env = TestEnv::from_fixture("two_targets.json");

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("T1 built in"))
    .stdout(predicate::str::contains("T2 built in"))
    .stdout(predicate::str::contains("Build complete: 2 built, 0 cached"));

  assert!(env.bin("out/pkgA-1.0.0.pkg").exists());
  assert!(env.bin("out/pkgB.bin").exists());
}

#[test]
fn build_reports_execution_order_in_json() {
  let env = TestEnv::from_fixture("two_targets.json");

  let output = env.kiln_cmd().args(["-o", "json", "build"]).output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let names: Vec<&str> = json["targets"]
    .as_array()
    .unwrap()
    .iter()
    .map(|t| t["name"].as_str().unwrap())
    .collect();

  assert_eq!(names, ["T1", "T2"]);
  assert_eq!(json["built"], 2);
  assert_eq!(json["cached"], 0);
  assert_eq!(json["targets"][0]["outcome"], "built");
}

#[test]
fn second_build_is_cached() {
  let env = TestEnv::from_fixture("two_targets.json");

  env.kiln_cmd().arg("build").assert().success();

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("T1 cached"))
    .stdout(predicate::str::contains("Build complete: 0 built, 2 cached"));
}

#[test]
fn force_rebuilds_cached_targets() {
  let env = TestEnv::from_fixture("two_targets.json");

  env.kiln_cmd().arg("build").assert().success();

  env
    .kiln_cmd()
    .args(["build", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete: 2 built, 0 cached"));
}

#[test]
fn deleted_output_triggers_rebuild_of_that_target_only() {
  let env = TestEnv::from_fixture("two_targets.json");

  env.kiln_cmd().arg("build").assert().success();
  std::fs::remove_file(env.bin("out/pkgB.bin")).unwrap();

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("T1 cached"))
    .stdout(predicate::str::contains("T2 built in"));
}

#[test]
fn failing_action_stops_the_build() {
  let env = TestEnv::from_fixture("failing.json");

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("target 'compile' failed"))
    .stderr(predicate::str::contains("exited with status 3"))
    .stderr(predicate::str::contains("error: linker exploded"));

  assert!(!env.path().join("package-ran").exists());
}

#[test]
fn failure_kind_is_reported_in_json() {
  let env = TestEnv::from_fixture("failing.json");

  let output = env.kiln_cmd().args(["-o", "json", "build"]).output().unwrap();
  assert!(!output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["kind"], "action failed");
}

#[test]
fn missing_output_fails_after_successful_action() {
  let env = TestEnv::from_fixture("missing_output.json");

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("did not produce expected outputs"))
    .stderr(predicate::str::contains("Acme.Sdk.nupkg"));
}

#[test]
fn cyclic_plan_is_rejected() {
  let env = TestEnv::from_fixture("cyclic.json");

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("dependency cycle detected"));
}

#[test]
fn unresolvable_version_fails() {
  let env = TestEnv::from_fixture("missing_version.json");

  env
    .kiln_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing version for package 'Acme.Sdk'"));
}

#[test]
fn debug_build_expects_debug_only_outputs() {
  let env = TestEnv::from_fixture("configurations.json");

  env
    .kiln_cmd()
    .args(["build", "--platform", "linuxbsd"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete: 1 built, 0 cached"));

  assert!(env.bin("tools-linuxbsd-debug.txt").exists());
  assert!(env.bin("tools.pdb").exists());
}

#[test]
fn release_configuration_from_flag() {
  let env = TestEnv::from_fixture("configurations.json");

  env
    .kiln_cmd()
    .args(["build", "--platform", "linuxbsd", "--configuration", "release"])
    .assert()
    .success();

  assert!(env.bin("tools-linuxbsd-release.txt").exists());
  assert!(!env.bin("tools.pdb").exists());
}

#[test]
fn configuration_and_platform_from_environment() {
  let env = TestEnv::from_fixture("configurations.json");

  env
    .kiln_cmd()
    .arg("build")
    .env("KILN_PLATFORM", "windows")
    .env("KILN_CONFIGURATION", "release")
    .assert()
    .success()
    .stdout(predicate::str::contains("Configuration: release"));

  assert!(env.bin("tools-windows-release.txt").exists());
}

#[test]
fn output_root_from_flag() {
  let env = TestEnv::from_fixture("configurations.json");
  let out = env.path().join("custom-out");

  // The action writes into ./bin, so the declared outputs under the custom
  // root never appear.
  env
    .kiln_cmd()
    .args(["build", "--platform", "linuxbsd", "--out-dir"])
    .arg(&out)
    .assert()
    .failure()
    .stderr(predicate::str::contains("custom-out"));
}

#[test]
fn unknown_configuration_is_rejected() {
  let env = TestEnv::from_fixture("configurations.json");

  env
    .kiln_cmd()
    .args(["build", "--configuration", "profile"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown configuration"));
}

#[test]
fn dry_run_invokes_nothing() {
  let env = TestEnv::from_fixture("two_targets.json");

  env
    .kiln_cmd()
    .args(["build", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("T1 would build"))
    .stdout(predicate::str::contains("Dry run complete: 2 would build, 0 cached"));

  assert!(!env.bin("out").exists());
}

#[test]
fn parallel_build_respects_dependencies() {
  let env = TestEnv::from_fixture("two_targets.json");

  env
    .kiln_cmd()
    .args(["build", "--jobs", "4"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete: 2 built, 0 cached"));

  assert!(env.bin("out/pkgB.bin").exists());
}

#[test]
fn verbose_logs_go_to_stderr() {
  let env = TestEnv::from_fixture("two_targets.json");

  env
    .kiln_cmd()
    .args(["-v", "build"])
    .assert()
    .success()
    .stderr(predicate::str::contains("running action"))
    .stdout(predicate::str::contains("running action").not());
}
