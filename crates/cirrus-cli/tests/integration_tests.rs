//! End-to-end tests for the `cirrus` binary.
//!
//! Runs go against the in-process simulated backend, so every test here
//! works offline. Fixtures are written into a TempDir and polling is
//! turned off through the environment so runs settle instantly.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const VPC_TEMPLATE: &str = "\
Outputs:
  VpcId:
    Value: vpc
Resources:
  Vpc:
    Type: Network
";

const APP_TEMPLATE: &str = "\
Resources:
  App:
    Type: Compute
";

/// A two-stack set where `app` pulls an output of `vpc`.
fn two_stack_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("vpc.yaml"), VPC_TEMPLATE).unwrap();
    fs::write(temp.path().join("app.yaml"), APP_TEMPLATE).unwrap();
    fs::write(
        temp.path().join("stacks.yaml"),
        "\
prod:
  region: eu-west-1
  stacks:
    vpc:
      template: vpc.yaml
      depends: []
      params: {}
    app:
      template: app.yaml
      depends: [vpc]
      params:
        VpcId:
          source: vpc
          type: output
          variable: VpcId
",
    )
    .unwrap();
    temp
}

fn cirrus() -> Command {
    let mut cmd = Command::cargo_bin("cirrus").unwrap();
    // No sleeping between backend polls, settle on the first describe.
    cmd.env("CIRRUS__RUN__POLL_INTERVAL_SECS", "0")
        .env("CIRRUS__RUN__SETTLE_TICKS", "0")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_names_the_subcommands() {
    cirrus()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn version_matches_cargo() {
    cirrus()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_exits_with_usage_code() {
    cirrus()
        .args(["create", "--bogus"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--bogus"));
}

#[test]
fn no_color_env_value_is_not_a_parse_error() {
    // no-color.org convention: any non-empty value enables the flag.
    let temp = two_stack_fixture();
    cirrus()
        .env("NO_COLOR", "1")
        .current_dir(temp.path())
        .args(["check", "-f", "stacks.yaml"])
        .assert()
        .success();
}

#[test]
fn missing_app_config_file_exits_with_config_code() {
    let temp = two_stack_fixture();
    cirrus()
        .current_dir(temp.path())
        .args(["check", "-f", "stacks.yaml", "--config", "/nonexistent/cirrus.toml"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn missing_stack_file_exits_with_config_code() {
    cirrus()
        .args(["create", "-f", "/nonexistent/stacks.yaml"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("cannot read configuration file"));
}

#[test]
fn create_runs_the_whole_set_in_order() {
    let temp = two_stack_fixture();
    cirrus()
        .current_dir(temp.path())
        .args(["create", "-f", "stacks.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpc: succeeded"))
        .stdout(predicate::str::contains("app: succeeded"));
}

#[test]
fn create_single_stack_with_filter() {
    let temp = two_stack_fixture();
    cirrus()
        .current_dir(temp.path())
        .args(["create", "-f", "stacks.yaml", "--stack", "vpc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpc: succeeded"))
        .stdout(predicate::str::contains("app").not());
}

#[test]
fn unknown_stack_filter_exits_not_found() {
    let temp = two_stack_fixture();
    cirrus()
        .current_dir(temp.path())
        .args(["create", "-f", "stacks.yaml", "--stack", "ghost"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn dependency_cycle_exits_with_config_code() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("t.yaml"), "{}").unwrap();
    fs::write(
        temp.path().join("stacks.yaml"),
        "\
prod:
  region: r
  stacks:
    a:
      template: t.yaml
      depends: [b]
      params: {}
    b:
      template: t.yaml
      depends: [a]
      params: {}
",
    )
    .unwrap();
    cirrus()
        .current_dir(temp.path())
        .args(["create", "-f", "stacks.yaml"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Dependency cycle"));
}

#[test]
fn check_is_read_only_and_reports_missing_stacks() {
    let temp = two_stack_fixture();
    cirrus()
        .current_dir(temp.path())
        .args(["check", "-f", "stacks.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not provisioned"));
}

#[test]
fn delete_with_yes_skips_the_prompts() {
    // The simulated backend starts empty, so every stack reports as
    // not provisioned rather than deleted. The run still succeeds.
    let temp = two_stack_fixture();
    cirrus()
        .current_dir(temp.path())
        .args(["delete", "-f", "stacks.yaml", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not provisioned"));
}

#[test]
fn unresolved_environment_variable_is_a_hard_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("t.yaml"), "{}").unwrap();
    fs::write(
        temp.path().join("stacks.yaml"),
        "\
prod:
  region: r
  stacks:
    app:
      template: t.yaml
      depends: []
      params:
        Ami: 'ami-{{CIRRUS_TEST_UNSET_VARIABLE}}'
",
    )
    .unwrap();
    let mut cmd = cirrus();
    cmd.env_remove("CIRRUS_TEST_UNSET_VARIABLE");
    cmd.current_dir(temp.path())
        .args(["create", "-f", "stacks.yaml"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("CIRRUS_TEST_UNSET_VARIABLE"));
}

#[test]
fn completions_generate_a_script() {
    cirrus()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cirrus"));
}
