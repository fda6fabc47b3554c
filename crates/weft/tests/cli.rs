use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn ping_prints_pong() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weft")?;
    cmd.arg("--ping");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pong"));
    Ok(())
}

#[test]
fn check_boots_the_demo_application_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weft")?;
    cmd.arg("--check");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("bootstrap ok"))
        .stdout(predicate::str::contains("module: boilerplate"))
        .stdout(predicate::str::contains("module: weft-demo"))
        .stdout(predicate::str::contains("stage: Ready"))
        .stdout(predicate::str::contains("check complete"))
        .stdout(predicate::str::contains("pong").not());
    Ok(())
}

#[test]
fn check_accepts_pass_through_config_switches() -> Result<(), Box<dyn std::error::Error>> {
    // Unknown switches are kernel config input, not CLI errors.
    let mut cmd = Command::cargo_bin("weft")?;
    cmd.args(["--check", "--weft-demo_GREETING=quiet please"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("check complete"));
    Ok(())
}
