use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join(".dynres.toml");
    std::fs::write(
        &path,
        r#"
[store]
path = "respondents.db"

[assets]
store_assets = false

[operator]
id = 1
name = "alice"
authority = 1
"#,
    )
    .unwrap();
    path
}

fn dynres(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dynres").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn post_show_delete_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    dynres(&config)
        .args(["post", "hello", "hi there"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Respondent created."))
        .stdout(predicate::str::contains("#1 by alice (1)"));

    dynres(&config)
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trigger: hello"))
        .stdout(predicate::str::contains("Content: hi there"));

    dynres(&config)
        .args(["del", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Respondent #1 deleted."));

    dynres(&config)
        .args(["show", "1"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Respondent #1 not found."));
}

#[test]
fn delete_by_non_owner_needs_force_and_authority() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    dynres(&config).args(["post", "hello", "hi"]).assert().success();

    dynres(&config)
        .args(["del", "1", "--user-id", "2"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("not allowed"));

    dynres(&config)
        .args(["del", "1", "-f", "--user-id", "2", "--authority", "1"])
        .assert()
        .code(5);

    dynres(&config)
        .args(["del", "1", "-f", "--user-id", "2", "--authority", "2"])
        .assert()
        .success();
}

#[test]
fn post_without_content_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    dynres(&config)
        .args(["post", "hello"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Please provide the response content."));

    dynres(&config)
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn unescaped_post_requires_post_options_authority() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    dynres(&config)
        .args(["post", "bold", "<b>yo</b>", "-n"])
        .assert()
        .code(5);

    dynres(&config)
        .args(["post", "bold", "<b>yo</b>", "-n", "--authority", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Escape: no"));
}

#[test]
fn serve_answers_matching_messages() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    dynres(&config).args(["post", "ping", "<pong>"]).assert().success();

    let input = concat!(
        r#"{"id":1,"user_id":5,"user_name":"bob","content":"ping"}"#,
        "\n",
        r#"{"id":2,"user_id":5,"user_name":"bob","content":"nothing to see"}"#,
        "\n",
    );
    dynres(&config)
        .arg("serve")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(r#"{"id":1,"reply":"&lt;pong&gt;"}
"#);
}

#[test]
fn malformed_config_exits_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(".dynres.toml");
    std::fs::write(&config, "not valid toml [[[").unwrap();

    dynres(&config)
        .args(["show", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid .dynres.toml"));
}

#[test]
fn schema_describes_config_sections() {
    let mut cmd = Command::cargo_bin("dynres").unwrap();
    cmd.arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"store\""))
        .stdout(predicate::str::contains("\"authority\""));
}

#[test]
fn init_writes_a_loadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("dynres").unwrap();
    cmd.args(["init", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    dynres(&dir.path().join(".dynres.toml"))
        .args(["list", "--format", "text"])
        .assert()
        .success()
        .stdout("");
}
