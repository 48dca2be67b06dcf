use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tascal(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tascal").expect("binary builds");
    cmd.env("TASCAL_DATABASE_PATH", dir.path().join("test.db"));
    cmd
}

fn created_id(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    text.split("ID: ")
        .nth(1)
        .expect("add output contains an id")
        .trim()
        .to_string()
}

#[test]
fn add_and_list_a_plain_task() {
    let dir = tempfile::tempdir().unwrap();

    tascal(&dir)
        .args(["add", "Buy milk", "--due", "2099-01-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task 'Buy milk'"));

    tascal(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk"))
        .stdout(predicate::str::contains("2099-01-02"));
}

#[test]
fn recurring_template_lists_its_occurrences() {
    let dir = tempfile::tempdir().unwrap();

    tascal(&dir)
        .args([
            "add",
            "Gym",
            "--from",
            "2099-01-01",
            "--until",
            "2099-01-10",
            "--on",
            "mon,wed",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added recurring task 'Gym'"));

    tascal(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gym (template)"))
        .stdout(predicate::str::contains("↻ Gym"));
}

#[test]
fn done_toggles_a_task_by_short_id() {
    let dir = tempfile::tempdir().unwrap();

    let output = tascal(&dir)
        .args(["add", "Water plants"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let id = created_id(&output);

    tascal(&dir)
        .args(["done", &id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked task as done"));

    tascal(&dir)
        .args(["done", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked task as not done"));
}

#[test]
fn edit_changes_the_title() {
    let dir = tempfile::tempdir().unwrap();

    let output = tascal(&dir)
        .args(["add", "Old title"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let id = created_id(&output);

    tascal(&dir)
        .args(["edit", &id, "--title", "New title"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated task"));

    tascal(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("New title"))
        .stdout(predicate::str::contains("Old title").not());
}

#[test]
fn delete_with_force_removes_the_task() {
    let dir = tempfile::tempdir().unwrap();

    let output = tascal(&dir)
        .args(["add", "Disposable"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let id = created_id(&output);

    tascal(&dir)
        .args(["delete", &id, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted task"));

    tascal(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn unknown_id_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();

    tascal(&dir)
        .args(["done", "zz"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No task found"));
}
