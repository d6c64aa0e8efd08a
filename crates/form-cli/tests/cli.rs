use assert_cmd::Command;
use assert_fs::{TempDir, prelude::*};
use predicates::prelude::*;
use serde_json::{Value, json};

const CONTACT: &str = include_str!("../../form-spec/tests/fixtures/contact_form.json");

fn blockform() -> Command {
    Command::cargo_bin("blockform").expect("blockform binary")
}

fn workspace() -> (TempDir, String) {
    let temp = TempDir::new().expect("temp dir");
    let spec = temp.child("contact.json");
    spec.write_str(CONTACT).expect("write spec");
    let path = spec.path().to_string_lossy().into_owned();
    (temp, path)
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read output")).expect("json")
}

#[test]
fn wizard_walks_the_form_and_writes_the_submission() {
    let (temp, spec) = workspace();
    let out = temp.child("response.json");

    blockform()
        .args(["wizard", "--spec", &spec, "--out"])
        .arg(out.path())
        .write_stdin("\n1\nada@example.com\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Form: Contact us"))
        .stdout(predicate::str::contains("  1. A"))
        .stdout(predicate::str::contains("Done"));

    let response = read_json(out.path());
    assert_eq!(response["formId"], "contact");
    assert_eq!(response["answers"]["choice"], "A");
    assert_eq!(response["answers"]["email"], "ada@example.com");
}

#[test]
fn wizard_refuses_to_leave_an_unanswered_required_block() {
    let (_temp, spec) = workspace();

    blockform()
        .args(["wizard", "--spec", &spec])
        .write_stdin("\n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please select an option"))
        .stderr(predicate::str::contains("input closed"));
}

#[test]
fn wizard_rejects_unknown_options() {
    let (_temp, spec) = workspace();

    blockform()
        .args(["wizard", "--spec", &spec])
        .write_stdin("\nC\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Choose one of: A, B."));
}

#[test]
fn wizard_resumes_from_the_recovery_directory() {
    let (temp, spec) = workspace();
    let recovery = temp.child("recovery");
    let out = temp.child("response.json");

    blockform()
        .args(["wizard", "--spec", &spec, "--recovery-dir"])
        .arg(recovery.path())
        .write_stdin("\n2\n")
        .assert()
        .failure();

    blockform()
        .args(["wizard", "--spec", &spec, "--recovery-dir"])
        .arg(recovery.path())
        .arg("--out")
        .arg(out.path())
        .write_stdin("\n\nada@example.com\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current answer: B"));

    assert_eq!(read_json(out.path())["answers"]["choice"], "B");
}

#[test]
fn validate_accepts_complete_answers() {
    let (temp, spec) = workspace();
    let answers = temp.child("answers.json");
    answers
        .write_str(&json!({ "choice": "B", "email": "ada@example.com" }).to_string())
        .expect("write answers");

    blockform()
        .args(["validate", "--spec", &spec, "--answers"])
        .arg(answers.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation result: valid"));
}

#[test]
fn validate_reports_errors_and_unknown_fields() {
    let (temp, spec) = workspace();
    let answers = temp.child("answers.json");
    answers
        .write_str(&json!({ "email": "not-an-email", "ghost": 1 }).to_string())
        .expect("write answers");

    blockform()
        .args(["validate", "--spec", &spec, "--answers"])
        .arg(answers.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validation result: invalid"))
        .stdout(predicate::str::contains("choice - "))
        .stdout(predicate::str::contains("email - "))
        .stdout(predicate::str::contains("Unknown answer fields: ghost"));
}

#[test]
fn check_lints_form_documents() {
    let (temp, spec) = workspace();
    blockform()
        .args(["check", "--spec", &spec])
        .assert()
        .success()
        .stdout(predicate::str::contains("Form check: ok"));

    let broken = temp.child("broken.json");
    broken
        .write_str(
            &json!({
                "id": "broken",
                "title": "Broken",
                "blocks": [
                    { "id": "a", "type": "email" },
                    { "id": "a", "type": "single-choice", "options": [] }
                ]
            })
            .to_string(),
        )
        .expect("write broken spec");
    blockform()
        .args(["check", "--spec"])
        .arg(broken.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("duplicate block id 'a'"))
        .stdout(predicate::str::contains("single-choice block must declare options"));
}

#[test]
fn render_prints_text_and_json() {
    let (_temp, spec) = workspace();

    blockform()
        .args(["render", "--spec", &spec])
        .assert()
        .success()
        .stdout(predicate::str::contains("Form: Contact us (contact)"))
        .stdout(predicate::str::contains("Current block: choice"));

    blockform()
        .args(["render", "--spec", &spec, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"form_id\": \"contact\""));
}

#[test]
fn schema_prints_document_or_answer_schema() {
    let (_temp, spec) = workspace();

    blockform()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("blocks"));

    let output = blockform()
        .args(["schema", "--spec", &spec])
        .output()
        .expect("run schema");
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).expect("schema json");
    assert!(schema["properties"]["email"].is_object());
    assert!(schema["required"]
        .as_array()
        .is_some_and(|required| required.contains(&json!("choice"))));
}
