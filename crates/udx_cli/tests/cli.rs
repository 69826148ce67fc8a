use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn make_cli() -> Command {
    Command::cargo_bin("udx").unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path_str(&path)
}

fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

#[test]
fn parse_ints_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "ints.txt", "1 2,3\n44");

    make_cli()
        .args(["parse-ints", &file])
        .assert()
        .success()
        .stdout("1\n2\n3\n44\n");

    make_cli()
        .args(["parse-ints", "--parser", "basic_integer", &file])
        .args(["--set", "input_buffer_size=1"])
        .assert()
        .success()
        .stdout("1\n2\n3\n44\n");

    make_cli()
        .args(["parse-ints", "--parser", "continuous_integer", &file])
        .args(["--set", "reserve_read_size=1"])
        .assert()
        .success()
        .stdout("1\n2\n3\n44\n");
}

#[test]
fn parse_ints_from_stdin() {
    make_cli()
        .args(["parse-ints", "-"])
        .write_stdin("7 8\n9")
        .assert()
        .success()
        .stdout("7\n8\n9\n");

    make_cli()
        .args(["parse-ints", "-", "--parser", "continuous_integer"])
        .write_stdin("5")
        .assert()
        .success()
        .stdout("5\n");
}

#[test]
fn parse_ints_stdin_rejects_basic_parser() {
    make_cli()
        .args(["parse-ints", "-", "--parser", "basic_integer"])
        .write_stdin("7 8\n9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("continuous parser"));
}

#[test]
fn parse_ints_with_substitution_and_portions() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "ints.txt", "11 12\n13 14\n");

    make_cli()
        .args(["parse-ints", &file, "--substitute", "1:5"])
        .assert()
        .success()
        .stdout("55\n52\n53\n54\n");

    make_cli()
        .args(["parse-ints", &file, "--offsets", "0,6", "--nodes", "a,b", "--node", "b"])
        .assert()
        .success()
        .stdout("13\n14\n");
}

#[test]
fn filter_replaces_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "text.txt", "hello WORLD, WORLD");

    make_cli()
        .args(["filter", &file, "--replace", "WORLD:there"])
        .args(["--set", "output_buffer_size=6", "--set", "input_buffer_size=4"])
        .assert()
        .success()
        .stdout("hello there, there");
}

#[test]
fn filter_requires_a_filter() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "text.txt", "x");

    make_cli()
        .args(["filter", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--substitute or --replace"));
}

#[test]
fn inverted_index_postings() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "docs.tsv", "1\ta b c\n2\tc b e\n3\ta d a\n4\tb d e\n");

    make_cli()
        .args(["inverted-index", &file, "--term", "A"])
        .assert()
        .success()
        .stdout("a\t1\t1\t\na\t3\t2\t\na\t\t\t2\n");
}

#[test]
fn analytic_lag() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "series.tsv", "g\t3\t30\ng\t1\t10\ng\t4\t40\ng\t2\t20\n");

    make_cli()
        .args(["analytic", "lag", &file, "--offset", "2"])
        .assert()
        .success()
        .stdout("g\t1\t10\t\ng\t2\t20\t\ng\t3\t30\t10\ng\t4\t40\t20\n");

    make_cli()
        .args(["analytic", "rank", &file])
        .assert()
        .success()
        .stdout("g\t1\t10\t1\ng\t2\t20\t2\ng\t3\t30\t3\ng\t4\t40\t4\n");
}

#[test]
fn analytic_lead() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "series.tsv", "g\t3\t30\ng\t1\t10\ng\t4\t40\ng\t2\t20\n");

    make_cli()
        .args(["analytic", "lead", &file])
        .assert()
        .success()
        .stdout("g\t1\t10\t20\ng\t2\t20\t30\ng\t3\t30\t40\ng\t4\t40\t\n");
}

#[test]
fn analytic_nth_value() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "series.tsv", "b\t1\t9\na\t2\t5\na\t1\t7\n");

    make_cli()
        .args(["analytic", "nth_value", &file, "--n", "2"])
        .assert()
        .success()
        .stdout("a\t1\t7\t5\na\t2\t5\t5\nb\t1\t9\t\n");
}

#[test]
fn unknown_setting_fails() {
    make_cli()
        .args(["settings", "--set", "nope=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn settings_lists_overrides() {
    make_cli()
        .args(["settings", "--set", "batch_size=7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch_size\t7"));
}

#[test]
fn missing_file_reports_resource_error() {
    make_cli()
        .args(["parse-ints", "/no/such/file.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("resource error"));
}
