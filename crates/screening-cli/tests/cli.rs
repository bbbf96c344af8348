use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("cardio-screen").unwrap()
}

fn make_class(root: &Path, class: &str, n: usize) {
    let dir = root.join(class);
    fs::create_dir_all(&dir).unwrap();
    for i in 0..n {
        fs::write(dir.join(format!("{i}.jpg")), [0xffu8, 0xd8, i as u8]).unwrap();
    }
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("assess"))
        .stdout(contains("batch"))
        .stdout(contains("split"));
}

#[test]
fn split_copies_dataset() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    make_class(src.path(), "No_DR", 20);
    make_class(src.path(), "Proliferate_DR", 20);

    cmd()
        .arg("split")
        .arg(src.path())
        .arg(dst.path())
        .assert()
        .success()
        .stdout(contains("Total images copied: 40"))
        .stdout(contains("Missing classes:     Mild, Moderate, Severe"));

    let train = fs::read_dir(dst.path().join("Train").join("High_Risk")).unwrap().count();
    assert_eq!(train, 14);
}

#[test]
fn split_with_config_file() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    make_class(src.path(), "healthy", 10);
    let config = src.path().join("split.json");
    fs::write(&config, r#"{"seed": 1, "classes": [{"source": "healthy", "group": "Low_Risk"}]}"#).unwrap();

    cmd()
        .arg("split")
        .arg(src.path())
        .arg(dst.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("Total images copied: 10"));

    assert!(dst.path().join("Test").join("Low_Risk").is_dir());
    assert!(!dst.path().join("Train").join("High_Risk").exists());
}

#[test]
fn assess_fails_without_model() {
    let dir = TempDir::new().unwrap();
    cmd()
        .arg("assess")
        .arg(dir.path().join("eye.png"))
        .arg("--model")
        .arg(dir.path().join("missing.onnx"))
        .assert()
        .failure()
        .stderr(contains("failed to load model"));
}

#[test]
fn batch_rejects_unknown_format() {
    cmd()
        .args(["batch", "images", "--format", "xml"])
        .assert()
        .failure()
        .stderr(contains("Unknown format"));
}
