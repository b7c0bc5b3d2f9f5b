//! CLI integration tests for the Converto command-line interface.
//!
//! These tests do not need a running backend: they cover help output,
//! argument parsing, local-only commands (`merge`, `config`) and the
//! errors raised before any request is sent.

use std::io::{Cursor, Read, Write};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A converto command isolated from the user's config, data and logs.
fn converto(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("converto").unwrap();
    cmd.current_dir(home.path())
        .env("CONVERTO_CONFIG_DIR", home.path().join("config"))
        .env("CONVERTO_DATA_DIR", home.path().join("data"))
        .env_remove("CONVERTO_BACKEND_URL")
        .env_remove("CONVERTO_ACCESS_TOKEN")
        .env_remove("CONVERTO_GOOGLE_CLIENT_SECRET");
    cmd
}

fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn zip_entries(path: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let data = std::fs::read(path).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    let mut out = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        out.push((file.name().to_string(), contents));
    }
    out.sort();
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Converto"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("converto"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("compress"))
        .stdout(predicate::str::contains("remove-bg"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("tasks"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_global_flags_accepted() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args([
            "--verbose",
            "--json",
            "--backend",
            "http://localhost:9999/api",
            "--help",
        ])
        .assert()
        .success();
}

#[test]
fn test_auth_login_help() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["auth", "login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--provider"))
        .stdout(predicate::str::contains("--print-token"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command_fails() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .arg("transmogrify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_convert_requires_target_format() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["convert", "a.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--to"));
}

#[test]
fn test_compress_rejects_unknown_kind() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["compress", "document", "a.docx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_convert_missing_file() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["convert", "missing.png", "--to", "webp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a file"));
}

#[test]
fn test_output_and_output_dir_conflict() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["remove-bg", "photo.png", "-o", "a.png", "--output-dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_backend_commands_require_sign_in() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("photo.png"), b"png").unwrap();
    converto(&home)
        .args(["remove-bg", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn test_login_without_google_config() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["auth", "login"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Local Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_merge_flattens_inputs() {
    let home = TempDir::new().unwrap();
    let dir = home.path();
    std::fs::write(
        dir.join("images.zip"),
        zip_of(&[("a.webp", b"AAA"), ("b.webp", b"BBB")]),
    )
    .unwrap();
    std::fs::write(dir.join("report.pdf"), b"%PDF-1.7").unwrap();
    std::fs::write(dir.join("b.webp"), b"second").unwrap();

    converto(&home)
        .args([
            "merge",
            "images.zip",
            "report.pdf",
            "b.webp",
            "-o",
            "out/all.zip",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("all.zip"))
        .stdout(predicate::str::contains("1 renamed"));

    assert_eq!(
        zip_entries(&dir.join("out/all.zip")),
        vec![
            ("a.webp".to_string(), b"AAA".to_vec()),
            ("b (1).webp".to_string(), b"second".to_vec()),
            ("b.webp".to_string(), b"BBB".to_vec()),
            ("report.pdf".to_string(), b"%PDF-1.7".to_vec()),
        ]
    );
}

#[test]
fn test_merge_skip_policy_json() {
    let home = TempDir::new().unwrap();
    let dir = home.path();
    std::fs::write(dir.join("one.zip"), zip_of(&[("x.png", b"1")])).unwrap();
    std::fs::write(dir.join("two.zip"), zip_of(&[("x.png", b"2")])).unwrap();

    converto(&home)
        .args([
            "--json",
            "merge",
            "one.zip",
            "two.zip",
            "-o",
            "merged.zip",
            "--on-collision",
            "skip",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dropped\": 1"));

    assert_eq!(
        zip_entries(&dir.join("merged.zip")),
        vec![("x.png".to_string(), b"1".to_vec())]
    );
}

#[test]
fn test_merge_corrupt_zip_kept_as_file() {
    let home = TempDir::new().unwrap();
    let dir = home.path();
    std::fs::write(dir.join("broken.zip"), b"PK\x03\x04 not really a zip").unwrap();

    converto(&home)
        .args(["merge", "broken.zip", "-o", "out.zip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not a readable zip"));

    assert_eq!(
        zip_entries(&dir.join("out.zip")),
        vec![(
            "broken.zip".to_string(),
            b"PK\x03\x04 not really a zip".to_vec()
        )]
    );
}

#[test]
fn test_merge_rejects_bad_policy() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("a.txt"), b"a").unwrap();
    converto(&home)
        .args(["merge", "a.txt", "-o", "o.zip", "--on-collision", "clobber"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown collision policy"));
}

#[test]
fn test_config_init_and_show() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    assert!(home.path().join("config").join("config.toml").is_file());

    converto(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    converto(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:8000/api"))
        .stdout(predicate::str::contains("on_collision: rename"));
}

#[test]
fn test_backend_flag_overrides_config() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["--backend", "http://backend.test/api", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://backend.test/api"));
}

#[test]
fn test_auth_status_signed_out() {
    let home = TempDir::new().unwrap();
    converto(&home)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"refresh_token_stored\": false"));

    converto(&home)
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored sign-in"));
}
