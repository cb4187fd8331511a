use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn bookshelf(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.current_dir(dir)
        .env_remove("BOOKSHELF_ENV")
        .env("BOOKSHELF_CONFIG_DIR", dir)
        .env("BOOKSHELF_DATABASE__BACKEND", "sqlite")
        .env(
            "BOOKSHELF_DATABASE__URL",
            format!("sqlite://{}?mode=rwc", dir.join("books.db").display()),
        )
        .env("RUST_LOG", "off");
    cmd
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = bookshelf(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn run_err(dir: &Path, args: &[&str]) -> String {
    let output = bookshelf(dir).args(args).output().unwrap();
    assert!(!output.status.success(), "{args:?} unexpectedly succeeded");
    String::from_utf8(output.stderr).unwrap()
}

#[test]
fn migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();

    assert_eq!(run_ok(dir.path(), &["migrate"]).trim(), "applied 1 migration(s)");
    assert_eq!(run_ok(dir.path(), &["migrate"]).trim(), "applied 0 migration(s)");
}

#[test]
fn books_round_trip_through_a_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path();

    let added: Value = serde_json::from_str(&run_ok(
        path,
        &[
            "books", "add", "--title", "Dune", "--author", "Frank Herbert", "--price", "9.5",
            "--isbn", "9780441172719",
        ],
    ))
    .unwrap();
    assert_eq!(added["id"], 1);
    assert_eq!(added["version"], 0);

    assert_eq!(run_ok(path, &["books", "count"]).trim(), "1");

    let updated: Value = serde_json::from_str(&run_ok(
        path,
        &["books", "update", "1", "--version", "0", "--title", "Dune Messiah"],
    ))
    .unwrap();
    assert_eq!(updated["title"], "Dune Messiah");
    assert_eq!(updated["author"], "Frank Herbert");
    assert_eq!(updated["version"], 1);

    let stale = run_err(path, &["books", "update", "1", "--version", "0", "--price", "1"]);
    assert!(stale.contains("Please reload and try again"), "{stale}");

    let page: Value = serde_json::from_str(&run_ok(path, &["books", "list", "--limit", "5"])).unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["rows"][0]["title"], "Dune Messiah");

    run_ok(path, &["books", "delete", "1"]);
    let missing = run_err(path, &["books", "delete", "1"]);
    assert!(missing.contains("Book not found with ID: 1"), "{missing}");

    let all: Value = serde_json::from_str(&run_ok(path, &["books", "all"])).unwrap();
    assert_eq!(all, Value::Array(Vec::new()));
}

#[test]
fn invalid_books_are_rejected_before_saving() {
    let dir = TempDir::new().unwrap();

    let stderr = run_err(
        dir.path(),
        &["books", "add", "--title", "X", "--author", "Someone", "--price", "-5"],
    );
    assert!(stderr.contains("Title must be between 2 and 100 characters"), "{stderr}");
    assert!(stderr.contains("Price cannot be negative"), "{stderr}");

    assert_eq!(run_ok(dir.path(), &["books", "count"]).trim(), "0");
}
