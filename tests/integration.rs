//! End-to-end tests for the guestlist command line

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

const SAMPLE: &str = "Alice,010-1111,4,family\n\
                      Bob,010-2222\n\
                      broken\n\
                      Carol,010-3333,2,work\n";

/// Isolated config, store and log file in a temporary directory
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    store_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = temp_dir.path().join("store.db");
        let log_path = temp_dir.path().join("guestlist.log");

        fs::write(
            &config_path,
            format!(
                "log_file = \"{}\"\nshare_base_url = \"https://guests.example\"\n",
                log_path.display()
            ),
        )
        .unwrap();

        Self {
            temp_dir,
            config_path,
            store_path,
        }
    }

    /// Environment with SAMPLE already uploaded
    fn with_sample() -> Self {
        let env = Self::new();
        let file = env.write_file("contacts.csv", SAMPLE);
        env.guestlist()
            .args(["upload", file.to_str().unwrap()])
            .assert()
            .success();
        env
    }

    fn guestlist(&self) -> AssertCommand {
        let mut cmd = guestlist_cmd();
        cmd.current_dir(self.temp_dir.path())
            .env_remove("GUESTLIST_LOG")
            .args([
                "--config",
                self.config_path.to_str().unwrap(),
                "--store",
                self.store_path.to_str().unwrap(),
            ]);
        cmd
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.guestlist().args(args).output().unwrap();
        assert!(output.status.success(), "{:?} failed: {:?}", args, output);
        String::from_utf8(output.stdout).unwrap()
    }
}

fn guestlist_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("guestlist").unwrap()
}

// =============================================================================
// Upload
// =============================================================================

#[test]
fn test_upload_reports_count_and_skipped_lines() {
    let env = TestEnv::new();
    let file = env.write_file("contacts.csv", SAMPLE);

    env.guestlist()
        .args(["upload", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uploaded 3 contacts."))
        .stdout(predicate::str::contains("Skipped 1 lines with fewer than two columns: 3"));

    assert!(env.store_path.exists());
    assert!(env.temp_dir.path().join("guestlist.log").exists());
}

#[test]
fn test_upload_accepts_tabs() {
    let env = TestEnv::new();
    let file = env.write_file("contacts.tsv", "김철수\t010-1234-5678\t5\t가족\n");

    env.guestlist()
        .args(["upload", file.to_str().unwrap()])
        .assert()
        .success();

    env.guestlist()
        .arg("list")
        .assert()
        .success()
        .stdout("1\t김철수\t010-1234-5678\t5\t가족\tX\n");
}

#[test]
fn test_empty_upload_keeps_existing_list() {
    let env = TestEnv::with_sample();
    let empty = env.write_file("empty.csv", "\n  \n");

    env.guestlist()
        .args(["upload", empty.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file is empty"));

    let only_names = env.write_file("names.csv", "Alice\nBob\n");
    env.guestlist()
        .args(["upload", only_names.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no line had at least a name and a phone column"));

    env.guestlist()
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("total         3"));
}

// =============================================================================
// Summary, list and export
// =============================================================================

#[test]
fn test_summary_counts() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .args(["set", "2", "--invited", "yes"])
        .assert()
        .success();

    let out = env.stdout_of(&["summary"]);
    assert!(out.contains("total         3"), "{}", out);
    assert!(out.contains("invited       1 (33%)"), "{}", out);
    assert!(out.contains("not invited   2 (67%)"), "{}", out);
    assert!(out.contains("reviewed      2 (67%)"), "{}", out);
}

#[test]
fn test_summary_without_contacts() {
    let env = TestEnv::new();
    env.guestlist()
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("No contacts uploaded."));
}

#[test]
fn test_list_filters() {
    let env = TestEnv::with_sample();
    env.guestlist()
        .args(["set", "3", "--invited", "yes"])
        .assert()
        .success();

    assert_eq!(
        env.stdout_of(&["list", "--tab", "invited"]),
        "3\tCarol\t010-3333\t2\twork\tO\n"
    );
    assert_eq!(
        env.stdout_of(&["list", "--search", "ALI"]),
        "1\tAlice\t010-1111\t4\tfamily\tX\n"
    );
    assert_eq!(
        env.stdout_of(&["list", "--search", "2222"]),
        "2\tBob\t010-2222\t\t\tX\n"
    );
    assert_eq!(
        env.stdout_of(&["list", "--tab", "not-invited", "--group", "family"]),
        "1\tAlice\t010-1111\t4\tfamily\tX\n"
    );

    env.guestlist()
        .args(["list", "--intimacy", "5"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("No contacts match."));
}

#[test]
fn test_export_writes_tsv() {
    let env = TestEnv::with_sample();
    env.guestlist()
        .args(["set", "1", "--invited", "yes"])
        .assert()
        .success();

    env.guestlist()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 contacts to wedding_contacts.csv"));

    let tsv = fs::read_to_string(env.temp_dir.path().join("wedding_contacts.csv")).unwrap();
    assert_eq!(
        tsv,
        "name\tphone\t친밀도(5/5)\t그룹\t초대여부\n\
         Alice\t010-1111\t4\tfamily\tO\n\
         Bob\t010-2222\t\t\tX\n\
         Carol\t010-3333\t2\twork\tX"
    );
}

#[test]
fn test_export_filtered_to_stdout() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .args(["export", "--group", "work", "-o", "-"])
        .assert()
        .success()
        .stdout("name\tphone\t친밀도(5/5)\t그룹\t초대여부\nCarol\t010-3333\t2\twork\tX\n");
}

// =============================================================================
// Review edits
// =============================================================================

#[test]
fn test_set_updates_one_contact() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .args(["set", "2", "--intimacy", "3", "--group", " 친구 "])
        .assert()
        .success()
        .stdout("2\tBob\t010-2222\t3\t친구\tX\n");

    assert_eq!(
        env.stdout_of(&["list", "--group", "친구"]),
        "2\tBob\t010-2222\t3\t친구\tX\n"
    );
}

#[test]
fn test_set_rejects_bad_input() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .args(["set", "4", "--invited", "yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("contact 4 does not exist (have 3)"));

    env.guestlist()
        .args(["set", "1", "--intimacy", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("intimacy must be a number from 1 to 5"));

    env.guestlist()
        .args(["set", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));

    env.guestlist()
        .args(["set", "0", "--invited", "no"])
        .assert()
        .failure();
}

#[test]
fn test_next_incomplete() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .arg("next-incomplete")
        .assert()
        .success()
        .stdout("2\tBob\t010-2222\n");

    env.guestlist()
        .args(["set", "2", "--intimacy", "1", "--group", "work"])
        .assert()
        .success();

    env.guestlist()
        .arg("next-incomplete")
        .assert()
        .success()
        .stdout(predicate::str::contains("All 3 contacts are complete."));
}

// =============================================================================
// Share, backup, restore and reset
// =============================================================================

#[test]
fn test_share_link_roundtrip() {
    let source = TestEnv::with_sample();
    source
        .guestlist()
        .args(["set", "2", "--invited", "yes"])
        .assert()
        .success();

    let link = source.stdout_of(&["share"]);
    let link = link.trim();
    assert!(link.starts_with("https://guests.example/options?data="), "{}", link);

    let target = TestEnv::new();
    target
        .guestlist()
        .args(["import", link])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 contacts."));

    assert_eq!(source.stdout_of(&["list"]), target.stdout_of(&["list"]));
}

#[test]
fn test_share_base_url_override() {
    let env = TestEnv::with_sample();
    env.guestlist()
        .args(["share", "--base-url", "http://localhost:3000/"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("http://localhost:3000/options?data="));
}

#[test]
fn test_bad_import_keeps_existing_list() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .args(["import", "https://guests.example/options?lang=ko"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("link has no `data` parameter"));

    env.guestlist()
        .args(["import", "https://guests.example/options?data=bm90IGpzb24"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a contact list"));

    assert_eq!(env.stdout_of(&["list"]).lines().count(), 3);
}

#[test]
fn test_corrupt_store_is_not_shared_or_backed_up() {
    let env = TestEnv::with_sample();
    let conn = rusqlite::Connection::open(&env.store_path).unwrap();
    conn.execute("UPDATE kv SET value = '{not json' WHERE key = 'contacts'", ())
        .unwrap();
    drop(conn);

    env.guestlist()
        .arg("share")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("stored contact data is malformed"));

    env.guestlist()
        .args(["backup", "-o", "-"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("stored contact data is malformed"));
}

#[test]
fn test_share_without_contacts_fails() {
    let env = TestEnv::new();
    env.guestlist()
        .arg("share")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contacts to share"));
}

#[test]
fn test_backup_and_restore() {
    let env = TestEnv::with_sample();
    let before = env.stdout_of(&["list"]);

    env.guestlist()
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backed up to wedding_contacts.json"));
    let backup = env.temp_dir.path().join("wedding_contacts.json");
    assert!(fs::read_to_string(&backup).unwrap().starts_with('['));

    env.guestlist()
        .args(["reset", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 3 contacts."));
    assert_eq!(env.stdout_of(&["list"]), "");

    env.guestlist()
        .args(["restore", backup.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 3 contacts."));
    assert_eq!(env.stdout_of(&["list"]), before);
}

#[test]
fn test_restore_rejects_malformed_backup() {
    let env = TestEnv::with_sample();
    let bad = env.write_file("bad.json", "{\"name\":\"x\"}");

    env.guestlist()
        .args(["restore", bad.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("backup is not a JSON list of contacts"));

    assert_eq!(env.stdout_of(&["list"]).lines().count(), 3);
}

#[test]
fn test_reset_requires_yes() {
    let env = TestEnv::with_sample();

    env.guestlist()
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing to delete 3 contacts without --yes"));

    assert_eq!(env.stdout_of(&["list"]).lines().count(), 3);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_unknown_config_key_warns() {
    let env = TestEnv::new();
    let mut config = fs::read_to_string(&env.config_path).unwrap();
    config.push_str("colour = \"red\"\n");
    fs::write(&env.config_path, config).unwrap();

    env.guestlist()
        .arg("summary")
        .assert()
        .success()
        .stderr(
            predicate::str::contains(format!("warning: {}:", env.config_path.display()))
                .and(predicate::str::contains("colour")),
        );
}

#[test]
fn test_colliding_keys_fail() {
    let env = TestEnv::new();
    let mut config = fs::read_to_string(&env.config_path).unwrap();
    config.push_str("[keys.review]\nnext = [\"m\"]\n");
    fs::write(&env.config_path, config).unwrap();

    env.guestlist().arg("summary").assert().failure();
}
