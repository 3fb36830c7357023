use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

// 2024-01-10 12:00 UTC: the same calendar day in every time zone from
// UTC-11 to UTC+11.
const JAN_10: i64 = 1_704_888_000;
const DAY: i64 = 86_400;

fn skim_notes_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("skim-notes");
    path
}

fn setup_test_env(provider: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("Philosophie")).unwrap();
    fs::create_dir_all(root.join("SES")).unwrap();

    let config_content = format!(
        r#"[paths]
base_dir = "{}"
watched = ["Philosophie", "SES", "Recherche"]
dest_dir = "Notes"

[analysis]
provider = "{}"

[automation]
enabled = false
"#,
        root.display(),
        provider
    );

    let config_path = config_dir.join("skim-notes.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_skim_notes(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = skim_notes_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("SKIM_NOTES_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run skim-notes binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn skim_plist(notes: &[(u32, &str)]) -> String {
    let mut body = String::new();
    for (page, text) in notes {
        body.push_str(&format!(
            "  <dict>\n    <key>contents</key>\n    <string>{}</string>\n    <key>pageIndex</key>\n    <integer>{}</integer>\n    <key>type</key>\n    <string>Note</string>\n  </dict>\n",
            text, page
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
         <plist version=\"1.0\">\n<array>\n{}</array>\n</plist>\n",
        body
    )
}

fn write_with_mtime(path: &Path, content: &str, mtime: i64) {
    fs::write(path, content).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

/// Kant.skim (converted during the run) and a textualized Marx.rtf.
fn seed_documents(root: &Path) {
    write_with_mtime(
        &root.join("Philosophie/Kant.skim"),
        &skim_plist(&[(0, "La raison pure"), (11, "La raison pure et ses limites")]),
        JAN_10,
    );
    write_with_mtime(
        &root.join("SES/Marx.rtf"),
        "Page 3: La plus-value\n\nPage 7: Le capital fixe",
        JAN_10,
    );
}

fn snapshot_dir(root: &Path, date: &str) -> PathBuf {
    root.join("Notes").join(format!("Notes en markdown - {}", date))
}

#[test]
fn test_run_writes_snapshot_with_notes_and_index() {
    let (tmp, config_path) = setup_test_env("local");
    seed_documents(tmp.path());

    let (stdout, stderr, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);
    assert!(success, "run failed: {}", stderr);
    assert!(stdout.contains("run 2024-02-01"));
    assert!(stdout.contains("converted: 1"));
    assert!(stdout.contains("notes generated: 2"));
    assert!(stdout.contains("ok"));

    assert!(tmp.path().join("Philosophie/Kant.rtf").exists());

    let snap = snapshot_dir(tmp.path(), "2024-02-01");
    let kant = fs::read_to_string(snap.join("Kant.md")).unwrap();
    assert!(kant.starts_with("# Kant\n**Source**: `Kant.rtf`\n"));
    assert!(kant.contains("**Dernière lecture**: 2024-01-10"));
    assert!(kant.contains("**Généré le**: 2024-02-01"));
    assert!(kant.contains("## 🧠 Concepts clés"));
    assert!(kant.contains("`raison pure`"));
    assert!(kant.contains("#raison_pure"));
    assert!(kant.contains("### Page 12:\nLa raison pure et ses limites"));

    let marx = fs::read_to_string(snap.join("Marx.md")).unwrap();
    assert!(marx.contains("### Page 3:\nLa plus-value"));

    let index = fs::read_to_string(snap.join("Index.md")).unwrap();
    assert!(index.starts_with("# Index des Lectures - 2024-02-01\n"));
    assert!(index.contains("Nombre de documents traités : 2"));
    let kant_pos = index.find("- [Kant](Kant.md)").unwrap();
    let marx_pos = index.find("- [Marx](Marx.md)").unwrap();
    assert!(kant_pos < marx_pos);
}

#[test]
fn test_rerun_skips_unchanged_documents() {
    let (tmp, config_path) = setup_test_env("disabled");
    seed_documents(tmp.path());

    let (_, stderr, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);
    assert!(success, "first run failed: {}", stderr);

    let (stdout, stderr, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-15"]);
    assert!(success, "second run failed: {}", stderr);
    assert!(stdout.contains("notes generated: 0"));
    assert!(stdout.contains("up to date: 2"));

    let index = fs::read_to_string(snapshot_dir(tmp.path(), "2024-02-15").join("Index.md")).unwrap();
    assert!(index.contains("Nombre de documents traités : 0"));
}

#[test]
fn test_same_day_rerun_writes_no_notes() {
    let (tmp, config_path) = setup_test_env("disabled");
    seed_documents(tmp.path());

    let (_, stderr, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);
    assert!(success, "first run failed: {}", stderr);
    let snap = snapshot_dir(tmp.path(), "2024-02-01");
    let kant = snap.join("Kant.md");
    set_file_mtime(&kant, FileTime::from_unix_time(JAN_10 - DAY, 0)).unwrap();

    let (stdout, stderr, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);
    assert!(success, "second run failed: {}", stderr);
    assert!(stdout.contains("notes generated: 0"));
    assert!(stdout.contains("kept from this snapshot: 2"));
    assert_eq!(
        FileTime::from_last_modification_time(&fs::metadata(&kant).unwrap()),
        FileTime::from_unix_time(JAN_10 - DAY, 0)
    );

    let index = fs::read_to_string(snap.join("Index.md")).unwrap();
    assert!(index.contains("Nombre de documents traités : 2"));
}

#[test]
fn test_changed_document_is_regenerated() {
    let (tmp, config_path) = setup_test_env("disabled");
    seed_documents(tmp.path());
    run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);

    write_with_mtime(
        &tmp.path().join("SES/Marx.rtf"),
        "Page 3: La plus-value\n\nPage 9: Nouvelle note",
        JAN_10 + 20 * DAY,
    );

    let (stdout, _, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-15"]);
    assert!(success);
    assert!(stdout.contains("notes generated: 1"));

    let snap = snapshot_dir(tmp.path(), "2024-02-15");
    let marx = fs::read_to_string(snap.join("Marx.md")).unwrap();
    assert!(marx.contains("Nouvelle note"));
    assert!(!snap.join("Kant.md").exists());
    assert!(!marx.contains("Concepts clés"));
}

#[test]
fn test_prior_note_without_marker_is_reprocessed() {
    let (tmp, config_path) = setup_test_env("disabled");
    seed_documents(tmp.path());
    run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);

    let prior = snapshot_dir(tmp.path(), "2024-02-01");
    fs::write(prior.join("Kant.md"), "# Kant\nhand-edited, header lost\n").unwrap();
    fs::remove_file(prior.join(".skim-notes.json")).unwrap();

    let (stdout, _, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-15"]);
    assert!(success);
    assert!(stdout.contains("notes generated: 1"));
    assert!(snapshot_dir(tmp.path(), "2024-02-15").join("Kant.md").exists());
}

#[test]
fn test_convert_follows_timestamps() {
    let (tmp, config_path) = setup_test_env("disabled");
    let skim = tmp.path().join("Philosophie/Hegel.skim");
    let rtf = tmp.path().join("Philosophie/Hegel.rtf");
    write_with_mtime(&skim, &skim_plist(&[(4, "Aufhebung")]), JAN_10);
    write_with_mtime(&rtf, "{\\rtf1 stale}", JAN_10 - DAY);

    let (stdout, stderr, success) = run_skim_notes(&config_path, &["convert"]);
    assert!(success, "convert failed: {}", stderr);
    assert!(stdout.contains("converted: 1"));
    assert!(fs::read_to_string(&rtf).unwrap().contains("{\\b Page 5:}"));

    set_file_mtime(&rtf, FileTime::from_unix_time(JAN_10 + DAY, 0)).unwrap();
    let (stdout, _, success) = run_skim_notes(&config_path, &["convert"]);
    assert!(success);
    assert!(stdout.contains("converted: 0"));
    assert!(stdout.contains("up to date: 1"));
}

#[test]
fn test_malformed_annotation_file_does_not_abort() {
    let (tmp, config_path) = setup_test_env("disabled");
    seed_documents(tmp.path());
    write_with_mtime(&tmp.path().join("Philosophie/Broken.skim"), "not a plist", JAN_10);

    let (stdout, stderr, success) = run_skim_notes(&config_path, &["run", "--date", "2024-02-01"]);
    assert!(success, "run failed: {}", stderr);
    assert!(stdout.contains("failed: 1"));
    assert!(stdout.contains("notes generated: 2"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env("disabled");
    write_with_mtime(&tmp.path().join("SES/Marx.rtf"), "Page 1: texte", JAN_10);

    let (stdout, _, success) =
        run_skim_notes(&config_path, &["run", "--date", "2024-02-01", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("notes to generate: 1"));
    assert!(!tmp.path().join("Notes").exists());
}

#[test]
fn test_sources_lists_watched_folders() {
    let (tmp, config_path) = setup_test_env("disabled");
    seed_documents(tmp.path());

    let (stdout, _, success) = run_skim_notes(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("FOLDER"));
    assert!(stdout.contains("Philosophie"));
    assert!(stdout.contains("Recherche"));
    assert!(stdout.contains("MISSING"));
}

#[test]
fn test_init_creates_folders() {
    let (tmp, config_path) = setup_test_env("disabled");
    let (_, stderr, success) = run_skim_notes(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(tmp.path().join("Recherche").is_dir());
    assert!(tmp.path().join("Notes").is_dir());
}

#[test]
fn test_inspect_prints_blocks() {
    let (tmp, config_path) = setup_test_env("local");
    let file = tmp.path().join("SES/Marx.rtf");
    fs::write(&file, "Page 3: La plus-value\nPage 7: Le capital fixe").unwrap();

    let (stdout, _, success) = run_skim_notes(&config_path, &["inspect", file.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("blocks: 2"));
    assert!(stdout.contains("p.3"));
    assert!(stdout.contains("concepts:"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_skim_notes(&tmp.path().join("absent.toml"), &["sources"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env("telepathy");
    let (_, stderr, success) = run_skim_notes(&config_path, &["sources"]);
    assert!(!success);
    assert!(stderr.contains("Unknown analysis provider"));
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env("disabled");
    let (stdout, _, success) = run_skim_notes(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("skim-notes"));
}
