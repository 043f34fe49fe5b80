use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn board_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("board");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/board.sqlite"

[embedding]
provider = "hashing"

[clustering]
eps = 0.6
min_samples = 1
"#,
        root.display()
    );

    let config_path = config_dir.join("board.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_board(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = board_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("BOARD_DB_PATH")
        .env_remove("BOARD_EMBEDDING_PROVIDER")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run board binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_board(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    assert!(tmp.path().join("data/board.sqlite").exists());
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_board(&config_path, &["init"]);
    assert!(success, "first init failed: {}", stderr);
    let (_, stderr, success) = run_board(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_add_then_list_ideas() {
    let (_tmp, config_path) = setup_test_env();
    run_board(&config_path, &["init"]);

    let (stdout, stderr, success) = run_board(&config_path, &["add", "buy milk"]);
    assert!(success, "add failed: {}", stderr);
    assert!(stdout.contains("Idea added: 1"));

    let (_, stderr, success) = run_board(
        &config_path,
        &["add", "write report", "--x", "40", "--y", "60"],
    );
    assert!(success, "add failed: {}", stderr);

    let (stdout, stderr, success) = run_board(&config_path, &["ideas"]);
    assert!(success, "ideas failed: {}", stderr);
    assert!(stdout.contains("buy milk"));
    assert!(stdout.contains("write report"));
    assert!(stdout.contains("2 idea(s)"));
}

#[test]
fn test_ideas_json_output() {
    let (_tmp, config_path) = setup_test_env();
    run_board(&config_path, &["add", "  padded text  ", "--width", "320"]);

    let (stdout, stderr, success) = run_board(&config_path, &["ideas", "--json"]);
    assert!(success, "ideas --json failed: {}", stderr);

    let ideas: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ideas = ideas.as_array().unwrap();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0]["text"], "padded text");
    assert_eq!(ideas[0]["x"], 200);
    assert_eq!(ideas[0]["y"], 200);
    assert_eq!(ideas[0]["z"], 0);
    assert_eq!(ideas[0]["width"], 320);
    assert_eq!(ideas[0]["height"], 100);
    assert_eq!(ideas[0]["cluster"], 0);
}

#[test]
fn test_ideas_json_shows_clusters() {
    let (_tmp, config_path) = setup_test_env();
    run_board(&config_path, &["add", "buy milk"]);
    run_board(&config_path, &["add", "buy oat milk"]);
    run_board(&config_path, &["add", "write report"]);

    let (stdout, stderr, success) = run_board(&config_path, &["ideas", "--json"]);
    assert!(success, "ideas --json failed: {}", stderr);

    let ideas: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    let labels: Vec<i64> = ideas.iter().map(|i| i["cluster"].as_i64().unwrap()).collect();
    assert_eq!(labels, vec![0, 0, 1]);
}

#[test]
fn test_add_blank_text_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_board(&config_path, &["add", "   "]);
    assert!(!success);
    assert!(stderr.contains("Idea text is required"));
}

#[test]
fn test_empty_board_listings() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_board(&config_path, &["ideas"]);
    assert!(success);
    assert!(stdout.contains("No ideas."));

    let (stdout, _, success) = run_board(&config_path, &["connections"]);
    assert!(success);
    assert!(stdout.contains("No connections."));
}

#[test]
fn test_invalid_clustering_config_rejected() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        &config_path,
        format!(
            "[db]\npath = \"{}/data/board.sqlite\"\n[clustering]\nmin_samples = 0\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_board(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("clustering"));
}
