use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const PASSWORD: &str = "test-password-secure-123";

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vault"))
}

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn vault_path(&self) -> PathBuf {
        self.dir.path().join("data").join("vault.db")
    }

    fn config_home(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    fn command(&self, password: Option<&str>) -> Command {
        let mut cmd = Command::new(bin());
        cmd.env("XDG_CONFIG_HOME", self.config_home())
            .env("XDG_DATA_HOME", self.dir.path().join("xdg-data"))
            .env("VAULT_PATH", self.vault_path())
            .env_remove("VAULT_PASSWORD")
            .env_remove("RUST_LOG");
        if let Some(password) = password {
            cmd.env("VAULT_PASSWORD", password);
        }
        cmd
    }

    fn run(&self, password: Option<&str>, args: &[&str]) -> Output {
        self.command(password)
            .args(args)
            .output()
            .expect("run vault")
    }

    fn init(&self) {
        let output = self.run(Some(PASSWORD), &["init", "--hint", "the long one"]);
        assert_success(&output);
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn add_item(env: &Env, title: &str) -> String {
    let output = env.run(
        Some(PASSWORD),
        &[
            "--quiet",
            "add",
            "--title",
            title,
            "--url",
            "https://bank.example",
            "--username",
            "alice",
            "--password",
            "correct horse",
        ],
    );
    assert_success(&output);
    stdout(&output).trim().to_string()
}

#[test]
fn test_init_creates_vault() {
    let env = Env::new();
    env.init();
    assert!(env.vault_path().exists());
}

#[test]
fn test_init_twice_fails() {
    let env = Env::new();
    env.init();
    let output = env.run(Some(PASSWORD), &["init"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_init_rejects_short_password() {
    let env = Env::new();
    let output = env.run(Some("short"), &["init"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_add_list_show() {
    let env = Env::new();
    env.init();
    let id = add_item(&env, "Bank");

    let output = env.run(Some(PASSWORD), &["list"]);
    assert_success(&output);
    let listing = stdout(&output);
    assert!(listing.contains(&id));
    assert!(listing.contains("Bank"));

    let output = env.run(Some(PASSWORD), &["show", &id]);
    assert_success(&output);
    let shown = stdout(&output);
    assert!(shown.contains("Title: Bank"));
    assert!(shown.contains("username: alice"));
    assert!(shown.contains("correct horse"));
    assert!(shown.contains("URL: https://bank.example"));
}

#[test]
fn test_wrong_password_fails() {
    let env = Env::new();
    env.init();

    let output = env.run(Some("not-the-password"), &["list"]);
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Incorrect password"));
}

#[test]
fn test_missing_vault_is_not_found() {
    let env = Env::new();
    let output = env.run(Some(PASSWORD), &["list"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_trash_hides_item() {
    let env = Env::new();
    env.init();
    let keep = add_item(&env, "Keep");
    let gone = add_item(&env, "Gone");

    let output = env.run(Some(PASSWORD), &["trash", &gone]);
    assert_success(&output);

    let visible = stdout(&env.run(Some(PASSWORD), &["list"]));
    assert!(visible.contains(&keep));
    assert!(!visible.contains(&gone));

    let all = stdout(&env.run(Some(PASSWORD), &["list", "--trashed"]));
    assert!(all.contains(&gone));
    assert!(all.contains("(trashed)"));
}

#[test]
fn test_hint_needs_no_password() {
    let env = Env::new();
    env.init();

    let output = env.run(None, &["hint"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "the long one");
}

#[test]
fn test_clear_requires_confirmation() {
    let env = Env::new();
    env.init();
    add_item(&env, "Bank");

    let output = env.run(None, &["clear"]);
    assert_eq!(output.status.code(), Some(4));

    let output = env.run(None, &["clear", "--yes"]);
    assert_success(&output);

    let output = env.run(Some(PASSWORD), &["list"]);
    assert_eq!(output.status.code(), Some(3));

    // The cleared vault can be initialized again.
    env.init();
    let output = env.run(Some(PASSWORD), &["list"]);
    assert_success(&output);
    assert!(stdout(&output).contains("No items found."));
}

#[test]
fn test_show_unknown_item() {
    let env = Env::new();
    env.init();
    let output = env.run(
        Some(PASSWORD),
        &["show", "00000000-0000-4000-8000-000000000000"],
    );
    assert_eq!(output.status.code(), Some(3));

    let output = env.run(Some(PASSWORD), &["show", "nope"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_config_file_supplies_vault_path() {
    let env = Env::new();
    let custom = env.dir.path().join("elsewhere.db");
    write_config(&env.config_home(), &custom);

    let output = env
        .command(Some(PASSWORD))
        .env_remove("VAULT_PATH")
        .args(["init"])
        .output()
        .expect("run vault");
    assert_success(&output);
    assert!(custom.exists());
    assert!(!env.vault_path().exists());
}

fn write_config(config_home: &Path, vault_path: &Path) {
    let config_path = config_home.join("vault").join("config.toml");
    let contents = format!(
        "[vault]\npath = \"{}\"\n\n[logging]\nfilter = \"vault=info\"\n",
        vault_path.to_string_lossy()
    );
    std::fs::create_dir_all(config_path.parent().expect("config parent"))
        .expect("create config dir");
    std::fs::write(&config_path, contents).expect("write config");
}
