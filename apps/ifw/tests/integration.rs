//! Integration tests for the ifw CLI

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::process::{Command, Output};

    fn ifw(home: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ifw"))
            .args(args)
            .env("HOME", home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute ifw")
    }

    #[test]
    fn test_cli_version() {
        let output = Command::new(env!("CARGO_BIN_EXE_ifw"))
            .arg("--version")
            .output()
            .expect("Failed to execute ifw");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("ifw"));
    }

    #[test]
    fn test_cli_help() {
        let output = Command::new(env!("CARGO_BIN_EXE_ifw"))
            .arg("--help")
            .output()
            .expect("Failed to execute ifw");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("install"));
        assert!(stdout.contains("uninstall"));
        assert!(stdout.contains("create-installer"));
        assert!(stdout.contains("recover"));
    }

    #[test]
    fn test_cli_invalid_command() {
        let output = Command::new(env!("CARGO_BIN_EXE_ifw"))
            .arg("invalid-command")
            .output()
            .expect("Failed to execute ifw");

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("unrecognized subcommand"));
    }

    #[test]
    fn test_install_requires_components() {
        let output = Command::new(env!("CARGO_BIN_EXE_ifw"))
            .arg("install")
            .output()
            .expect("Failed to execute ifw");

        assert!(!output.status.success());
    }

    #[test]
    fn test_invalid_fetch_policy() {
        let output = Command::new(env!("CARGO_BIN_EXE_ifw"))
            .args(["--fetch-policy", "some", "list"])
            .output()
            .expect("Failed to execute ifw");

        assert!(!output.status.success());
    }

    #[test]
    fn test_list_installed_json_on_empty_target() {
        let home = tempfile::tempdir().unwrap();
        let target = home.path().join("target");
        let output = ifw(
            home.path(),
            &[
                "--json",
                "--target-dir",
                target.to_str().unwrap(),
                "list",
                "--installed",
            ],
        );

        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["type"], "ComponentList");
        assert_eq!(value["data"], serde_json::json!([]));
    }

    #[test]
    fn test_recover_without_journal() {
        let home = tempfile::tempdir().unwrap();
        let target = home.path().join("target");
        let output = ifw(
            home.path(),
            &["--json", "--target-dir", target.to_str().unwrap(), "recover"],
        );

        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["type"], "Recovery");
        assert_eq!(value["data"]["recovered"], false);
    }

    #[test]
    fn test_inspect_plain_file_fails() {
        let home = tempfile::tempdir().unwrap();
        let file = home.path().join("plain.bin");
        std::fs::write(&file, b"no trailer here").unwrap();

        let output = ifw(home.path(), &["inspect", file.to_str().unwrap()]);
        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
    }
}
