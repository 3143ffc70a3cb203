use assert_cmd::Command;
use serde_json::Value;

fn formpilot() -> Command {
    let mut cmd = Command::cargo_bin("formpilot").unwrap();
    cmd.env_remove("RUST_LOG").env("FORMPILOT__LOGGING__LEVEL", "warn");
    cmd
}

#[test]
fn steps_lists_the_declared_plan() {
    let output = formpilot().arg("steps").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("https://www.freelance-market.test"));
    assert!(stdout.contains("account"));
    assert!(stdout.contains("terminal:location"));
    assert!(stdout.contains("terminal:submit"));
}

#[test]
fn steps_json_follows_the_configured_base_url() {
    let output = formpilot()
        .args(["steps", "--json"])
        .env("FORMPILOT__WIZARD__BASE_URL", "https://staging.market.test")
        .output()
        .unwrap();
    assert!(output.status.success());

    let steps: Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps = steps.as_array().unwrap();
    assert_eq!(steps.len(), 16);
    assert_eq!(steps[0]["name"], "account");
    assert_eq!(steps[0]["url"], "https://staging.market.test/nx/signup");
    assert_eq!(steps[15]["terminal"], "submit");
}

#[test]
fn unknown_user_fails_without_a_browser() {
    let dir = tempfile::tempdir().unwrap();
    let users = dir.path().join("users.json");
    std::fs::write(&users, r#"{"users": []}"#).unwrap();

    let output = formpilot()
        .args(["run", "--user", "ghost"])
        .env("FORMPILOT__PATHS__USERS", users.to_str().unwrap())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let outcome: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["status"], "soft_fail");
    assert_eq!(outcome["error_code"], "USER_NOT_FOUND");
}

#[test]
fn unknown_subcommand_is_rejected() {
    let output = formpilot().arg("serve").output().unwrap();
    assert!(!output.status.success());
}
