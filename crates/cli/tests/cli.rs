use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("reservation").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("RESERVATION_CONFIG_DIR", std::env::temp_dir().join("reservation-cli-no-config"))
        .env("RESERVATION_ENV", "local");
    cmd
}

#[test]
fn config_prints_effective_settings() {
    let output = cli().arg("config").output().unwrap();
    assert!(output.status.success());

    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["message"], "Hello default");
    assert_eq!(settings["gateway"]["server"]["port"], 8080);
    assert_eq!(settings["service"]["server"]["port"], 8000);
    assert_eq!(settings["gateway"]["call_timeout_ms"], 1000);
}

#[test]
fn config_honours_env_overrides() {
    let output = cli()
        .env("RESERVATION_MESSAGE", "Hello from env")
        .arg("config")
        .output()
        .unwrap();
    assert!(output.status.success());

    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["message"], "Hello from env");
}

#[test]
fn unknown_environment_fails() {
    cli().args(["--env", "moon", "config"]).assert().failure();
}
