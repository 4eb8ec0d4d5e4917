use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const RECORD: &str = r#"{
    "name": "Weather Agent",
    "description": "Forecasts on demand",
    "endpoints": [{"type": "MCP", "value": "https://mcp.weather.example"}],
    "active": true
}"#;

fn run_cli(config_dir: &Path, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_agentdoc"))
        .arg("--config")
        .arg(config_dir.join("config.toml"))
        .args(args)
        .output()
        .expect("failed to execute agentdoc");
    if !output.status.success() {
        eprintln!(
            "agentdoc {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    output
}

#[test]
fn format_prints_canonical_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record = dir.path().join("agent.json");
    fs::write(&record, RECORD)?;

    let output = run_cli(dir.path(), &["format", record.to_str().unwrap()]);
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(doc["name"], "Weather Agent");
    assert_eq!(doc["endpoints"][0]["name"], "MCP");
    assert_eq!(doc["active"], true);
    assert!(doc.get("registrations").is_none());
    Ok(())
}

#[test]
fn annotations_need_a_chain() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record = dir.path().join("agent.json");
    fs::write(&record, RECORD)?;

    let output = run_cli(dir.path(), &["annotations", record.to_str().unwrap()]);
    assert!(!output.status.success());

    let output = run_cli(
        dir.path(),
        &["annotations", record.to_str().unwrap(), "--chain-id", "84532"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Chain-Id: 84532"));
    assert!(stdout.contains("Has-MCP: true"));
    Ok(())
}

#[test]
fn dry_run_upload_prints_uri_without_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record = dir.path().join("agent.json");
    fs::write(&record, RECORD)?;

    let output = run_cli(
        dir.path(),
        &["upload", record.to_str().unwrap(), "--backend", "ipfs", "--dry-run"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.trim_end().starts_with("ipfs://"));
    Ok(())
}

#[test]
fn upload_without_backends_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record = dir.path().join("agent.json");
    fs::write(&record, RECORD)?;

    let output = run_cli(dir.path(), &["upload", record.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no storage backend configured"));
    Ok(())
}

#[test]
fn load_of_empty_uri_is_not_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = run_cli(dir.path(), &["load", ""]);
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("no document"));
    Ok(())
}

#[test]
fn config_init_then_upload_fails_on_bad_ipfs_credential() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = run_cli(dir.path(), &["config", "init"]);
    assert!(output.status.success());
    assert!(dir.path().join("config.secretkey").exists());

    let config = dir.path().join("config.toml");
    let mut text = fs::read_to_string(&config)?;
    text.push_str("\n[ipfs]\nprovider = \"pinata\"\njwt = \"not-a-jwt\"\n");
    fs::write(&config, text)?;

    let record = dir.path().join("agent.json");
    fs::write(&record, RECORD)?;
    let output = run_cli(dir.path(), &["upload", record.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ipfs"));
    assert!(!stderr.contains("not-a-jwt"));
    Ok(())
}
