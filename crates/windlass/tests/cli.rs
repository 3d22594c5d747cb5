use std::io::Write as _;
use std::process::{Command, Stdio};

use eyre::Context as _;
use eyre::ContextCompat as _;

#[test]
fn doctor_json_runs_and_returns_valid_json() -> eyre::Result<()> {
    let exe = assert_cmd::cargo::cargo_bin!("windlass");
    let cfg_dir = tempfile::tempdir()?;

    let out = Command::new(exe)
        .env("WINDLASS_CONFIG_DIR", cfg_dir.path())
        .env_remove("WINDLASS_PRIVATE_KEY")
        .args(["doctor", "--json"])
        .output()
        .context("run windlass doctor --json")?;

    assert!(
        out.status.success(),
        "doctor exited non-zero: status={:?}, stderr={}",
        out.status.code(),
        String::from_utf8_lossy(&out.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).context("parse doctor json")?;
    assert_eq!(v.get("ok").and_then(serde_json::Value::as_bool), Some(true));
    assert!(v.get("version").and_then(|x| x.as_str()).is_some());
    assert!(v.get("paths").and_then(|x| x.as_object()).is_some());
    assert_eq!(
        v.pointer("/credentials/private_key_configured")
            .and_then(serde_json::Value::as_bool),
        Some(false)
    );
    Ok(())
}

#[test]
fn tools_lists_all_descriptors() -> eyre::Result<()> {
    let exe = assert_cmd::cargo::cargo_bin!("windlass");
    let cfg_dir = tempfile::tempdir()?;

    let out = Command::new(exe)
        .env("WINDLASS_CONFIG_DIR", cfg_dir.path())
        .arg("tools")
        .output()
        .context("run windlass tools")?;

    assert!(out.status.success(), "tools exited non-zero");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).context("parse tools json")?;
    let tools = v
        .get("tools")
        .and_then(serde_json::Value::as_array)
        .context("missing tools array")?;
    assert_eq!(tools.len(), 12);
    for t in tools {
        assert!(t.get("name").and_then(|x| x.as_str()).is_some());
        assert!(t.get("inputSchema").is_some());
    }
    Ok(())
}

fn run_mcp_session(requests: &[&str], extra_env: &[(&str, &str)]) -> eyre::Result<Vec<serde_json::Value>> {
    let exe = assert_cmd::cargo::cargo_bin!("windlass");
    let cfg_dir = tempfile::tempdir()?;

    let mut cmd = Command::new(exe);
    cmd.env("WINDLASS_CONFIG_DIR", cfg_dir.path())
        .env_remove("WINDLASS_PRIVATE_KEY")
        .arg("mcp")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (k, v) in extra_env {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().context("spawn windlass mcp")?;

    {
        let mut stdin = child.stdin.take().context("child stdin")?;
        for r in requests {
            writeln!(stdin, "{r}").context("write request")?;
        }
        // Dropping stdin closes the pipe; the server exits at EOF.
    }

    let out = child.wait_with_output().context("wait for windlass mcp")?;
    assert!(
        out.status.success(),
        "mcp exited non-zero: stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let mut frames = vec![];
    for line in String::from_utf8_lossy(&out.stdout).lines() {
        if line.trim().is_empty() {
            continue;
        }
        frames.push(serde_json::from_str(line).context("parse response frame")?);
    }
    Ok(frames)
}

#[test]
fn mcp_initialize_and_list_tools_over_stdio() -> eyre::Result<()> {
    let frames = run_mcp_session(
        &[
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ],
        &[],
    )?;

    // Two responses: initialize and tools/list; the notification is silent.
    assert_eq!(frames.len(), 2);
    assert_eq!(
        frames[0].pointer("/result/serverInfo/name").and_then(|v| v.as_str()),
        Some("windlass")
    );
    let tools = frames[1]
        .pointer("/result/tools")
        .and_then(serde_json::Value::as_array)
        .context("missing tools")?;
    assert_eq!(tools.len(), 12);
    Ok(())
}

#[test]
fn mcp_tool_call_without_credential_reports_missing_credential() -> eyre::Result<()> {
    let frames = run_mcp_session(
        &[r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_balance","arguments":{}}}"#],
        &[],
    )?;

    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0].pointer("/result/isError").and_then(serde_json::Value::as_bool),
        Some(true)
    );
    let text = frames[0]
        .pointer("/result/content/0/text")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert!(text.contains("missing_credential"), "got: {text}");
    Ok(())
}

#[test]
fn mcp_refuses_to_start_with_invalid_private_key() -> eyre::Result<()> {
    let exe = assert_cmd::cargo::cargo_bin!("windlass");
    let cfg_dir = tempfile::tempdir()?;

    let mut child = Command::new(exe)
        .env("WINDLASS_CONFIG_DIR", cfg_dir.path())
        .env("WINDLASS_PRIVATE_KEY", "definitely-not-base58-0OIl")
        .arg("mcp")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn windlass mcp")?;
    drop(child.stdin.take());
    let out = child.wait_with_output().context("wait for windlass mcp")?;

    assert!(
        !out.status.success(),
        "an undecodable credential must fail at startup"
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("credential"),
        "stderr should name the credential failure: {stderr}"
    );
    Ok(())
}
