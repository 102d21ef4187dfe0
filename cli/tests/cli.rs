use std::fs;
use std::path::Path;

use anyhow::Result;
use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

fn write_agent(dir: &Path, name: &str, contents: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(format!("{name}.md")), contents)?;
    Ok(())
}

fn agents_command(config_dir: &Path, cwd: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("opencode-agents")?;
    cmd.env("OPENCODE_CONFIG_DIR", config_dir);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("OPENCODE_LOG_LEVEL");
    cmd.current_dir(cwd);
    Ok(cmd)
}

fn stdout_json(output: &std::process::Output) -> Result<Value> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn list_shows_builtin_agents_and_workflows() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .arg("list")
        .assert()
        .success()
        .stdout(contains("architect"))
        .stdout(contains("documenter"))
        .stdout(contains("new-feature"))
        .stdout(contains("code-improvement"));
    Ok(())
}

#[test]
fn list_json_reports_counts() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    let output = agents_command(config_dir.path(), project_dir.path())?
        .args(["list", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let json = stdout_json(&output)?;
    assert_eq!(json["agents"].as_array().map(Vec::len), Some(8));
    assert_eq!(json["workflows"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[test]
fn show_prefers_project_definition_over_builtin() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["show", "reviewer"])
        .assert()
        .success()
        .stdout(contains("Scope: builtin"));

    write_agent(
        &project_dir.path().join(".opencode/agent"),
        "reviewer",
        "---\ndescription: Project reviewer\nmode: primary\ntemperature: 0.5\n---\nReview.",
    )?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["show", "reviewer"])
        .assert()
        .success()
        .stdout(contains("Scope: project"))
        .stdout(contains("Mode: primary"))
        .stdout(contains("Project reviewer"));
    Ok(())
}

#[test]
fn user_definitions_come_from_config_dir() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;
    write_agent(
        &config_dir.path().join("agent"),
        "translator",
        "---\ndescription: Translates text\nmode: subagent\n---\nTranslate.",
    )?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["show", "translator"])
        .assert()
        .success()
        .stdout(contains("Scope: user"));

    agents_command(config_dir.path(), project_dir.path())?
        .arg("installed")
        .assert()
        .success()
        .stdout(contains("translator"));
    Ok(())
}

#[test]
fn run_prints_output_and_handoff() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["run", "architect", "--input", "design a cache"])
        .assert()
        .success()
        .stdout(contains("Executed architect agent with input: design a cache"))
        .stdout(contains("Suggested next agent"))
        .stdout(contains("implementer"));
    Ok(())
}

#[test]
fn run_unknown_agent_fails() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["run", "ghost", "--input", "anything"])
        .assert()
        .failure()
        .stderr(contains("agent 'ghost' not found in any location"));
    Ok(())
}

#[test]
fn builtin_workflow_threads_context() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["workflow", "bug-fix", "--context", "bug_description=crash on save"])
        .assert()
        .success()
        .stdout(contains("Debug and diagnose the issue: crash on save"))
        .stdout(contains("Workflow completed"));
    Ok(())
}

#[test]
fn workflow_json_reports_steps() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    let output = agents_command(config_dir.path(), project_dir.path())?
        .args(["workflow", "new-feature", "--format", "json"])
        .args(["--context", "feature_description=dark mode"])
        .output()?;
    assert!(output.status.success());

    let json = stdout_json(&output)?;
    assert_eq!(json["success"], Value::Bool(true));
    assert_eq!(json["status"], Value::String("completed".to_string()));
    assert_eq!(json["steps"].as_array().map(Vec::len), Some(6));
    assert_eq!(json["warnings"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn required_failure_in_workflow_file_exits_non_zero() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;
    let workflow_file = project_dir.path().join("broken.yaml");
    fs::write(
        &workflow_file,
        "name: broken\nsteps:\n  - agent: researcher\n    input: look\n  - agent: missing\n    input: \"{{last_output}}\"\n  - agent: reviewer\n    input: never\n",
    )?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["workflow", "broken", "--file"])
        .arg(&workflow_file)
        .assert()
        .failure()
        .stderr(contains("Required step 2 (missing) failed"));
    Ok(())
}

#[test]
fn custom_workflow_from_workflows_dir() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;
    let workflows_dir = config_dir.path().join("workflows");
    fs::create_dir_all(&workflows_dir)?;
    fs::write(
        workflows_dir.join("review-only.yaml"),
        "name: review-only\ndescription: Just review\nsteps:\n  - agent: reviewer\n    input: \"Review {{target}}\"\n",
    )?;
    fs::write(
        config_dir.path().join("agents.yaml"),
        format!("workflows_dir: {}\n", workflows_dir.display()),
    )?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["workflow", "review-only", "--context", "target=src/lib.rs"])
        .assert()
        .success()
        .stdout(contains("Review src/lib.rs"));
    Ok(())
}

#[test]
fn unknown_workflow_fails() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .args(["workflow", "deploy"])
        .assert()
        .failure()
        .stderr(contains("workflow 'deploy' not found"));
    Ok(())
}

#[test]
fn init_writes_config_once() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;

    agents_command(config_dir.path(), project_dir.path())?
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Configuration created"));

    let written = fs::read_to_string(config_dir.path().join("agents.yaml"))?;
    assert_eq!(written, "log_level: warn\noutput: text\n");

    agents_command(config_dir.path(), project_dir.path())?
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("--force"));

    agents_command(config_dir.path(), project_dir.path())?
        .args(["init", "--force"])
        .assert()
        .success();
    Ok(())
}

#[test]
fn init_writes_to_the_config_path_given() -> Result<()> {
    let config_dir = TempDir::new()?;
    let project_dir = TempDir::new()?;
    let custom = config_dir.path().join("custom/agents-alt.yaml");

    agents_command(config_dir.path(), project_dir.path())?
        .arg("init")
        .arg("--config")
        .arg(&custom)
        .assert()
        .success()
        .stdout(contains("agents-alt.yaml"));

    assert_eq!(fs::read_to_string(&custom)?, "log_level: warn\noutput: text\n");
    assert!(!config_dir.path().join("agents.yaml").exists());

    agents_command(config_dir.path(), project_dir.path())?
        .arg("init")
        .arg("--config")
        .arg(&custom)
        .assert()
        .failure()
        .stderr(contains("--force"));
    Ok(())
}
