use std::path::Path;

use anyhow::Result;
use anyhow::anyhow;
use colored::*;
use opencode_agents::AgentCatalog;
use opencode_agents::AgentDefinition;
use opencode_agents::CancellationFlag;
use opencode_agents::ExecutionContext;
use opencode_agents::ExecutionMode;
use opencode_agents::ExecutionResult;
use opencode_agents::ExecutionUnit;
use opencode_agents::Orchestrator;
use opencode_agents::RunStatus;
use opencode_agents::Scope;
use opencode_agents::WorkflowDefinition;
use opencode_agents::WorkflowResult;
use opencode_agents::workflow;
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::config::OutputFormat;

/// clap value parser for `key=value` pairs.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn catalog(config: &Config) -> AgentCatalog {
    AgentCatalog::with_directories(&config.user_agents_dir, &config.project_agents_dir)
}

fn unit(config: &Config, project_root: &Path) -> ExecutionUnit {
    ExecutionUnit::new(catalog(config), project_root)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// List built-in agents and workflows
pub async fn list_agents(config: &Config, format: OutputFormat) -> Result<()> {
    let agents = catalog(config).list_available();
    let workflows = workflow::builtins();

    match format {
        OutputFormat::Json => {
            let output = json!({
                "agents": agents.iter().map(|agent| {
                    json!({
                        "name": agent.name,
                        "description": agent.description,
                        "mode": agent.mode,
                        "temperature": agent.temperature,
                        "tools": agent.enabled_tools(),
                    })
                }).collect::<Vec<_>>(),
                "workflows": workflows.iter().map(|workflow| {
                    json!({
                        "name": workflow.name,
                        "description": workflow.description,
                        "steps": workflow.agents().collect::<Vec<_>>(),
                    })
                }).collect::<Vec<_>>(),
            });
            print_json(&output)?;
        }
        OutputFormat::Text => {
            println!("{}\n", "📋 Available Agents:".blue().bold());
            for agent in &agents {
                print_agent_info(agent);
            }

            println!("{}\n", "🔁 Workflows:".blue().bold());
            for workflow in &workflows {
                println!("  {} {}", "▸".blue(), workflow.name.cyan());
                println!("      {}", workflow.description.bright_black());
                println!(
                    "      {}: {}",
                    "Steps".blue(),
                    workflow.agents().collect::<Vec<_>>().join(" → ")
                );
                println!();
            }

            println!("{}", "💡 Usage:".blue());
            println!("   {}", "opencode-agents run <agent> --input <task>".cyan());
            println!("   {}", "opencode-agents workflow <name> --context key=value".cyan());
        }
    }

    Ok(())
}

fn print_agent_info(agent: &AgentDefinition) {
    let prefix = match agent.scope {
        Scope::Builtin => "  📦",
        Scope::Project => "  📁",
        Scope::User => "  👤",
    };
    let mode = match agent.mode {
        ExecutionMode::Primary => agent.mode.to_string().green(),
        _ => agent.mode.to_string().normal(),
    };

    println!("{} {} ({})", prefix, agent.name.cyan(), mode);
    println!("      {}", agent.description.bright_black());

    let tools = agent.enabled_tools();
    if !tools.is_empty() {
        println!("      {}: {}", "Tools".blue(), tools.join(", "));
    }
    println!("      {}: {:.1}", "Temperature".blue(), agent.temperature);
    println!();
}

/// Show the definition a name resolves to
pub async fn show_agent(config: &Config, name: &str, format: OutputFormat) -> Result<()> {
    let definition = catalog(config).resolve(name)?;

    match format {
        OutputFormat::Json => print_json(&definition)?,
        OutputFormat::Text => {
            println!("{} {}", "🤖 Agent:".blue().bold(), definition.name.cyan());
            println!("   Scope: {}", definition.scope.to_string().bright_black());
            println!("   Mode: {}", definition.mode);
            println!("   Temperature: {:.1}", definition.temperature);
            let tools: Vec<String> = definition
                .tools
                .iter()
                .map(|(tool, enabled)| format!("{tool}={enabled}"))
                .collect();
            println!(
                "   Tools: {}",
                if tools.is_empty() {
                    "none".to_string()
                } else {
                    tools.join(", ")
                }
            );
            println!("   Description: {}", definition.description.bright_black());
        }
    }

    Ok(())
}

/// List materialized definitions in the user and project scopes
pub async fn list_installed(config: &Config, format: OutputFormat) -> Result<()> {
    let installed = catalog(config).list_installed()?;

    if format == OutputFormat::Json {
        return print_json(&installed);
    }

    for (scope, agents) in &installed {
        let dir = match scope {
            Scope::User => &config.user_agents_dir,
            _ => &config.project_agents_dir,
        };
        println!(
            "{} {}",
            format!("{scope} agents").blue().bold(),
            dir.display().to_string().bright_black()
        );
        if agents.is_empty() {
            println!("   {}", "none installed".yellow());
        }
        for agent in agents {
            let installed_at = agent
                .installed
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("   {} {}", agent.name.cyan(), installed_at.bright_black());
        }
        println!();
    }

    Ok(())
}

fn context_from_pairs(pairs: Vec<(String, String)>) -> ExecutionContext {
    pairs.into_iter().collect()
}

/// Run a single agent
pub async fn run_agent(
    config: &Config,
    project_root: &Path,
    agent: &str,
    input: &str,
    context: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<()> {
    let overrides = context_from_pairs(context);
    let result = unit(config, project_root).execute(agent, input, &overrides);

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_execution(agent, &result),
    }

    if result.success {
        Ok(())
    } else {
        Err(anyhow!("Agent '{agent}' failed: {}", result.error))
    }
}

fn print_execution(agent: &str, result: &ExecutionResult) {
    if !result.success {
        eprintln!("{} {}", "❌ Agent failed:".red(), result.error);
        return;
    }

    println!("{} {}\n", "✅ Agent completed:".green(), agent.cyan());
    println!("{}", result.output.trim_end());

    if let Some(handoff) = &result.handoff {
        println!();
        println!(
            "{} {} ({})",
            "➡️ Suggested next agent:".blue(),
            handoff.agent.cyan(),
            handoff.reason.bright_black()
        );
    }
}

async fn load_workflow(
    config: &Config,
    name: &str,
    file: Option<&Path>,
) -> Result<WorkflowDefinition> {
    if let Some(path) = file {
        return Ok(WorkflowDefinition::from_yaml_file(path)?);
    }
    if let Some(path) = config.workflow_file(name) {
        info!(workflow = name, path = %path.display(), "loading custom workflow");
        return Ok(WorkflowDefinition::from_yaml_file(path)?);
    }
    Ok(workflow::builtin(name)?)
}

/// Run a workflow on a blocking task; Ctrl-C stops it before the next step.
pub async fn run_workflow(
    config: &Config,
    project_root: &Path,
    name: &str,
    file: Option<&Path>,
    context: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<()> {
    let definition = load_workflow(config, name, file).await?;
    let initial = context_from_pairs(context);

    let cancellation = CancellationFlag::new();
    let orchestrator =
        Orchestrator::new(unit(config, project_root)).with_cancellation(cancellation.clone());

    if format == OutputFormat::Text {
        println!(
            "{} {} ({} steps)\n",
            "🚀 Running workflow:".blue(),
            definition.name.cyan(),
            definition.steps.len()
        );
    }

    let mut handle = tokio::task::spawn_blocking(move || orchestrator.run(&definition, initial));
    let result = tokio::select! {
        joined = &mut handle => joined?,
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
            handle.await?
        }
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_workflow(&result),
    }

    if result.success {
        Ok(())
    } else {
        Err(anyhow!("{}", result.error))
    }
}

fn print_workflow(result: &WorkflowResult) {
    for step in &result.steps {
        let marker = match (step.success, step.required) {
            (true, _) => "✅".green(),
            (false, true) => "❌".red(),
            (false, false) => "⚠️".yellow(),
        };
        println!("{} Step {}: {}", marker, step.index, step.agent.cyan());
        if step.success {
            for line in step.output.lines() {
                println!("      {}", line.bright_black());
            }
        } else {
            println!("      {}", step.error.red());
        }
    }

    for warning in &result.warnings {
        println!("{} {}", "⚠️".yellow(), warning.to_string().yellow());
    }

    println!();
    match result.status {
        RunStatus::Completed => println!(
            "{} {} ({})",
            "🎉 Workflow completed:".green().bold(),
            result.workflow,
            result.run_id.to_string().bright_black()
        ),
        RunStatus::Failed => eprintln!("{} {}", "❌ Workflow failed:".red().bold(), result.error),
        RunStatus::Cancelled => eprintln!("{} {}", "⏹ Workflow cancelled:".yellow().bold(), result.error),
    }
}

/// Write the configuration file
pub async fn initialize_config(config: &Config, force: bool) -> Result<()> {
    if config.config_file.exists() && !force {
        return Err(anyhow!("Configuration already exists. Use --force to overwrite."));
    }

    println!("{}", "🔧 Initializing configuration...".blue());

    let written = config.save().await?;

    println!("{} {}", "✅ Configuration created:".green(), written.display().to_string().bright_black());
    println!("   User agents: {}", config.user_agents_dir.display().to_string().bright_black());
    println!("   Project agents: {}", config.project_agents_dir.display().to_string().bright_black());

    let issues = config.validate();
    if !issues.is_empty() {
        println!("{}", "⚠️ Issues found:".yellow());
        for issue in issues {
            println!("   - {}", issue.yellow());
        }
    }

    println!();
    println!("{}", "🚀 Ready to use! Try:".blue());
    println!("   {}", "opencode-agents list".cyan());
    println!("   {}", "opencode-agents workflow bug-fix --context bug_description=\"...\"".cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_key_value_pairs() {
        assert_eq!(
            parse_key_value("feature_description=add login"),
            Ok(("feature_description".to_string(), "add login".to_string()))
        );
        assert_eq!(
            parse_key_value("expr=a=b"),
            Ok(("expr".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_key_value("key="), Ok(("key".to_string(), String::new())));
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn later_pairs_win() {
        let context = context_from_pairs(vec![
            ("env".to_string(), "dev".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);
        assert_eq!(context.get_str("env"), Some("prod"));
    }
}
