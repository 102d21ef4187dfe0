use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::context::ExecutionContext;
use crate::error::AgentError;
use crate::error::AgentResult;

pub const NEW_FEATURE: &str = "new-feature";
pub const BUG_FIX: &str = "bug-fix";
pub const CODE_IMPROVEMENT: &str = "code-improvement";

/// Named, ordered sequence of agent invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    /// Initial values, applied underneath the caller's initial context.
    #[serde(default, skip_serializing_if = "ExecutionContext::is_empty")]
    pub context: ExecutionContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub agent: String,
    /// Template with `{{key}}` placeholders filled from the running context.
    pub input: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ExecutionContext>,
}

fn default_required() -> bool {
    true
}

impl WorkflowStep {
    pub fn required(agent: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            input: input.into(),
            required: true,
            context: None,
        }
    }

    pub fn optional(agent: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(agent, input)
        }
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            steps,
            context: ExecutionContext::new(),
        }
    }

    pub fn from_yaml_str(path: impl AsRef<Path>, contents: &str) -> AgentResult<Self> {
        serde_yaml::from_str(contents).map_err(|err| AgentError::workflow_file(path.as_ref(), err))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> AgentResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| AgentError::io(path, err))?;
        Self::from_yaml_str(path, &contents)
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.agent.as_str())
    }
}

/// Names of the bundled workflows, in display order.
pub fn builtin_names() -> [&'static str; 3] {
    [NEW_FEATURE, BUG_FIX, CODE_IMPROVEMENT]
}

pub fn builtin(name: &str) -> AgentResult<WorkflowDefinition> {
    match name {
        NEW_FEATURE => Ok(new_feature()),
        BUG_FIX => Ok(bug_fix()),
        CODE_IMPROVEMENT => Ok(code_improvement()),
        other => Err(AgentError::WorkflowNotFound(other.to_string())),
    }
}

pub fn builtins() -> Vec<WorkflowDefinition> {
    vec![new_feature(), bug_fix(), code_improvement()]
}

fn new_feature() -> WorkflowDefinition {
    WorkflowDefinition::new(
        NEW_FEATURE,
        "Complete new feature development from research to documentation",
        vec![
            WorkflowStep::required("researcher", "Research requirements for: {{feature_description}}"),
            WorkflowStep::required(
                "architect",
                "Design architecture for feature based on research: {{last_output}}",
            ),
            WorkflowStep::required(
                "implementer",
                "Implement the feature according to the architecture: {{last_output}}",
            ),
            WorkflowStep::required(
                "tester",
                "Create comprehensive tests for the implemented feature: {{last_output}}",
            ),
            WorkflowStep::required(
                "reviewer",
                "Review the implementation and tests for quality: {{last_output}}",
            ),
            WorkflowStep::optional(
                "documenter",
                "Create documentation for the completed feature: {{last_output}}",
            ),
        ],
    )
}

fn bug_fix() -> WorkflowDefinition {
    WorkflowDefinition::new(
        BUG_FIX,
        "Fix bugs from diagnosis to verification",
        vec![
            WorkflowStep::required("debugger", "Debug and diagnose the issue: {{bug_description}}"),
            WorkflowStep::required("implementer", "Implement fix for the diagnosed issue: {{last_output}}"),
            WorkflowStep::required("tester", "Create tests to verify the fix: {{last_output}}"),
            WorkflowStep::required("reviewer", "Review the fix and tests: {{last_output}}"),
        ],
    )
}

fn code_improvement() -> WorkflowDefinition {
    WorkflowDefinition::new(
        CODE_IMPROVEMENT,
        "Improve code quality through refactoring and optimization",
        vec![
            WorkflowStep::required(
                "refactorer",
                "Analyze and refactor the code for improvement: {{code_location}}",
            ),
            WorkflowStep::required("tester", "Ensure tests still pass after refactoring: {{last_output}}"),
            WorkflowStep::required("reviewer", "Review the refactored code: {{last_output}}"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_step_orders() {
        let agents = |name: &str| -> Vec<String> {
            builtin(name)
                .unwrap()
                .agents()
                .map(str::to_string)
                .collect()
        };
        assert_eq!(
            agents(NEW_FEATURE),
            vec!["researcher", "architect", "implementer", "tester", "reviewer", "documenter"]
        );
        assert_eq!(agents(BUG_FIX), vec!["debugger", "implementer", "tester", "reviewer"]);
        assert_eq!(agents(CODE_IMPROVEMENT), vec!["refactorer", "tester", "reviewer"]);
    }

    #[test]
    fn only_documentation_is_optional() {
        for workflow in builtins() {
            for step in &workflow.steps {
                assert_eq!(step.required, step.agent != "documenter", "{}", step.agent);
            }
        }
    }

    #[test]
    fn unknown_workflow_is_an_error() {
        let err = builtin("deploy").unwrap_err();
        assert!(matches!(err, AgentError::WorkflowNotFound(name) if name == "deploy"));
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let yaml = r#"
name: release
description: Cut a release
context:
  channel: stable
steps:
  - agent: tester
    input: "Run the suite for {{channel}}"
  - agent: documenter
    input: "Write notes: {{last_output}}"
    required: false
    context:
      audience: users
"#;
        let workflow = WorkflowDefinition::from_yaml_str("release.yaml", yaml).unwrap();
        assert_eq!(workflow.name, "release");
        assert_eq!(workflow.context.get_str("channel"), Some("stable"));
        assert_eq!(workflow.steps.len(), 2);
        assert!(workflow.steps[0].required);
        assert_eq!(workflow.steps[0].context, None);
        assert!(!workflow.steps[1].required);
        assert_eq!(
            workflow.steps[1]
                .context
                .as_ref()
                .and_then(|context| context.get_str("audience")),
            Some("users")
        );
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let err = WorkflowDefinition::from_yaml_str("broken.yaml", "steps: [").unwrap_err();
        assert!(matches!(err, AgentError::WorkflowFile { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }
}
