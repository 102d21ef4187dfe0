use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::catalog::AgentCatalog;
use crate::context::ExecutionContext;
use crate::context::WORKING_DIR;
use crate::error::AgentError;
use crate::spec::AgentDefinition;
use crate::spec::ExecutionMode;

/// Advisory pointer to the agent that should run next. Never followed automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffSuggestion {
    pub agent: String,
    pub reason: String,
    pub context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub context: ExecutionContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffSuggestion>,
}

impl ExecutionResult {
    pub fn succeeded(output: impl Into<String>, context: ExecutionContext) -> Self {
        Self {
            output: output.into(),
            success: true,
            error: String::new(),
            context,
            handoff: None,
        }
    }

    pub fn failed(error: impl Into<String>, context: ExecutionContext) -> Self {
        Self {
            output: String::new(),
            success: false,
            error: error.into(),
            context,
            handoff: None,
        }
    }

    pub fn with_handoff(mut self, handoff: Option<HandoffSuggestion>) -> Self {
        self.handoff = handoff;
        self
    }
}

/// Produces the outcome of running one resolved definition.
///
/// Only called for definitions whose mode is `Primary` or `SubAgent`.
pub trait ExecutionBackend: Send + Sync {
    fn execute(
        &self,
        definition: &AgentDefinition,
        input: &str,
        context: &ExecutionContext,
    ) -> ExecutionResult;
}

struct HandoffRule {
    from: &'static str,
    to: &'static str,
    reason: &'static str,
    marker: &'static str,
}

const HANDOFF_RULES: &[HandoffRule] = &[
    HandoffRule {
        from: "architect",
        to: "implementer",
        reason: "Architecture complete, ready for implementation",
        marker: "design",
    },
    HandoffRule {
        from: "implementer",
        to: "tester",
        reason: "Implementation complete, needs testing",
        marker: "implementation",
    },
];

/// Deterministic stand-in for a model call: describes what would run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedBackend;

impl SimulatedBackend {
    fn handoff_for(definition: &AgentDefinition) -> Option<HandoffSuggestion> {
        if definition.mode != ExecutionMode::Primary {
            return None;
        }
        HANDOFF_RULES
            .iter()
            .find(|rule| rule.from == definition.name)
            .map(|rule| HandoffSuggestion {
                agent: rule.to.to_string(),
                reason: rule.reason.to_string(),
                context: BTreeMap::from([(rule.marker.to_string(), "completed".to_string())]),
            })
    }
}

impl ExecutionBackend for SimulatedBackend {
    fn execute(
        &self,
        definition: &AgentDefinition,
        input: &str,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let kind = match definition.mode {
            ExecutionMode::Primary => "agent",
            _ => "subagent",
        };
        let tools = definition.enabled_tools();
        let tools = if tools.is_empty() {
            "none".to_string()
        } else {
            tools.join(", ")
        };
        let output = format!(
            "Executed {name} {kind} with input: {input}\nMode: {mode}, Temperature: {temperature:.1}\nAvailable tools: {tools}\n",
            name = definition.name,
            mode = definition.mode,
            temperature = definition.temperature,
        );

        ExecutionResult::succeeded(output, context.clone())
            .with_handoff(Self::handoff_for(definition))
    }
}

/// Runs a single agent by name: resolve, build the effective context, dispatch on mode.
pub struct ExecutionUnit {
    catalog: AgentCatalog,
    backend: Box<dyn ExecutionBackend>,
    ambient: ExecutionContext,
    working_dir: PathBuf,
}

impl std::fmt::Debug for ExecutionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionUnit")
            .field("catalog", &self.catalog)
            .field("ambient", &self.ambient)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}

impl ExecutionUnit {
    pub fn new(catalog: AgentCatalog, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            backend: Box::new(SimulatedBackend),
            ambient: ExecutionContext::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn with_backend(mut self, backend: impl ExecutionBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn with_ambient(mut self, ambient: ExecutionContext) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    /// Failures are reported in the result, never as `Err`.
    pub fn execute(
        &self,
        name: &str,
        input: &str,
        overrides: &ExecutionContext,
    ) -> ExecutionResult {
        let mut context = self.ambient.overlaid(overrides);
        context.insert(WORKING_DIR, self.working_dir.display().to_string());

        let definition = match self.catalog.resolve(name) {
            Ok(definition) => definition,
            Err(err) => {
                debug!(agent = name, error = %err, "agent resolution failed");
                return ExecutionResult::failed(format!("Failed to load agent: {err}"), context);
            }
        };

        match &definition.mode {
            ExecutionMode::Primary | ExecutionMode::SubAgent => {
                debug!(agent = name, mode = %definition.mode, scope = %definition.scope, "executing agent");
                self.backend.execute(&definition, input, &context)
            }
            ExecutionMode::Unrecognized(mode) => ExecutionResult::failed(
                AgentError::UnrecognizedMode(mode.clone()).to_string(),
                context,
            ),
        }
    }
}
