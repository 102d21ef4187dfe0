//! Drives a workflow through the execution unit, one step at a time.
//!
//! The orchestrator owns the running context. Each step sees the context as
//! it stood after the last successful step; failed steps never advance
//! `last_output` or `last_agent`.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;
use serde::Serialize;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::context::LAST_AGENT;
use crate::context::LAST_OUTPUT;
use crate::executor::ExecutionResult;
use crate::executor::ExecutionUnit;
use crate::executor::HandoffSuggestion;
use crate::workflow::WorkflowDefinition;

#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern is valid"));

/// Replace each `{{key}}` with the context value for `key`.
///
/// Single left-to-right pass: substituted text is never rescanned, and
/// placeholders without a matching key are left as written.
pub fn substitute(template: &str, context: &ExecutionContext) -> String {
    let replaced: Cow<'_, str> = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        match context.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    });
    replaced.into_owned()
}

/// Cooperative stop signal, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// 1-based position in the workflow.
    pub index: usize,
    pub agent: String,
    pub required: bool,
    pub input: String,
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Effective context the agent ran with, as returned in its result.
    #[serde(skip_serializing_if = "ExecutionContext::is_empty")]
    pub context: ExecutionContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffSuggestion>,
}

impl StepResult {
    fn new(index: usize, agent: &str, required: bool, input: String, result: &ExecutionResult) -> Self {
        Self {
            index,
            agent: agent.to_string(),
            required,
            input,
            output: result.output.clone(),
            success: result.success,
            error: result.error.clone(),
            context: result.context.clone(),
            handoff: result.handoff.clone(),
        }
    }
}

/// A handoff that disagreed with the declared next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffWarning {
    pub step: usize,
    pub suggested: String,
    pub next: String,
}

impl std::fmt::Display for HandoffWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Warning: Handoff suggested {} but next step is {}",
            self.suggested, self.next
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowResult {
    pub workflow: String,
    pub run_id: Uuid,
    pub steps: Vec<StepResult>,
    pub success: bool,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub warnings: Vec<HandoffWarning>,
    pub context: ExecutionContext,
}

#[derive(Debug)]
pub struct Orchestrator {
    unit: ExecutionUnit,
    cancellation: CancellationFlag,
}

impl Orchestrator {
    pub fn new(unit: ExecutionUnit) -> Self {
        Self {
            unit,
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn unit(&self) -> &ExecutionUnit {
        &self.unit
    }

    pub fn run(&self, workflow: &WorkflowDefinition, initial: ExecutionContext) -> WorkflowResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow", name = %workflow.name, %run_id);
        let _guard = span.enter();

        let mut context = workflow.context.overlaid(&initial);
        let mut steps = Vec::with_capacity(workflow.steps.len());
        let mut warnings = Vec::new();
        let mut status = RunStatus::Completed;
        let mut error = String::new();

        info!(steps = workflow.steps.len(), "workflow started");

        for (position, step) in workflow.steps.iter().enumerate() {
            let index = position + 1;

            if self.cancellation.is_cancelled() {
                status = RunStatus::Cancelled;
                error = format!("Workflow cancelled before step {index}");
                warn!(step = index, "workflow cancelled");
                break;
            }

            let input = substitute(&step.input, &context);
            info!(step = index, agent = %step.agent, "step started");

            let overrides = match &step.context {
                Some(step_context) => context.overlaid(step_context),
                None => context.clone(),
            };
            let result = self.unit.execute(&step.agent, &input, &overrides);
            steps.push(StepResult::new(index, &step.agent, step.required, input, &result));

            if !result.success {
                info!(step = index, agent = %step.agent, error = %result.error, "step failed");
                if step.required {
                    status = RunStatus::Failed;
                    error = format!(
                        "Required step {index} ({}) failed: {}",
                        step.agent, result.error
                    );
                    break;
                }
                continue;
            }

            info!(step = index, agent = %step.agent, "step completed");
            // Step overrides apply to this invocation only.
            context.merge(&result.context.changes_from(&overrides));
            context.insert(LAST_OUTPUT, result.output.clone());
            context.insert(LAST_AGENT, step.agent.clone());

            let next = workflow.steps.get(index);
            if let (Some(handoff), Some(next)) = (&result.handoff, next) {
                if handoff.agent == next.agent {
                    continue;
                }
                let mismatch = HandoffWarning {
                    step: index,
                    suggested: handoff.agent.clone(),
                    next: next.agent.clone(),
                };
                warn!(step = index, "{mismatch}");
                warnings.push(mismatch);
            }
        }

        info!(?status, "workflow finished");

        WorkflowResult {
            workflow: workflow.name.clone(),
            run_id,
            steps,
            success: status == RunStatus::Completed,
            status,
            error,
            warnings,
            context,
        }
    }
}
