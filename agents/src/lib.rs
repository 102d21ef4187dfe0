//! Agent definition catalog, single-agent execution, and sequential workflow orchestration.

pub mod builtin;
mod catalog;
mod context;
mod error;
mod executor;
mod orchestrator;
mod parser;
mod spec;
pub mod workflow;

pub use catalog::AgentCatalog;
pub use catalog::DefinitionSource;
pub use catalog::DirectorySource;
pub use catalog::InstalledAgent;
pub use catalog::default_project_dir;
pub use catalog::is_valid_name;
pub use context::ContextValue;
pub use context::ExecutionContext;
pub use context::LAST_AGENT;
pub use context::LAST_OUTPUT;
pub use context::WORKING_DIR;
pub use error::AgentError;
pub use error::AgentResult;
pub use executor::ExecutionBackend;
pub use executor::ExecutionResult;
pub use executor::ExecutionUnit;
pub use executor::HandoffSuggestion;
pub use executor::SimulatedBackend;
pub use orchestrator::CancellationFlag;
pub use orchestrator::HandoffWarning;
pub use orchestrator::Orchestrator;
pub use orchestrator::RunStatus;
pub use orchestrator::StepResult;
pub use orchestrator::WorkflowResult;
pub use orchestrator::substitute;
pub use parser::derive_description;
pub use parser::parse_builtin;
pub use parser::parse_definition;
pub use spec::AgentDefinition;
pub use spec::ExecutionMode;
pub use spec::Scope;
pub use spec::ToolPermissions;
pub use workflow::WorkflowDefinition;
pub use workflow::WorkflowStep;
