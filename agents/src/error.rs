use std::path::PathBuf;

use thiserror::Error;

pub type AgentResult<T, E = AgentError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent '{0}' not found in any location")]
    DefinitionNotFound(String),

    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("Unknown agent mode: {0}")]
    UnrecognizedMode(String),

    #[error("I/O error while reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow {path:?}: {source}")]
    WorkflowFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AgentError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn workflow_file(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::WorkflowFile {
            path: path.into(),
            source,
        }
    }
}
