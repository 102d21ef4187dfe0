use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use tracing::warn;
use walkdir::WalkDir;

use crate::builtin;
use crate::error::AgentError;
use crate::error::AgentResult;
use crate::parser::parse_definition;
use crate::spec::AgentDefinition;
use crate::spec::Scope;

const AGENT_EXTENSION: &str = "md";

/// Read access to previously materialized definitions, keyed by scope.
pub trait DefinitionSource: Send + Sync {
    fn list_names(&self, scope: Scope) -> AgentResult<Vec<String>>;

    /// `Ok(None)` when the scope has no definition under `name`.
    fn read_raw(&self, scope: Scope, name: &str) -> AgentResult<Option<String>>;

    fn modified(&self, scope: Scope, name: &str) -> Option<DateTime<Utc>> {
        let _ = (scope, name);
        None
    }
}

/// Materialized definitions stored as `<dir>/<name>.md`, one directory per scope.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    user_dir: PathBuf,
    project_dir: PathBuf,
}

impl DirectorySource {
    pub fn new(user_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            project_dir: project_dir.into(),
        }
    }

    pub fn dir(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::User => Some(&self.user_dir),
            Scope::Project => Some(&self.project_dir),
            Scope::Builtin => None,
        }
    }

    /// `None` for scopes without a directory and for names that are not a single file stem.
    fn agent_path(&self, scope: Scope, name: &str) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }
        self.dir(scope)
            .map(|dir| dir.join(format!("{name}.{AGENT_EXTENSION}")))
    }
}

/// Names must stay inside the scope directory: no separators, no `.`/`..`, not empty.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

pub fn default_project_dir(project_root: &Path) -> PathBuf {
    project_root.join(".opencode").join("agent")
}

impl DefinitionSource for DirectorySource {
    fn list_names(&self, scope: Scope) -> AgentResult<Vec<String>> {
        let Some(dir) = self.dir(scope) else {
            return Ok(Vec::new());
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(dir).to_path_buf();
                AgentError::io(path, err.into())
            })?;
            if !entry.file_type().is_file() || !is_agent_file(entry.path()) {
                continue;
            }
            if let Some(stem) = entry.path().file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_raw(&self, scope: Scope, name: &str) -> AgentResult<Option<String>> {
        let Some(path) = self.agent_path(scope, name) else {
            return Ok(None);
        };
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AgentError::io(path, err)),
        }
    }

    fn modified(&self, scope: Scope, name: &str) -> Option<DateTime<Utc>> {
        let path = self.agent_path(scope, name)?;
        let modified = fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

fn is_agent_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == AGENT_EXTENSION)
        .unwrap_or(false)
}

/// A materialized definition as reported by [`AgentCatalog::list_installed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledAgent {
    pub name: String,
    pub scope: Scope,
    pub installed: Option<DateTime<Utc>>,
}

/// Resolves agent names across user, project, and built-in scopes.
pub struct AgentCatalog {
    source: Box<dyn DefinitionSource>,
}

impl std::fmt::Debug for AgentCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCatalog").finish_non_exhaustive()
    }
}

impl AgentCatalog {
    pub fn new(source: impl DefinitionSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    pub fn with_directories(user_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self::new(DirectorySource::new(user_dir, project_dir))
    }

    /// First scope holding the name supplies the whole definition: user, then project, then built-in.
    pub fn resolve(&self, name: &str) -> AgentResult<AgentDefinition> {
        if !is_valid_name(name) {
            debug!(agent = name, "rejecting agent name outside the scope directories");
            return Err(AgentError::DefinitionNotFound(name.to_string()));
        }
        for scope in Scope::MATERIALIZED {
            match self.source.read_raw(scope, name) {
                Ok(Some(raw)) => {
                    debug!(agent = name, %scope, "resolved materialized definition");
                    return Ok(parse_definition(name, &raw, scope));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(agent = name, %scope, error = %err, "skipping unreadable definition");
                }
            }
        }

        match builtin::get(name) {
            Some(definition) => {
                debug!(agent = name, "resolved built-in definition");
                Ok(definition)
            }
            None => Err(AgentError::DefinitionNotFound(name.to_string())),
        }
    }

    pub fn list_available(&self) -> Vec<AgentDefinition> {
        let mut agents = builtin::all();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    pub fn list_installed(&self) -> AgentResult<BTreeMap<Scope, Vec<InstalledAgent>>> {
        let mut installed = BTreeMap::new();
        for scope in Scope::MATERIALIZED {
            let agents = self
                .source
                .list_names(scope)?
                .into_iter()
                .map(|name| InstalledAgent {
                    installed: self.source.modified(scope, &name),
                    name,
                    scope,
                })
                .collect();
            installed.insert(scope, agents);
        }
        Ok(installed)
    }
}
