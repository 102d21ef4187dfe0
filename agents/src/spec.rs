use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Tool name to enabled flag. Tools never mentioned are absent rather than `false`.
pub type ToolPermissions = BTreeMap<String, bool>;

/// Resolution tier a definition was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Project,
    Builtin,
}

impl Scope {
    /// Scopes backed by materialized files, in resolution order.
    pub const MATERIALIZED: [Scope; 2] = [Scope::User, Scope::Project];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::User => write!(f, "user"),
            Scope::Project => write!(f, "project"),
            Scope::Builtin => write!(f, "builtin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Primary,
    #[serde(rename = "subagent")]
    SubAgent,
    /// A declared mode that is neither of the above; kept so execution can name it.
    #[serde(untagged)]
    Unrecognized(String),
}

impl ExecutionMode {
    /// Exact, case-sensitive match on the trimmed value.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "primary" => ExecutionMode::Primary,
            "subagent" => ExecutionMode::SubAgent,
            other => ExecutionMode::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExecutionMode::Primary => "primary",
            ExecutionMode::SubAgent => "subagent",
            ExecutionMode::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed role specification for a single agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub body: String,
    pub mode: ExecutionMode,
    pub temperature: f64,
    pub tools: ToolPermissions,
    pub scope: Scope,
}

impl AgentDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Names of the tools explicitly enabled, in name order.
    pub fn enabled_tools(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(tool, _)| tool.as_str())
            .collect()
    }

    /// Render the materialized file form: metadata block followed by the body.
    pub fn to_markdown(&self) -> String {
        let mut doc = String::from("---\n");
        doc.push_str(&format!("description: {}\n", self.description));
        doc.push_str(&format!("mode: {}\n", self.mode));
        doc.push_str(&format!("temperature: {:.1}\n", self.temperature));

        if self.tools.is_empty() {
            doc.push_str("tools: {}\n");
        } else {
            doc.push_str("tools:\n");
            for (tool, enabled) in &self.tools {
                doc.push_str(&format!("  {tool}: {enabled}\n"));
            }
        }

        doc.push_str("---\n\n");
        doc.push_str(&self.body);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_modes_exactly() {
        assert_eq!(ExecutionMode::parse("primary"), ExecutionMode::Primary);
        assert_eq!(ExecutionMode::parse(" subagent "), ExecutionMode::SubAgent);
        assert_eq!(
            ExecutionMode::parse("all"),
            ExecutionMode::Unrecognized("all".to_string())
        );
        assert_eq!(
            ExecutionMode::parse("Primary"),
            ExecutionMode::Unrecognized("Primary".to_string())
        );
        assert_eq!(
            ExecutionMode::parse("SUBAGENT"),
            ExecutionMode::Unrecognized("SUBAGENT".to_string())
        );
    }

    #[test]
    fn enabled_tools_skip_disabled_entries() {
        let definition = AgentDefinition {
            name: "architect".to_string(),
            description: "Designs things".to_string(),
            body: String::new(),
            mode: ExecutionMode::Primary,
            temperature: 0.2,
            tools: [("read", true), ("write", false), ("webfetch", true)]
                .into_iter()
                .map(|(tool, enabled)| (tool.to_string(), enabled))
                .collect(),
            scope: Scope::Builtin,
        };
        assert_eq!(definition.enabled_tools(), vec!["read", "webfetch"]);
    }
}
