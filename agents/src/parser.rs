use crate::builtin;
use crate::spec::AgentDefinition;
use crate::spec::ExecutionMode;
use crate::spec::Scope;
use crate::spec::ToolPermissions;

const FRONTMATTER_DELIM: &str = "---";
const ROLE_HEADING: &str = "## Role";
const SECTION_PREFIX: &str = "## ";
const DEFAULT_DESCRIPTION: &str = "Agent for software development tasks";
const DESCRIPTION_LIMIT: usize = 100;
const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Parse a materialized definition: an optional metadata block followed by the body.
pub fn parse_definition(name: &str, raw: &str, scope: Scope) -> AgentDefinition {
    let contents = raw.trim_start_matches('\u{feff}');

    match split_frontmatter(contents) {
        Some((frontmatter, body)) => {
            let metadata = Metadata::parse(&frontmatter);
            let description = metadata
                .description
                .filter(|description| !description.is_empty())
                .unwrap_or_else(|| derive_description(&body));
            AgentDefinition {
                name: name.to_string(),
                description,
                body,
                mode: metadata.mode,
                temperature: metadata.temperature,
                tools: metadata.tools,
                scope,
            }
        }
        None => AgentDefinition {
            name: name.to_string(),
            description: derive_description(contents),
            body: contents.to_string(),
            mode: ExecutionMode::SubAgent,
            temperature: DEFAULT_TEMPERATURE,
            tools: ToolPermissions::new(),
            scope,
        },
    }
}

/// Parse a bundled definition. Mode, temperature, and tools come from the
/// per-name defaults table, never from the text.
pub fn parse_builtin(name: &str, body: &str) -> AgentDefinition {
    let defaults = builtin::defaults_for(name);
    AgentDefinition {
        name: name.to_string(),
        description: derive_description(body),
        body: body.to_string(),
        mode: defaults.mode(),
        temperature: defaults.temperature,
        tools: defaults.tool_permissions(),
        scope: Scope::Builtin,
    }
}

/// Collect the `## Role` section into a single line, capped at 100 characters.
pub fn derive_description(body: &str) -> String {
    let mut in_role = false;
    let mut parts: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.starts_with(ROLE_HEADING) {
            in_role = true;
            continue;
        }
        if in_role && line.starts_with(SECTION_PREFIX) {
            break;
        }
        if in_role {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }

    if parts.is_empty() {
        return DEFAULT_DESCRIPTION.to_string();
    }

    let joined = parts.join(" ");
    if joined.chars().count() > DESCRIPTION_LIMIT {
        let head: String = joined.chars().take(DESCRIPTION_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        joined
    }
}

#[derive(Debug)]
struct Metadata {
    description: Option<String>,
    mode: ExecutionMode,
    temperature: f64,
    tools: ToolPermissions,
}

impl Metadata {
    fn parse(frontmatter: &[&str]) -> Self {
        let mut metadata = Metadata {
            description: None,
            mode: ExecutionMode::Unrecognized(String::new()),
            temperature: 0.0,
            tools: ToolPermissions::new(),
        };

        for line in frontmatter {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(value) = line.strip_prefix("description:") {
                metadata.description = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("mode:") {
                metadata.mode = ExecutionMode::parse(value);
            } else if let Some(value) = line.strip_prefix("temperature:") {
                metadata.temperature = value.trim().parse().unwrap_or(0.0);
            } else if line.starts_with("tools:") {
                // Per-tool entries are not interpreted; the key only grants read access.
                metadata.tools.insert("read".to_string(), true);
            }
        }

        metadata
    }
}

/// Split on the opening delimiter line and the next delimiter line.
fn split_frontmatter(contents: &str) -> Option<(Vec<&str>, String)> {
    let lines: Vec<&str> = contents.split('\n').collect();
    let is_delim = |line: &&str| line.trim_end_matches('\r') == FRONTMATTER_DELIM;

    if !lines.first().is_some_and(is_delim) {
        return None;
    }

    let closing = lines.iter().skip(1).position(is_delim)? + 1;
    let frontmatter = lines[1..closing].to_vec();
    let body = lines[closing + 1..].join("\n");
    Some((frontmatter, body))
}
