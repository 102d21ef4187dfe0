//! Bundled agent bodies and the fixed per-name defaults applied to them.

use crate::parser::parse_builtin;
use crate::spec::AgentDefinition;
use crate::spec::ExecutionMode;
use crate::spec::ToolPermissions;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuiltinDefaults {
    pub name: &'static str,
    pub primary: bool,
    pub temperature: f64,
    pub tools: &'static [(&'static str, bool)],
}

impl BuiltinDefaults {
    pub fn mode(&self) -> ExecutionMode {
        if self.primary {
            ExecutionMode::Primary
        } else {
            ExecutionMode::SubAgent
        }
    }

    pub fn tool_permissions(&self) -> ToolPermissions {
        self.tools
            .iter()
            .map(|(tool, enabled)| ((*tool).to_string(), *enabled))
            .collect()
    }
}

const READ_WRITE_BASH: &[(&str, bool)] = &[
    ("write", true),
    ("edit", true),
    ("bash", true),
    ("read", true),
];

const READ_ONLY_WEB: &[(&str, bool)] = &[
    ("write", false),
    ("edit", false),
    ("bash", false),
    ("read", true),
    ("webfetch", true),
];

const READ_WRITE: &[(&str, bool)] = &[
    ("write", true),
    ("edit", true),
    ("bash", false),
    ("read", true),
];

pub const DEFAULTS: &[BuiltinDefaults] = &[
    BuiltinDefaults {
        name: "implementer",
        primary: true,
        temperature: 0.3,
        tools: READ_WRITE_BASH,
    },
    BuiltinDefaults {
        name: "architect",
        primary: true,
        temperature: 0.2,
        tools: READ_ONLY_WEB,
    },
    BuiltinDefaults {
        name: "tester",
        primary: false,
        temperature: 0.2,
        tools: READ_WRITE_BASH,
    },
    BuiltinDefaults {
        name: "debugger",
        primary: false,
        temperature: 0.1,
        tools: READ_WRITE_BASH,
    },
    BuiltinDefaults {
        name: "reviewer",
        primary: false,
        temperature: 0.1,
        tools: &[
            ("write", false),
            ("edit", false),
            ("bash", false),
            ("read", true),
        ],
    },
    BuiltinDefaults {
        name: "refactorer",
        primary: false,
        temperature: 0.2,
        tools: READ_WRITE,
    },
    BuiltinDefaults {
        name: "documenter",
        primary: false,
        temperature: 0.3,
        tools: READ_WRITE,
    },
    BuiltinDefaults {
        name: "researcher",
        primary: false,
        temperature: 0.4,
        tools: READ_ONLY_WEB,
    },
];

/// Applied to any name missing from [`DEFAULTS`].
pub static FALLBACK: BuiltinDefaults = BuiltinDefaults {
    name: "",
    primary: false,
    temperature: 0.3,
    tools: &[("read", true)],
};

pub fn defaults_for(name: &str) -> &'static BuiltinDefaults {
    DEFAULTS
        .iter()
        .find(|defaults| defaults.name == name)
        .unwrap_or(&FALLBACK)
}

const BODIES: &[(&str, &str)] = &[
    ("architect", include_str!("../builtin/architect.md")),
    ("debugger", include_str!("../builtin/debugger.md")),
    ("documenter", include_str!("../builtin/documenter.md")),
    ("implementer", include_str!("../builtin/implementer.md")),
    ("refactorer", include_str!("../builtin/refactorer.md")),
    ("researcher", include_str!("../builtin/researcher.md")),
    ("reviewer", include_str!("../builtin/reviewer.md")),
    ("tester", include_str!("../builtin/tester.md")),
];

pub fn names() -> impl Iterator<Item = &'static str> {
    BODIES.iter().map(|(name, _)| *name)
}

pub fn get(name: &str) -> Option<AgentDefinition> {
    BODIES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(builtin, body)| parse_builtin(builtin, body))
}

pub fn all() -> Vec<AgentDefinition> {
    BODIES
        .iter()
        .map(|(name, body)| parse_builtin(name, body))
        .collect()
}
