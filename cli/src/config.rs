use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::ValueEnum;
use dirs::home_dir;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs;

pub const CONFIG_DIR_ENV: &str = "OPENCODE_CONFIG_DIR";
pub const LOG_LEVEL_ENV: &str = "OPENCODE_LOG_LEVEL";
const CONFIG_FILE: &str = "agents.yaml";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub output: OutputFormat,
    /// Directory searched for `<name>.yaml` custom workflows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflows_dir: Option<PathBuf>,

    // Runtime paths
    #[serde(skip)]
    pub config_dir: PathBuf,
    /// File this config was loaded from, or would be written to.
    #[serde(skip)]
    pub config_file: PathBuf,
    #[serde(skip)]
    pub user_agents_dir: PathBuf,
    #[serde(skip)]
    pub project_agents_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            output: OutputFormat::Text,
            workflows_dir: None,
            config_dir: PathBuf::new(),
            config_file: PathBuf::new(),
            user_agents_dir: PathBuf::new(),
            project_agents_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load `agents.yaml` from `config_path` or the config directory. A missing file yields defaults.
    pub async fn load(config_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let config_dir = Self::config_dir()?;
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir.join(CONFIG_FILE));

        let mut config = if fs::try_exists(&config_file).await.unwrap_or(false) {
            let contents = fs::read_to_string(&config_file)
                .await
                .with_context(|| format!("failed to read {}", config_file.display()))?;
            serde_yaml::from_str::<Config>(&contents)
                .with_context(|| format!("failed to parse {}", config_file.display()))?
        } else {
            Config::default()
        };

        config.user_agents_dir = config_dir.join("agent");
        config.project_agents_dir = opencode_agents::default_project_dir(project_root);
        config.config_dir = config_dir;
        config.config_file = config_file;
        config.merge_env_vars();
        Ok(config)
    }

    /// `$OPENCODE_CONFIG_DIR`, else `~/.config/opencode`.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let home = home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(".config").join("opencode"))
    }

    /// Write to [`Config::config_file`], creating its parent directory.
    pub async fn save(&self) -> Result<PathBuf> {
        let config_file = &self.config_file;
        if let Some(parent) = config_file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(config_file, yaml)
            .await
            .with_context(|| format!("failed to write {}", config_file.display()))?;
        Ok(config_file.clone())
    }

    fn merge_env_vars(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.is_empty() {
                self.log_level = level;
            }
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            issues.push(format!(
                "Unknown log level '{}', expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        if let Some(dir) = &self.workflows_dir {
            if !dir.is_dir() {
                issues.push(format!(
                    "Workflows directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        issues
    }

    pub fn workflow_file(&self, name: &str) -> Option<PathBuf> {
        let path = self.workflows_dir.as_ref()?.join(format!("{name}.yaml"));
        path.is_file().then_some(path)
    }
}
