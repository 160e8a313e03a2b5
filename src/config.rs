use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordination::DEFAULT_REFACTOR_KEYWORDS;
use crate::state::DEFAULT_STATE_PATH;

/// Programs `run_command` accepts when unsafe commands are not allowed
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "cargo", "rustc", "rustfmt", "npm", "npx", "node", "pnpm", "yarn", "python", "python3", "pytest", "go",
    "make", "ls", "cat", "head", "tail", "wc", "grep", "find", "echo", "git", "diff",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub coordination: CoordinationConfig,
    pub tools: ToolsConfig,
    pub state: StateConfig,
    pub refactor_keywords: Vec<String>,
    pub prompts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            timeout_ms: 300000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Pause between Verifier passes
    pub verify_interval_ms: u64,
    /// How often the Refactorer checks the trigger
    pub refactor_poll_ms: u64,
    /// Builder pass limit
    pub max_iterations: u32,
    /// Model turns allowed per role invocation
    pub max_turns: u32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            verify_interval_ms: 60000,
            refactor_poll_ms: 2000,
            max_iterations: 30,
            max_turns: 40,
        }
    }
}

impl CoordinationConfig {
    pub fn verify_interval(&self) -> Duration {
        Duration::from_millis(self.verify_interval_ms)
    }

    pub fn refactor_poll(&self) -> Duration {
        Duration::from_millis(self.refactor_poll_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub allow_unsafe_commands: bool,
    pub allowed_commands: Vec<String>,
    pub command_timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            allow_unsafe_commands: false,
            allowed_commands: DEFAULT_ALLOWED_COMMANDS.iter().map(|c| c.to_string()).collect(),
            command_timeout_ms: 120000,
            max_output_bytes: 30000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Snapshot location, relative to the workspace root
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl StateConfig {
    pub fn resolve(&self, workspace: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace.join(&self.path)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            coordination: CoordinationConfig::default(),
            tools: ToolsConfig::default(),
            state: StateConfig::default(),
            refactor_keywords: DEFAULT_REFACTOR_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            prompts_dir: None,
        }
    }
}

impl Config {
    /// Candidate config files, most specific first: the user config dir, then the current directory
    pub fn search_paths() -> Vec<PathBuf> {
        let file_name = concat!(env!("CARGO_PKG_NAME"), ".yml");
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(env!("CARGO_PKG_NAME")).join(file_name));
        }
        paths.push(PathBuf::from(file_name));
        paths
    }

    /// Load an explicit file, or the first readable file on the search path, or defaults.
    ///
    /// An explicit path must load. A broken file found by searching is skipped with a warning.
    pub fn load(explicit: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read_yaml(path).wrap_err_with(|| format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths().iter().filter(|p| p.exists()) {
            match Self::read_yaml(candidate) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Skipping config {}: {:#}", candidate.display(), e),
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn read_yaml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err("Failed to read config file")?;
        let config = serde_yaml::from_str(&content).wrap_err("Failed to parse config file")?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
