use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub debugger: DebuggerConfig,
    pub correlator: CorrelatorConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub session_log: SessionLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Trace to replay; rr picks the latest trace when unset
    pub trace_dir: Option<PathBuf>,
    /// Base directory for relative paths given to read_file
    pub source_root: Option<PathBuf>,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            program: "rr".to_string(),
            args: vec![
                "replay".to_string(),
                "-i=mi".to_string(),
                "--debugger-option=--interpreter=mi3".to_string(),
            ],
            trace_dir: None,
            source_root: None,
        }
    }
}

impl DebuggerConfig {
    /// Full argument list for the replay front-end
    pub fn command_line(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(dir) = &self.trace_dir {
            args.push(dir.display().to_string());
        }
        args
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    pub poll_interval_ms: u64,
    pub ready_timeout_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            ready_timeout_ms: 120_000,
            command_timeout_ms: 60_000,
        }
    }
}

impl CorrelatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    /// OpenAI Chat Completions, including Azure deployments
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// Environment variable holding the API key; provider default when unset
    pub api_key_env: Option<String>,
    /// Endpoint override (Azure resource URL, proxies)
    pub base_url: Option<String>,
    /// Azure `api-version` query parameter
    pub api_version: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            timeout_ms: 300000,
            api_key_env: None,
            base_url: None,
            api_version: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: u32,
    /// Replaces the built-in system prompt
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            system_prompt_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLogConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for SessionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("rrsleuth-session.log"),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.debugger.program, "rr");
        assert_eq!(config.correlator.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert!(config.session_log.enabled);
    }

    #[test]
    fn test_command_line_appends_trace_dir() {
        let mut debugger = DebuggerConfig::default();
        assert_eq!(debugger.command_line(), vec!["replay", "-i=mi", "--debugger-option=--interpreter=mi3"]);

        debugger.trace_dir = Some(PathBuf::from("/traces/graphd-0"));
        assert_eq!(debugger.command_line().last().map(String::as_str), Some("/traces/graphd-0"));
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rrsleuth.yml");
        std::fs::write(
            &path,
            "debugger:\n  trace_dir: /tmp/trace\ncorrelator:\n  poll_interval_ms: 50\nllm:\n  provider: openai\n  model: gpt-4o\nagent:\n  max_iterations: 4\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.debugger.trace_dir, Some(PathBuf::from("/tmp/trace")));
        assert_eq!(config.debugger.program, "rr");
        assert_eq!(config.correlator.poll_interval_ms, 50);
        assert_eq!(config.correlator.command_timeout_ms, 60_000);
        assert_eq!(config.llm.provider, Provider::OpenAi);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.agent.max_iterations, 4);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/rrsleuth.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "agent: [not, a, map").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
