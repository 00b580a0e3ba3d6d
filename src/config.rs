use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::DEFAULT_BATCH_DELAY_MS;
use crate::domain::AllowedLabelSet;
use crate::error::{Result, TriageError};
use crate::llm::{ANTHROPIC_API_URL, AnthropicConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::retry::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY_MS, RetryPolicy};
use crate::session::DEFAULT_BREAK_SUGGESTIONS;
use crate::tracker::GITHUB_API_BASE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub github: GithubConfig,
    pub llm: LlmConfig,
    pub labels: LabelsConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub api_base: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            api_base: GITHUB_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub token_env: String,
    pub token_file: Option<PathBuf>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token_env: "GITHUB_TOKEN".to_string(),
            token_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub api_key_env: String,
    pub api_key_file: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: ANTHROPIC_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: 60000,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_key_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub allowed: Vec<String>,
    /// With an empty `allowed` list, apply whatever the model suggests
    pub allow_any: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub delay_ms: u64,
    /// Handlebars template; the built-in one is used when unset
    pub prompt_template: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_BATCH_DELAY_MS,
            prompt_template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub state_file: Option<PathBuf>,
    pub break_suggestions: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            break_suggestions: DEFAULT_BREAK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path);
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

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| TriageError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content)
            .map_err(|e| TriageError::Config(format!("{}: {}", path.display(), e)))?;

        log::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| TriageError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Owner and repository name, both required for tracker access
    pub fn repository_slug(&self) -> Result<(&str, &str)> {
        let owner = self.repository.owner.trim();
        let name = self.repository.name.trim();
        if owner.is_empty() || name.is_empty() {
            return Err(TriageError::Config(
                "repository.owner and repository.name must be set".to_string(),
            ));
        }
        Ok((owner, name))
    }

    pub fn github_token(&self) -> Result<String> {
        resolve_secret("GitHub token", &self.github.token_env, self.github.token_file.as_deref())
    }

    pub fn llm_api_key(&self) -> Result<String> {
        resolve_secret("LLM API key", &self.llm.api_key_env, self.llm.api_key_file.as_deref())
    }

    pub fn anthropic_config(&self) -> AnthropicConfig {
        AnthropicConfig {
            api_url: self.llm.api_url.clone(),
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_millis(self.llm.timeout_ms),
        }
    }

    pub fn allowed_labels(&self) -> AllowedLabelSet {
        AllowedLabelSet::from_config(&self.labels.allowed, self.labels.allow_any)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.attempts, Duration::from_millis(self.retry.base_delay_ms))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http.timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch.delay_ms)
    }

    /// Configured state file, else `<data_local_dir>/<project>/session.json`
    pub fn state_file(&self) -> PathBuf {
        self.session.state_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(env!("CARGO_PKG_NAME"))
                .join("session.json")
        })
    }
}

/// Environment variable first, then the file (trimmed). Missing is a Config error.
pub fn resolve_secret(what: &str, env_var: &str, file: Option<&Path>) -> Result<String> {
    resolve_secret_with(what, env_var, file, |name| std::env::var(name).ok())
}

fn resolve_secret_with<F>(what: &str, env_var: &str, file: Option<&Path>, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !env_var.is_empty()
        && let Some(value) = lookup(env_var)
    {
        let value = value.trim();
        if !value.is_empty() {
            log::debug!("{} read from ${}", what, env_var);
            return Ok(value.to_string());
        }
    }

    if let Some(path) = file {
        match fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => {
                log::debug!("{} read from {}", what, path.display());
                return Ok(contents.trim().to_string());
            }
            Ok(_) => log::warn!("{} file {} is empty", what, path.display()),
            Err(e) => log::warn!("Failed to read {} file {}: {}", what, path.display(), e),
        }
    }

    Err(TriageError::Config(format!(
        "{} not found: set ${} or configure a file",
        what, env_var
    )))
}
