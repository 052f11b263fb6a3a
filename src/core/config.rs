//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.parley/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::inference::memory::DEFAULT_MAX_CACHED_CHATS;
use crate::inference::providers::gemini::DEFAULT_GEMINI_BASE_URL;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub model: Option<String>,
    pub image_model: Option<String>,
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<String>,
    pub max_cached_chats: Option<usize>,
    pub data_dir: Option<String>,
    pub downloads_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
    Answer questions directly and format code in fenced blocks with a language tag.";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub model: String,
    pub image_model: String,
    pub system_prompt: String,
    pub max_cached_chats: usize,
    pub api_key: Option<String>,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub downloads_dir: PathBuf,
    /// Keep sessions in memory only.
    pub ephemeral: bool,
}

/// Values given on the command line. `None` = not specified.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub image_model: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub ephemeral: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.parley`.
pub fn parley_home() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".parley"))
}

/// Directory for `parley.log`. Chosen before the config file is read, so
/// loading the config is itself logged: `--data-dir` if given, else
/// `~/.parley`.
pub fn log_dir(cli_data_dir: Option<&Path>) -> PathBuf {
    cli_data_dir
        .map(Path::to_path_buf)
        .or_else(parley_home)
        .unwrap_or_else(|| PathBuf::from(".parley"))
}

/// Returns the path to `~/.parley/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    parley_home().map(|p| p.join("config.toml"))
}

/// Load config from `~/.parley/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ParleyConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ParleyConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(ParleyConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<ParleyConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(ParleyConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ParleyConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config general section: {:?}", config.general);
    Ok(config)
}

const DEFAULT_CONFIG_FILE: &str = r#"# Parley Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# model = "gemini-2.5-flash"                # Or set PARLEY_MODEL env var
# image_model = "imagen-3.0-generate-002"   # Or set PARLEY_IMAGE_MODEL env var
# system_prompt = "You are a helpful assistant."
# system_prompt_file = "system.md"          # Path relative to ~/.parley/
# max_cached_chats = 32                     # Sessions kept in conversational memory
# data_dir = "~/.parley"                    # Where chatSessions.json and parley.log live
# downloads_dir = "~/Downloads"             # Where saved snippets and images go

# [gemini]
# api_key = "..."                           # Or set GEMINI_API_KEY env var
# base_url = "https://generativelanguage.googleapis.com/v1beta"
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_FILE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &ParleyConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading environment variables through `env`.
pub fn resolve_with_env(
    config: &ParleyConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Model: CLI → env → config → default
    let model = cli
        .model
        .clone()
        .or_else(|| env("PARLEY_MODEL"))
        .or_else(|| config.general.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let image_model = cli
        .image_model
        .clone()
        .or_else(|| env("PARLEY_IMAGE_MODEL"))
        .or_else(|| config.general.image_model.clone())
        .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());

    // API key: env (GEMINI_API_KEY, then API_KEY) → config
    let api_key = env("GEMINI_API_KEY")
        .or_else(|| env("API_KEY"))
        .or_else(|| config.gemini.api_key.clone())
        .filter(|k| !k.trim().is_empty());

    let base_url = env("GEMINI_BASE_URL")
        .or_else(|| config.gemini.base_url.clone())
        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());

    let home = parley_home().unwrap_or_else(|| PathBuf::from(".parley"));
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.general.data_dir.as_deref().map(expand_home))
        .unwrap_or_else(|| home.clone());

    let downloads_dir = config
        .general
        .downloads_dir
        .as_deref()
        .map(expand_home)
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    ResolvedConfig {
        model,
        image_model,
        system_prompt: resolve_system_prompt(config, &home),
        max_cached_chats: config
            .general
            .max_cached_chats
            .unwrap_or(DEFAULT_MAX_CACHED_CHATS),
        api_key,
        base_url,
        data_dir,
        downloads_dir,
        ephemeral: cli.ephemeral,
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Resolves the system prompt: inline wins over file, both win over default.
fn resolve_system_prompt(config: &ParleyConfig, home: &Path) -> String {
    // Inline system_prompt takes priority
    if let Some(ref prompt) = config.general.system_prompt {
        return prompt.clone();
    }

    // Try loading from system_prompt_file (relative to ~/.parley/)
    if let Some(ref file) = config.general.system_prompt_file {
        let prompt_path = home.join(file);
        match fs::read_to_string(&prompt_path) {
            Ok(contents) => {
                let trimmed = contents.trim().to_string();
                if !trimmed.is_empty() {
                    info!("Loaded system prompt from {}", prompt_path.display());
                    return trimmed;
                }
                warn!("System prompt file is empty: {}", prompt_path.display());
            }
            Err(e) => {
                warn!(
                    "Failed to read system prompt file {}: {}",
                    prompt_path.display(),
                    e
                );
            }
        }
    }

    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_log_dir_prefers_cli_data_dir() {
        let cli = PathBuf::from("/tmp/parley-data");
        assert_eq!(log_dir(Some(&cli)), cli);
        if let Some(home) = parley_home() {
            assert_eq!(log_dir(None), home);
        }
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&ParleyConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.model, DEFAULT_MODEL);
        assert_eq!(resolved.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(resolved.max_cached_chats, DEFAULT_MAX_CACHED_CHATS);
        assert_eq!(resolved.base_url, DEFAULT_GEMINI_BASE_URL);
        assert!(resolved.api_key.is_none());
        assert!(!resolved.ephemeral);
        assert!(resolved.system_prompt.starts_with("You are a helpful assistant"));
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = ParleyConfig {
            general: GeneralConfig {
                model: Some("my-model".to_string()),
                image_model: Some("my-imagen".to_string()),
                system_prompt: Some("Custom prompt.".to_string()),
                max_cached_chats: Some(3),
                data_dir: Some("/tmp/parley-data".to_string()),
                ..Default::default()
            },
            gemini: GeminiConfig {
                api_key: Some("file-key".to_string()),
                base_url: Some("http://localhost:8080".to_string()),
            },
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.model, "my-model");
        assert_eq!(resolved.image_model, "my-imagen");
        assert_eq!(resolved.system_prompt, "Custom prompt.");
        assert_eq!(resolved.max_cached_chats, 3);
        assert_eq!(resolved.api_key.as_deref(), Some("file-key"));
        assert_eq!(resolved.base_url, "http://localhost:8080");
        assert_eq!(resolved.data_dir, PathBuf::from("/tmp/parley-data"));
    }

    #[test]
    fn test_env_overrides_config_and_cli_overrides_env() {
        let config = ParleyConfig {
            general: GeneralConfig {
                model: Some("file-model".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let env = env_from(&[("PARLEY_MODEL", "env-model"), ("GEMINI_API_KEY", "env-key")]);

        let resolved = resolve_with_env(&config, &CliOverrides::default(), &env);
        assert_eq!(resolved.model, "env-model");
        assert_eq!(resolved.api_key.as_deref(), Some("env-key"));

        let cli = CliOverrides {
            model: Some("cli-model".to_string()),
            ephemeral: true,
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &cli, &env);
        assert_eq!(resolved.model, "cli-model");
        assert!(resolved.ephemeral);
    }

    #[test]
    fn test_api_key_falls_back_to_generic_env_var() {
        let env = env_from(&[("API_KEY", "generic")]);
        let resolved = resolve_with_env(&ParleyConfig::default(), &CliOverrides::default(), env);
        assert_eq!(resolved.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let env = env_from(&[("GEMINI_API_KEY", "  ")]);
        let resolved = resolve_with_env(&ParleyConfig::default(), &CliOverrides::default(), env);
        assert!(resolved.api_key.is_none());
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[general]
model = "my-model"
"#;
        let config: ParleyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.model.as_deref(), Some("my-model"));
        assert!(config.general.image_model.is_none());
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_full_toml_parses() {
        let toml_str = r#"
[general]
model = "gemini-2.5-pro"
image_model = "imagen-4"
max_cached_chats = 8
downloads_dir = "/tmp/dl"

[gemini]
api_key = "abc"
base_url = "http://127.0.0.1:1234"
"#;
        let config: ParleyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.max_cached_chats, Some(8));
        assert_eq!(config.gemini.api_key.as_deref(), Some("abc"));

        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.downloads_dir, PathBuf::from("/tmp/dl"));
    }

    #[test]
    fn test_generated_default_config_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert!(config.general.model.is_none());
        assert!(path.exists());

        // Second load reads the generated, fully commented file
        let config = load_config_from(&path).unwrap();
        assert!(config.general.model.is_none());
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general\nmodel = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_inline_system_prompt_wins_over_file() {
        let config = ParleyConfig {
            general: GeneralConfig {
                system_prompt: Some("Inline wins.".to_string()),
                system_prompt_file: Some("should-not-load.md".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.system_prompt, "Inline wins.");
    }

    #[test]
    fn test_system_prompt_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("system.md"), "  From a file.  \n").unwrap();
        let config = ParleyConfig {
            general: GeneralConfig {
                system_prompt_file: Some("system.md".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(resolve_system_prompt(&config, dir.path()), "From a file.");
    }
}
