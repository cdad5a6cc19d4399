use crate::cli::CliArgs;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_AZ_COMMAND: &str = "az";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Effective settings after merging the config file with CLI flags.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AzrConfig {
    pub source: Option<String>,
    pub az_command: String,
    pub az_args: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct AzrConfigFile {
    #[serde(default, alias = "az")]
    az_command: Option<String>,
    #[serde(default)]
    az_args: Vec<String>,
    #[serde(default, alias = "timeout", alias = "timeout_secs")]
    fetch_timeout_secs: Option<u64>,
    #[serde(default)]
    fixture: Option<PathBuf>,
}

impl Default for AzrConfig {
    fn default() -> Self {
        Self {
            source: None,
            az_command: DEFAULT_AZ_COMMAND.to_string(),
            az_args: Vec::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fixture: None,
        }
    }
}

impl AzrConfig {
    /// Reads `explicit` when given, otherwise the first discovered config file.
    /// No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = explicit.map(Path::to_path_buf).or_else(discover_config_path) else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config = Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if let Some(fixture) = config.fixture.take() {
            let base = path.parent().unwrap_or(Path::new("."));
            config.fixture = Some(if fixture.is_relative() {
                base.join(fixture)
            } else {
                fixture
            });
        }
        config.source = Some(path.display().to_string());
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let parsed: AzrConfigFile = if raw.trim().is_empty() {
            AzrConfigFile::default()
        } else {
            serde_yaml::from_str(raw)?
        };

        Ok(Self {
            source: None,
            az_command: parsed
                .az_command
                .map(|command| command.trim().to_string())
                .filter(|command| !command.is_empty())
                .unwrap_or_else(|| DEFAULT_AZ_COMMAND.to_string()),
            az_args: parsed.az_args,
            fetch_timeout_secs: parsed
                .fetch_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            fixture: parsed.fixture,
        })
    }

    pub fn with_cli_overrides(mut self, args: &CliArgs) -> Self {
        if let Some(command) = args.az_command.as_deref()
            && !command.trim().is_empty()
        {
            self.az_command = command.trim().to_string();
        }
        if let Some(fixture) = args.fixture.clone() {
            self.fixture = Some(fixture);
        }
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AZR_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("azr.yaml"),
        PathBuf::from("azr.yml"),
        PathBuf::from(".azr.yaml"),
    ];
    if let Some(found) = cwd_candidates.into_iter().find(|candidate| candidate.exists()) {
        return Some(found);
    }

    let home = std::env::var("HOME").ok()?;
    [
        PathBuf::from(&home).join(".config/azr/config.yaml"),
        PathBuf::from(&home).join(".config/azr/config.yml"),
        PathBuf::from(&home).join(".azr.yaml"),
    ]
    .into_iter()
    .find(|candidate| candidate.exists())
}
