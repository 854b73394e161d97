//! Configuration management utilities.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::GenerationTarget;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".windplay/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "Defaults::default_theme")]
    pub theme: String,
    #[serde(default)]
    pub target: GenerationTarget,
}

impl Defaults {
    fn default_theme() -> String {
        "base16-ocean.dark".into()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            theme: Self::default_theme(),
            target: GenerationTarget::default(),
        }
    }
}

/// Base URLs of the generation service, one per deployment mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "EndpointConfig::default_production")]
    pub production: String,
    #[serde(default = "EndpointConfig::default_development")]
    pub development: String,
    #[serde(default = "EndpointConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    fn default_production() -> String {
        "http://localhost/api".into()
    }

    fn default_development() -> String {
        "http://127.0.0.1:8000".into()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Pick the base URL for `mode`.
    pub fn resolve(&self, mode: DeploymentMode) -> Endpoint {
        let base = match mode {
            DeploymentMode::Production => &self.production,
            DeploymentMode::Development => &self.development,
        };
        Endpoint::new(mode, base.clone())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            production: Self::default_production(),
            development: Self::default_development(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    fetch: Option<bool>,
}

impl SchemaConfig {
    fn default_uri() -> &'static str {
        "https://raw.githubusercontent.com/ls1intum/Aeolus/develop/schemas/v0.0.1/schemas/windfile.json"
    }

    fn default_fetch() -> bool {
        true
    }

    pub fn uri(&self) -> String {
        self.uri
            .clone()
            .unwrap_or_else(|| Self::default_uri().to_owned())
    }

    pub fn fetch(&self) -> bool {
        self.fetch.unwrap_or_else(Self::default_fetch)
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            uri: Some(Self::default_uri().to_owned()),
            fetch: Some(Self::default_fetch()),
        }
    }
}

/// Where the playground runs; decides which endpoint base is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum DeploymentMode {
    Production,
    Development,
}

impl DeploymentMode {
    /// Mode implied by the build profile.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            DeploymentMode::Development
        } else {
            DeploymentMode::Production
        }
    }

    /// Resolve once at startup: explicit choice, then environment, then build profile.
    pub fn resolve(explicit: Option<DeploymentMode>, env: Option<DeploymentMode>) -> Self {
        explicit.or(env).unwrap_or_else(Self::from_build)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Production => "production",
            DeploymentMode::Development => "development",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "release" => Ok(DeploymentMode::Production),
            "development" | "dev" | "debug" => Ok(DeploymentMode::Development),
            other => Err(anyhow!("unknown deployment mode '{other}'")),
        }
    }
}

/// Generation service location chosen for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    mode: DeploymentMode,
    base_url: String,
}

impl Endpoint {
    pub fn new(mode: DeploymentMode, base_url: impl Into<String>) -> Self {
        Self {
            mode,
            base_url: base_url.into(),
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    mode: Option<DeploymentMode>,
    theme: Option<String>,
    schema_fetch: Option<bool>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let mode = env::var("WINDPLAY_MODE").ok().and_then(|raw| match raw.parse() {
            Ok(mode) => Some(mode),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring WINDPLAY_MODE");
                None
            }
        });
        let schema_fetch = env::var("WINDPLAY_SCHEMA_FETCH")
            .ok()
            .and_then(|raw| parse_flag(&raw));
        Self {
            mode,
            theme: env::var("WINDPLAY_THEME").ok(),
            schema_fetch,
        }
    }

    pub fn mode(&self) -> Option<DeploymentMode> {
        self.mode
    }

    #[cfg(test)]
    fn for_tests(mode: DeploymentMode, theme: &str) -> Self {
        Self {
            mode: Some(mode),
            theme: Some(theme.to_owned()),
            schema_fetch: Some(false),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, &env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: &EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            endpoint: merge_endpoint(self.endpoint, other.endpoint),
            schema: merge_schema(self.schema, other.schema),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        theme: if overlay.theme != Defaults::default_theme() {
            overlay.theme
        } else {
            base.theme
        },
        target: if overlay.target != GenerationTarget::default() {
            overlay.target
        } else {
            base.target
        },
    }
}

fn merge_endpoint(base: EndpointConfig, overlay: EndpointConfig) -> EndpointConfig {
    EndpointConfig {
        production: choose(
            base.production,
            overlay.production,
            EndpointConfig::default_production,
        ),
        development: choose(
            base.development,
            overlay.development,
            EndpointConfig::default_development,
        ),
        timeout_secs: if overlay.timeout_secs != EndpointConfig::default_timeout_secs() {
            overlay.timeout_secs
        } else {
            base.timeout_secs
        },
    }
}

fn merge_schema(mut base: SchemaConfig, overlay: SchemaConfig) -> SchemaConfig {
    if let Some(uri) = overlay.uri {
        base.uri = Some(uri);
    }
    if let Some(fetch) = overlay.fetch {
        base.fetch = Some(fetch);
    }
    base
}

fn choose(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() {
        overlay
    } else {
        base
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("windplay/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    Ok(Some(workspace_root()?.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

/// Repository root containing the working directory, or the working directory itself.
pub fn workspace_root() -> Result<PathBuf> {
    let cwd = env::current_dir().context("unable to determine working directory")?;
    Ok(workspace_root_from(cwd))
}

fn workspace_root_from(start: PathBuf) -> PathBuf {
    find_repo_root(&start).unwrap_or(start)
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: &EnvOverrides) -> Config {
    if let Some(theme) = &env.theme {
        config.defaults.theme = theme.clone();
    }
    if let Some(fetch) = env.schema_fetch {
        config.schema.fetch = Some(fetch);
    }
    config
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!(value = other, "ignoring WINDPLAY_SCHEMA_FETCH");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::SessionStore;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, &EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.defaults.target, GenerationTarget::Cli);
        assert_eq!(config.endpoint.development, "http://127.0.0.1:8000");
        assert!(config.schema.uri().ends_with("/windfile.json"));
        assert!(config.schema.fetch());
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[defaults]
target = "jenkins"
[endpoint]
production = "https://aeolus.example.org/api"
"#,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(workspace_dir.join(".windplay"))?;
        fs::create_dir_all(workspace_dir.join(".git"))?;
        fs::write(
            workspace_dir.join(".windplay/config.toml"),
            r#"
[endpoint]
timeout_secs = 5
[schema]
fetch = false
"#,
        )?;

        let config = Config::load_with_layers(
            Some(global),
            Some(workspace_dir.join(".windplay/config.toml")),
            &EnvOverrides::default(),
        )?;

        assert_eq!(config.defaults.target, GenerationTarget::Jenkins);
        assert_eq!(config.endpoint.production, "https://aeolus.example.org/api");
        assert_eq!(config.endpoint.development, "http://127.0.0.1:8000");
        assert_eq!(config.endpoint.timeout(), Duration::from_secs(5));
        assert!(!config.schema.fetch());
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests(DeploymentMode::Production, "InspiredGitHub");
        let config = Config::load_with_layers(None, None, &overrides)?;
        assert_eq!(config.defaults.theme, "InspiredGitHub");
        assert!(!config.schema.fetch());
        assert_eq!(
            DeploymentMode::resolve(None, overrides.mode()),
            DeploymentMode::Production
        );
        Ok(())
    }

    #[test]
    fn endpoint_resolves_per_mode() {
        let endpoints = EndpointConfig::default();
        let production = endpoints.resolve(DeploymentMode::Production);
        let development = endpoints.resolve(DeploymentMode::Development);
        assert_eq!(production.base_url(), "http://localhost/api");
        assert_eq!(development.base_url(), "http://127.0.0.1:8000");
        assert_eq!(development.mode(), DeploymentMode::Development);
    }

    #[test]
    fn explicit_mode_beats_environment() {
        assert_eq!(
            DeploymentMode::resolve(
                Some(DeploymentMode::Development),
                Some(DeploymentMode::Production)
            ),
            DeploymentMode::Development
        );
        assert_eq!(
            DeploymentMode::resolve(None, None),
            DeploymentMode::from_build()
        );
        assert!("staging".parse::<DeploymentMode>().is_err());
    }

    #[test]
    fn parses_boolean_flags() {
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(" On "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn workspace_root_is_found_from_nested_directories() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let repo = temp.path().join("repo");
        let nested = repo.join("pipelines/nightly");
        fs::create_dir_all(repo.join(".git"))?;
        fs::create_dir_all(&nested)?;

        let root = workspace_root_from(nested.clone());
        assert_eq!(root, repo);
        assert_eq!(
            SessionStore::new(&root).state_dir(),
            repo.join(".windplay"),
            "session and logs live next to the workspace config"
        );
        assert_eq!(
            root.join(DEFAULT_WORKSPACE_CONFIG_PATH).parent(),
            Some(repo.join(".windplay").as_path())
        );

        let loose = temp.path().join("loose");
        fs::create_dir_all(&loose)?;
        assert_eq!(workspace_root_from(loose.clone()), loose);
        Ok(())
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        let result = Config::from_file(&file);
        assert!(result.is_err());
        Ok(())
    }
}
