//! Harness configuration
//!
//! Every value is resolved once before any test runs. Lookup order for a key
//! is: explicit override (CLI flag), environment variable, built-in default.
//! A key with none of the three is a configuration error.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::model::{ExternalLink, Framework, Project, Viewport, ViewportPreset};

/// Pinned axe-core build injected into pages under audit
pub const DEFAULT_AXE_SOURCE: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/axe-core/4.10.2/axe.min.js";

const MAX_RETRIES: u32 = 5;

/// A resolvable configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    BaseUrl,
    Ci,
    Workers,
    Retries,
    TestTimeoutMs,
    ActionTimeoutMs,
    ExpectTimeoutMs,
    TeardownTimeoutMs,
    Projects,
    OutputDir,
    Headless,
    ChromeExecutable,
    AxeSource,
    Viewport(ViewportPreset),
    ExternalLink(ExternalLink),
    ReportUrl(Framework),
}

impl ConfigKey {
    /// Environment variable consulted for this key
    pub fn env_var(&self) -> String {
        match self {
            ConfigKey::BaseUrl => "BASE_URL".to_string(),
            ConfigKey::Ci => "CI".to_string(),
            ConfigKey::Workers => "E2E_WORKERS".to_string(),
            ConfigKey::Retries => "E2E_RETRIES".to_string(),
            ConfigKey::TestTimeoutMs => "E2E_TEST_TIMEOUT_MS".to_string(),
            ConfigKey::ActionTimeoutMs => "E2E_ACTION_TIMEOUT_MS".to_string(),
            ConfigKey::ExpectTimeoutMs => "E2E_EXPECT_TIMEOUT_MS".to_string(),
            ConfigKey::TeardownTimeoutMs => "E2E_TEARDOWN_TIMEOUT_MS".to_string(),
            ConfigKey::Projects => "E2E_PROJECTS".to_string(),
            ConfigKey::OutputDir => "E2E_OUTPUT_DIR".to_string(),
            ConfigKey::Headless => "E2E_HEADLESS".to_string(),
            ConfigKey::ChromeExecutable => "CHROME_PATH".to_string(),
            ConfigKey::AxeSource => "AXE_SOURCE".to_string(),
            ConfigKey::Viewport(preset) => {
                format!("E2E_VIEWPORT_{}", preset.as_str().to_uppercase())
            }
            ConfigKey::ExternalLink(link) => {
                format!("E2E_LINK_{}", link.as_str().to_uppercase())
            }
            ConfigKey::ReportUrl(fw) => {
                format!("E2E_REPORT_{}", fw.as_str().replace('-', "_").to_uppercase())
            }
        }
    }

    /// Compiled-in fallback, if the key has one
    pub fn default_value(&self) -> Option<String> {
        let value = match self {
            ConfigKey::BaseUrl => "https://nokillkenny.github.io/",
            ConfigKey::Ci => "",
            // Depends on Ci; resolved in HarnessConfig
            ConfigKey::Workers => return None,
            ConfigKey::Retries => "0",
            ConfigKey::TestTimeoutMs => "30000",
            ConfigKey::ActionTimeoutMs => "5000",
            ConfigKey::ExpectTimeoutMs => "5000",
            ConfigKey::TeardownTimeoutMs => "10000",
            ConfigKey::Projects => "chromium,mobile",
            ConfigKey::OutputDir => "test-results",
            ConfigKey::Headless => "true",
            ConfigKey::ChromeExecutable => return None,
            ConfigKey::AxeSource => DEFAULT_AXE_SOURCE,
            ConfigKey::Viewport(preset) => return Some(preset.default_viewport().to_string()),
            ConfigKey::ExternalLink(ExternalLink::Github) => "https://github.com/nokillkenny",
            ConfigKey::ExternalLink(ExternalLink::Linkedin) => "https://linkedin.com/in/kenny-lin",
            ConfigKey::ReportUrl(Framework::Playwright) => {
                "https://github.com/nokillkenny/playwright-showcase/"
            }
            ConfigKey::ReportUrl(Framework::RubyCucumber) => {
                "https://github.com/nokillkenny/rspec-capybara-page-object-example"
            }
            ConfigKey::ReportUrl(Framework::Codeceptjs) => {
                "https://github.com/nokillkenny/codeceptjs-rest-bdd"
            }
        };
        Some(value.to_string())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.env_var())
    }
}

/// Source of environment-supplied values
pub trait EnvSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Layered key lookup: override > environment > default
pub struct Resolver {
    overrides: HashMap<ConfigKey, String>,
    env: Box<dyn EnvSource>,
}

impl Resolver {
    pub fn new(env: impl EnvSource + 'static) -> Self {
        Self {
            overrides: HashMap::new(),
            env: Box::new(env),
        }
    }

    /// Resolver over the process environment
    pub fn from_env() -> Self {
        Self::new(ProcessEnv)
    }

    /// Pin a key to a value regardless of environment
    pub fn with_override(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.overrides.insert(key, value.into());
        self
    }

    pub fn set_override(&mut self, key: ConfigKey, value: impl Into<String>) {
        self.overrides.insert(key, value.into());
    }

    /// Resolve a key, treating empty strings as unset
    pub fn resolve_optional(&self, key: ConfigKey) -> Option<String> {
        let non_empty = |v: &String| !v.trim().is_empty();

        if let Some(value) = self.overrides.get(&key).filter(|v| non_empty(v)) {
            debug!(%key, "resolved from override");
            return Some(value.trim().to_string());
        }
        if let Some(value) = self.env.get(&key.env_var()).filter(non_empty) {
            debug!(%key, "resolved from environment");
            return Some(value.trim().to_string());
        }
        key.default_value().filter(non_empty)
    }

    /// Resolve a required key
    pub fn resolve(&self, key: ConfigKey) -> E2eResult<String> {
        self.resolve_optional(key)
            .ok_or_else(|| E2eError::config(key.to_string(), "required value is not set"))
    }

    fn parse<T: std::str::FromStr>(&self, key: ConfigKey) -> E2eResult<T>
    where
        T::Err: fmt::Display,
    {
        let raw = self.resolve(key)?;
        raw.parse::<T>()
            .map_err(|e| E2eError::config(key.to_string(), format!("invalid value '{}': {}", raw, e)))
    }

    fn flag(&self, key: ConfigKey) -> E2eResult<bool> {
        match self.resolve_optional(key) {
            None => Ok(false),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(E2eError::config(
                    key.to_string(),
                    format!("expected a boolean, got '{}'", raw),
                )),
            },
        }
    }
}

/// Source of the axe-core script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AxeSource {
    Url(String),
    File(PathBuf),
}

/// Fully resolved, read-only run configuration
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    pub base_url: String,
    pub ci: bool,
    pub workers: usize,
    pub retries: u32,
    pub test_timeout: Duration,
    pub action_timeout: Duration,
    pub expect_timeout: Duration,
    pub teardown_timeout: Duration,
    /// Profiles every unpinned test runs under, in run order
    pub projects: Vec<Project>,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub axe_source: AxeSource,
    pub viewports: HashMap<ViewportPreset, Viewport>,
    pub external_links: HashMap<ExternalLink, String>,
    pub report_urls: HashMap<Framework, String>,
}

impl HarnessConfig {
    /// Resolve and validate every key up front
    pub fn resolve(resolver: &Resolver) -> E2eResult<Self> {
        let base_url = normalize_base_url(&resolver.resolve(ConfigKey::BaseUrl)?)?;
        let ci = resolver.flag(ConfigKey::Ci)?;

        let workers = match resolver.resolve_optional(ConfigKey::Workers) {
            Some(_) => resolver.parse::<usize>(ConfigKey::Workers)?,
            None if ci => 4,
            None => 2,
        };
        if workers == 0 {
            return Err(E2eError::config(ConfigKey::Workers.to_string(), "must be at least 1"));
        }

        let retries = resolver.parse::<u32>(ConfigKey::Retries)?;
        if retries > MAX_RETRIES {
            return Err(E2eError::config(
                ConfigKey::Retries.to_string(),
                format!("must be at most {}", MAX_RETRIES),
            ));
        }

        let millis = |key| -> E2eResult<Duration> {
            let ms = resolver.parse::<u64>(key)?;
            if ms == 0 {
                return Err(E2eError::config(key.to_string(), "must be greater than zero"));
            }
            Ok(Duration::from_millis(ms))
        };

        let projects = parse_projects(&resolver.resolve(ConfigKey::Projects)?)?;

        let axe_raw = resolver.resolve(ConfigKey::AxeSource)?;
        let axe_source = if axe_raw.starts_with("http://") || axe_raw.starts_with("https://") {
            AxeSource::Url(axe_raw)
        } else {
            AxeSource::File(PathBuf::from(axe_raw))
        };

        let mut viewports = HashMap::new();
        for preset in ViewportPreset::ALL {
            viewports.insert(preset, resolver.parse::<Viewport>(ConfigKey::Viewport(preset))?);
        }

        let mut external_links = HashMap::new();
        for link in ExternalLink::ALL {
            let key = ConfigKey::ExternalLink(link);
            external_links.insert(link, absolute_url(key, resolver.resolve(key)?)?);
        }

        let mut report_urls = HashMap::new();
        for fw in Framework::ALL {
            let key = ConfigKey::ReportUrl(fw);
            report_urls.insert(fw, absolute_url(key, resolver.resolve(key)?)?);
        }

        Ok(Self {
            base_url,
            ci,
            workers,
            retries,
            test_timeout: millis(ConfigKey::TestTimeoutMs)?,
            action_timeout: millis(ConfigKey::ActionTimeoutMs)?,
            expect_timeout: millis(ConfigKey::ExpectTimeoutMs)?,
            teardown_timeout: millis(ConfigKey::TeardownTimeoutMs)?,
            projects,
            output_dir: PathBuf::from(resolver.resolve(ConfigKey::OutputDir)?),
            headless: resolver.flag(ConfigKey::Headless)?,
            chrome_executable: resolver.resolve_optional(ConfigKey::ChromeExecutable).map(PathBuf::from),
            axe_source,
            viewports,
            external_links,
            report_urls,
        })
    }

    /// Resolve from the process environment with no overrides
    pub fn from_env() -> E2eResult<Arc<Self>> {
        Self::resolve(&Resolver::from_env()).map(Arc::new)
    }

    /// Join a path relative to the target address
    pub fn url(&self, path: &str) -> String {
        let trimmed = path.trim_start_matches("./").trim_start_matches('/');
        format!("{}{}", self.base_url, trimmed)
    }

    pub fn viewport(&self, preset: ViewportPreset) -> Viewport {
        self.viewports
            .get(&preset)
            .copied()
            .unwrap_or_else(|| preset.default_viewport())
    }

    pub fn external_link(&self, link: ExternalLink) -> &str {
        self.external_links.get(&link).map(String::as_str).unwrap_or_default()
    }

    pub fn report_url(&self, fw: Framework) -> &str {
        self.report_urls.get(&fw).map(String::as_str).unwrap_or_default()
    }
}

fn normalize_base_url(raw: &str) -> E2eResult<String> {
    let url = Url::parse(raw)
        .map_err(|e| E2eError::config(ConfigKey::BaseUrl.to_string(), format!("'{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(E2eError::config(
            ConfigKey::BaseUrl.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    let mut s = url.to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Ok(s)
}

/// Comma-separated project names; duplicates collapse, order is kept
fn parse_projects(raw: &str) -> E2eResult<Vec<Project>> {
    let mut projects = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let project = name
            .parse::<Project>()
            .map_err(|e| E2eError::config(ConfigKey::Projects.to_string(), e))?;
        if !projects.contains(&project) {
            projects.push(project);
        }
    }
    if projects.is_empty() {
        return Err(E2eError::config(ConfigKey::Projects.to_string(), "no project selected"));
    }
    Ok(projects)
}

fn absolute_url(key: ConfigKey, raw: String) -> E2eResult<String> {
    Url::parse(&raw)
        .map(|_| raw.clone())
        .map_err(|e| E2eError::config(key.to_string(), format!("'{}': {}", raw, e)))
}
