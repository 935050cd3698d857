//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Where screenshots land
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Run defaults
    #[serde(default)]
    pub run: RunConfig,

    /// Log file settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Browser launch settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BrowserSettings {
    /// Explicit Chrome/Chromium executable (searched in PATH otherwise)
    pub executable: Option<PathBuf>,

    /// Run without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Accept self-signed and otherwise invalid certificates
    #[serde(default = "default_true")]
    pub ignore_https_errors: bool,

    /// Extra command-line arguments for the browser process
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,

    /// Override the browser user agent
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            ignore_https_errors: true,
            args: default_browser_args(),
            user_agent: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_window_width() -> u32 {
    1920
}
fn default_window_height() -> u32 {
    1080
}
fn default_browser_args() -> Vec<String> {
    vec!["--disable-features=VizDisplayCompositor".to_string()]
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on browser startup
    #[serde(default = "default_launch")]
    pub launch_secs: u64,

    /// Bound on a navigate step, including load settling
    #[serde(default = "default_navigation")]
    pub navigation_secs: u64,

    /// How long element resolution waits for a selector to match
    #[serde(default = "default_element")]
    pub element_secs: u64,

    /// Bound on every non-navigation step
    #[serde(default = "default_step")]
    pub step_secs: u64,

    /// Bound on closing a session
    #[serde(default = "default_teardown")]
    pub teardown_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            launch_secs: default_launch(),
            navigation_secs: default_navigation(),
            element_secs: default_element(),
            step_secs: default_step(),
            teardown_secs: default_teardown(),
        }
    }
}

impl Timeouts {
    pub fn launch(&self) -> Duration {
        Duration::from_secs(self.launch_secs)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn element(&self) -> Duration {
        Duration::from_secs(self.element_secs)
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_secs(self.teardown_secs)
    }
}

fn default_launch() -> u64 {
    30
}
fn default_navigation() -> u64 {
    60
}
fn default_element() -> u64 {
    10
}
fn default_step() -> u64 {
    30
}
fn default_teardown() -> u64 {
    10
}

/// Artifact output configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArtifactsConfig {
    /// Base directory for relative screenshot paths
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,

    /// Capture the page under `failures/` when a step fails
    #[serde(default = "default_true")]
    pub failure_screenshots: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            failure_screenshots: true,
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Run defaults
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    /// Scenarios executed concurrently, one session each
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Origin served by the simulated storefront
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            base_url: default_base_url(),
        }
    }
}

fn default_jobs() -> usize {
    1
}
fn default_base_url() -> String {
    "https://www.saucedemo.com".to_string()
}

/// Log file configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Write a per-run log file into the data directory
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { file: true }
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.run.jobs == 0 {
            return Err(super::Error::Config("run.jobs must be at least 1".to_string()));
        }
        let t = &self.timeouts;
        if t.navigation_secs == 0 || t.step_secs == 0 || t.launch_secs == 0 || t.teardown_secs == 0 {
            return Err(super::Error::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Find a browser executable: explicit setting first, then PATH
    ///
    /// Returns None when chromiumoxide should run its own detection.
    pub fn browser_executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.browser.executable {
            return Some(path.clone());
        }

        const CANDIDATES: &[&str] = &[
            "chromium",
            "chromium-browser",
            "google-chrome",
            "google-chrome-stable",
        ];
        CANDIDATES.iter().find_map(|name| which::which(name).ok())
    }
}
