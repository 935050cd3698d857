//! Scenario data model
//!
//! A scenario is plain data: an identity plus an ordered list of steps.
//! The same types deserialize from YAML scenario files.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{paths, Error, Result};

/// URL schemes a navigate step may use
const ALLOWED_SCHEMES: &[&str] = &["http://", "https://", "file://", "about:"];

/// Identity of a scenario: a readable name plus its generation suffix
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScenarioId {
    /// Human-readable name (e.g. "TC_AUTH_01_ValidLogin")
    pub name: String,
    /// Date the scenario was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<NaiveDate>,
    /// Unique suffix assigned at generation time
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
}

impl ScenarioId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generated: None,
            uuid: None,
        }
    }

    pub fn generated_on(mut self, date: Option<NaiveDate>) -> Self {
        self.generated = date;
        self
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    /// Display title: `<name>_<YYYY-MM-DD>` when the date is known
    pub fn title(&self) -> String {
        match self.generated {
            Some(date) => format!("{}_{}", self.name, date.format("%Y-%m-%d")),
            None => self.name.clone(),
        }
    }

    /// File stem: lowercase name, suffixed with the UUID when present
    pub fn file_stem(&self) -> String {
        let name = self.name.to_lowercase();
        match self.uuid {
            Some(uuid) => format!("{}_{}", name, uuid.hyphenated()),
            None => name,
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// A single UI action
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL and wait until the page is actionable
    Navigate { url: String },
    /// Set the content of one input element
    Fill { selector: String, value: String },
    /// Click one element
    Click { selector: String },
    /// Choose an option of one select element
    SelectOption { selector: String, value: String },
    /// Capture the page to a file, relative to the artifacts directory
    Screenshot { path: PathBuf },
}

impl Step {
    /// Short action name used in logs and reports
    pub fn action(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Fill { .. } => "fill",
            Step::Click { .. } => "click",
            Step::SelectOption { .. } => "select_option",
            Step::Screenshot { .. } => "screenshot",
        }
    }

    /// The selector a step acts on, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            Step::Fill { selector, .. }
            | Step::Click { selector }
            | Step::SelectOption { selector, .. } => Some(selector),
            Step::Navigate { .. } | Step::Screenshot { .. } => None,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(selector) = self.selector() {
            if selector.trim().is_empty() {
                return Err("empty selector".to_string());
            }
        }

        match self {
            Step::Navigate { url } => {
                if url.trim().is_empty() {
                    return Err("empty URL".to_string());
                }
                if !ALLOWED_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
                    return Err(format!(
                        "unsupported URL '{}' (expected one of: {})",
                        url,
                        ALLOWED_SCHEMES.join(" ")
                    ));
                }
            }
            Step::Screenshot { path } => validate_output_path(path)?,
            _ => {}
        }
        Ok(())
    }
}

fn validate_output_path(path: &Path) -> std::result::Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("empty screenshot path".to_string());
    }
    if path.is_absolute() {
        return Err(format!(
            "screenshot path '{}' must be relative",
            path.display()
        ));
    }
    if paths::escapes_base(path) {
        return Err(format!(
            "screenshot path '{}' leaves the artifacts directory",
            path.display()
        ));
    }
    Ok(())
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate {}", url),
            Step::Fill { selector, value } => write!(f, "fill {} = {:?}", selector, value),
            Step::Click { selector } => write!(f, "click {}", selector),
            Step::SelectOption { selector, value } => {
                write!(f, "select_option {} = {:?}", selector, value)
            }
            Step::Screenshot { path } => write!(f, "screenshot {}", path.display()),
        }
    }
}

/// A named, ordered sequence of steps
///
/// Immutable once built; read through accessors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    #[serde(flatten)]
    id: ScenarioId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(id: ScenarioId, steps: Vec<Step>) -> Self {
        Self {
            id,
            description: None,
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &ScenarioId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn title(&self) -> String {
        self.id.title()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Screenshot output paths in step order
    pub fn screenshot_paths(&self) -> impl Iterator<Item = &Path> {
        self.steps.iter().filter_map(|step| match step {
            Step::Screenshot { path } => Some(path.as_path()),
            _ => None,
        })
    }

    /// Case-insensitive match against name, title or file stem
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.id.name.to_lowercase() == query
            || self.id.title().to_lowercase() == query
            || self.id.file_stem() == query
    }

    /// Check the scenario is well-formed before any session is opened
    pub fn validate(&self) -> Result<()> {
        if self.id.name.trim().is_empty() {
            return Err(Error::invalid_scenario("<unnamed>", "missing name"));
        }
        if self.steps.is_empty() {
            return Err(Error::invalid_scenario(&self.id.name, "no steps"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|reason| {
                Error::invalid_scenario(&self.id.name, format!("step {}: {}", i + 1, reason))
            })?;
        }
        Ok(())
    }
}
