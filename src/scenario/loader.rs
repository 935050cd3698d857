//! Loading scenarios from YAML files and the built-in catalog

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{builtin, Scenario, ScenarioId, Step};
use crate::common::{Error, Result};

/// Load and validate a scenario from a YAML file
pub fn load_file(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let scenario: Scenario = serde_yaml::from_str(&content).map_err(|e| Error::ScenarioParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    scenario.validate()?;
    Ok(scenario)
}

/// Load every `*.yaml` / `*.yml` scenario in a directory, sorted by path
pub fn load_dir(dir: &Path) -> Result<Vec<Scenario>> {
    scenario_files(dir)?
        .iter()
        .map(|path| load_file(path))
        .collect()
}

/// Scenario files directly inside `dir`, sorted by path
pub fn scenario_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_scenario_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_scenario_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Resolve CLI targets into scenarios
///
/// Each target is a YAML file, a directory of YAML files, or the name of a
/// built-in scenario. No targets selects every built-in scenario.
pub fn resolve(targets: &[String]) -> Result<Vec<Scenario>> {
    if targets.is_empty() {
        return Ok(builtin::all());
    }

    let mut scenarios = Vec::new();
    for target in targets {
        let path = Path::new(target);
        if path.is_dir() {
            let found = load_dir(path)?;
            if found.is_empty() {
                tracing::warn!("No scenario files in {}", path.display());
            }
            scenarios.extend(found);
        } else if path.is_file() {
            scenarios.push(load_file(path)?);
        } else if let Some(scenario) = builtin::find(target) {
            scenarios.push(scenario);
        } else {
            return Err(Error::ScenarioNotFound(target.clone()));
        }
    }
    Ok(scenarios)
}

/// Write a skeleton scenario file with a fresh generation date and UUID
///
/// Returns the path of the new file. Existing files are never overwritten.
pub fn scaffold(name: &str, dir: &Path, base_url: &str) -> Result<PathBuf> {
    if name.trim().is_empty() || name.contains(char::is_whitespace) {
        return Err(Error::invalid_scenario(
            name,
            "name must be non-empty and contain no whitespace",
        ));
    }

    let id = ScenarioId::new(name)
        .generated_on(Some(chrono::Local::now().date_naive()))
        .with_uuid(Uuid::new_v4());
    let stem = id.file_stem();

    let scenario = Scenario::new(
        id,
        vec![
            Step::Navigate {
                url: base_url.to_string(),
            },
            Step::Screenshot {
                path: PathBuf::from(format!("{}.png", name.to_lowercase())),
            },
        ],
    );
    let yaml = serde_yaml::to_string(&scenario)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.yaml", stem));
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    file.write_all(yaml.as_bytes())?;

    Ok(path)
}
