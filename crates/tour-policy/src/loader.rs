use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::api::apply_override_to_policy;
use crate::defaults::default_policy;
use crate::errors::PolicyError;
use crate::model::{PolicySource, TourPolicy};

const ENV_PREFIX: &str = "TOUR_POLICY__";
const ENV_JSON: &str = "TOUR_POLICY_OVERRIDE_JSON";
const ENV_CLI_OVERRIDES: &str = "TOUR_POLICY_CLI_OVERRIDES";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
    pub include_cli_env: bool,
    /// `path=value` pairs, applied last
    pub cli_overrides: Vec<String>,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
            include_cli_env: true,
            cli_overrides: Vec::new(),
        }
    }
}

/// Defaults, then the YAML file (if it exists), then environment overlays.
pub fn load_policy(path: Option<&Path>) -> Result<TourPolicy, PolicyError> {
    let mut options = LoadOptions {
        include_env: true,
        include_cli_env: true,
        ..LoadOptions::default()
    };
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    load_policy_with_options(&options)
}

pub fn load_policy_with_options(options: &LoadOptions) -> Result<TourPolicy, PolicyError> {
    let mut policy = default_policy();
    bootstrap_builtin_provenance(&mut policy)?;

    for path in &options.paths {
        if path.exists() {
            let overlays = overlays_from_file(path)?;
            debug!(path = %path.display(), count = overlays.len(), "policy file overlays");
            apply_overlays(&mut policy, overlays)?;
        }
    }

    if options.include_env {
        apply_overlays(&mut policy, overlays_from_env()?)?;
    }

    if options.include_cli_env {
        if let Ok(raw) = env::var(ENV_CLI_OVERRIDES) {
            apply_overlays(&mut policy, overlays_from_pairs(raw.split(',')))?;
        }
    }

    apply_overlays(
        &mut policy,
        overlays_from_pairs(options.cli_overrides.iter().map(String::as_str)),
    )?;

    Ok(policy)
}

struct PolicyOverlay {
    path: String,
    value: Value,
    source: PolicySource,
}

fn apply_overlays(policy: &mut TourPolicy, overlays: Vec<PolicyOverlay>) -> Result<(), PolicyError> {
    for overlay in overlays {
        apply_override_to_policy(policy, &overlay.path, &overlay.value, overlay.source)?;
    }
    Ok(())
}

fn overlays_from_file(path: &Path) -> Result<Vec<PolicyOverlay>, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(json_value, None, PolicySource::File))
}

fn overlays_from_env() -> Result<Vec<PolicyOverlay>, PolicyError> {
    let mut overlays = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            overlays.push(PolicyOverlay {
                path,
                value: parse_env_value(&raw),
                source: PolicySource::Env,
            });
        }
    }

    if let Ok(raw_json) = env::var(ENV_JSON) {
        if !raw_json.trim().is_empty() {
            let json_value: Value = serde_json::from_str(&raw_json)
                .map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
            overlays.extend(flatten_value(json_value, None, PolicySource::Env));
        }
    }

    Ok(overlays)
}

fn overlays_from_pairs<'a>(pairs: impl Iterator<Item = &'a str>) -> Vec<PolicyOverlay> {
    pairs
        .filter_map(|token| {
            let (path, raw) = token.trim().split_once('=')?;
            let path = path.trim();
            (!path.is_empty()).then(|| PolicyOverlay {
                path: path.to_string(),
                value: parse_env_value(raw.trim()),
                source: PolicySource::Cli,
            })
        })
        .collect()
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    Value::String(raw.to_string())
}

fn flatten_value(value: Value, prefix: Option<String>, source: PolicySource) -> Vec<PolicyOverlay> {
    match value {
        Value::Object(map) => {
            let mut result = Vec::new();
            for (key, value) in map {
                let key_segment = key.trim().to_ascii_lowercase();
                let next_prefix = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, key_segment),
                    _ => key_segment,
                };
                result.extend(flatten_value(value, Some(next_prefix), source));
            }
            result
        }
        other => match prefix {
            // `rev` is owned by the policy center, never by overlays
            Some(prefix) if prefix != "rev" => vec![PolicyOverlay {
                path: prefix,
                value: other,
                source,
            }],
            _ => Vec::new(),
        },
    }
}

fn bootstrap_builtin_provenance(policy: &mut TourPolicy) -> Result<(), PolicyError> {
    let value = serde_json::to_value(&*policy).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    for overlay in flatten_value(value, None, PolicySource::Builtin) {
        policy.set_provenance(&overlay.path, overlay.source);
    }
    Ok(())
}
