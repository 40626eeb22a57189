use serde_yaml::Value;

use crate::config::{ConfigError, CpuQuota, MemoryQuota, Result};

pub const MIN_REPLICAS: u64 = 1;
pub const MAX_REPLICAS: u64 = 10;

const TOP_LEVEL_KEYS: &[&str] = &["project", "scaling"];
const SCALING_KEYS: &[&str] = &["replicas", "cpu", "memory"];

/// Validation result with warnings
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent operation
    pub errors: Vec<String>,
    /// Warnings that should be shown to user
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Convert to Result, failing if there are errors
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.has_errors() {
            Err(ConfigError::Schema(self.errors.join("\n")))
        } else {
            Ok(self.warnings)
        }
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validate a parsed `inferex.yaml` document before it is deserialized.
pub fn validate_manifest(doc: &Value) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(root) = doc.as_mapping() else {
        result.error("inferex.yaml must be a mapping with a 'project' section");
        return result;
    };

    for key in root.keys() {
        match key.as_str() {
            Some(k) if TOP_LEVEL_KEYS.contains(&k) => {}
            Some(k) => result.warn(format!("Unknown key '{}' in inferex.yaml is ignored", k)),
            None => result.warn("Non-string key in inferex.yaml is ignored"),
        }
    }

    result.merge(validate_project(root.get("project")));
    if let Some(scaling) = root.get("scaling") {
        result.merge(validate_scaling(scaling));
    }

    result
}

fn validate_project(project: Option<&Value>) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(project) = project else {
        result.error("project: required section is missing");
        return result;
    };
    let Some(project) = project.as_mapping() else {
        result.error("project: must be a mapping");
        return result;
    };

    match project.get("name") {
        None | Some(Value::Null) => result.error("project.name: required field is missing"),
        Some(Value::String(name)) if name.trim().is_empty() => {
            result.error("project.name: cannot be empty")
        }
        Some(Value::String(_)) => {}
        Some(_) => result.error("project.name: must be a string"),
    }

    result
}

fn validate_scaling(scaling: &Value) -> ValidationResult {
    let mut result = ValidationResult::new();

    if scaling.is_null() {
        return result;
    }
    let Some(scaling) = scaling.as_mapping() else {
        result.error("scaling: must be a mapping");
        return result;
    };

    for key in scaling.keys() {
        if let Some(k) = key.as_str()
            && !SCALING_KEYS.contains(&k)
        {
            result.warn(format!("Unknown key 'scaling.{}' is ignored", k));
        }
    }

    match scaling.get("replicas") {
        None | Some(Value::Null) => result.error("scaling.replicas: required field is missing"),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(r) if (MIN_REPLICAS..=MAX_REPLICAS).contains(&r) => {}
            _ => result.error(format!(
                "scaling.replicas: must be a whole number between {} and {}, got {}",
                MIN_REPLICAS, MAX_REPLICAS, n
            )),
        },
        Some(_) => result.error("scaling.replicas: must be a number"),
    }

    if let Some(cpu) = scaling.get("cpu") {
        match crate::config::scalar_to_string(cpu.clone()) {
            Some(raw) => {
                if let Err(reason) = CpuQuota::parse(&raw) {
                    result.error(format!("scaling.cpu: {}", reason));
                }
            }
            None => result.error("scaling.cpu: must be a string or number"),
        }
    }

    if let Some(memory) = scaling.get("memory") {
        match memory.as_str() {
            Some(raw) => {
                if let Err(reason) = MemoryQuota::parse(raw) {
                    result.error(format!("scaling.memory: {}", reason));
                }
            }
            None => result.error("scaling.memory: must be a string such as 4Gi"),
        }
    }

    result
}
