use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use crate::validation::validate_manifest;

pub const MANIFEST_FILE_NAME: &str = "inferex.yaml";

/// Per-project `inferex.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub project: ProjectSection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<Scaling>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
}

/// Resources requested for each replica of the deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scaling {
    pub replicas: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuQuota>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryQuota>,
}

/// CPU request: whole cores (`2`) or millicores (`500m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuQuota {
    millicores: u64,
    unit_suffix: bool,
}

impl CpuQuota {
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        let value = value.trim();
        let (digits, unit_suffix) = match value.strip_suffix('m') {
            Some(rest) => (rest, true),
            None => (value, false),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "'{}' is not a CPU quantity (expected e.g. 2 or 500m)",
                value
            ));
        }
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("'{}' is out of range", value))?;
        if amount == 0 {
            return Err("CPU must be at least 1".to_string());
        }
        let millicores = if unit_suffix {
            amount
        } else {
            amount
                .checked_mul(1000)
                .ok_or_else(|| format!("'{}' is out of range", value))?
        };
        Ok(Self {
            millicores,
            unit_suffix,
        })
    }

    pub fn millicores(&self) -> u64 {
        self.millicores
    }
}

impl fmt::Display for CpuQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit_suffix {
            write!(f, "{}m", self.millicores)
        } else {
            write!(f, "{}", self.millicores / 1000)
        }
    }
}

impl Serialize for CpuQuota {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CpuQuota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = scalar_to_string(serde_yaml::Value::deserialize(deserializer)?)
            .ok_or_else(|| serde::de::Error::custom("cpu must be a string or number"))?;
        CpuQuota::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Memory request in gibibytes (`4Gi`) or gigabytes (`4G`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryQuota {
    amount: u64,
    unit: MemoryUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    Gibibytes,
    Gigabytes,
}

impl MemoryQuota {
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        let value = value.trim();
        let (digits, unit) = if let Some(rest) = value.strip_suffix("Gi") {
            (rest, MemoryUnit::Gibibytes)
        } else if let Some(rest) = value.strip_suffix('G') {
            (rest, MemoryUnit::Gigabytes)
        } else {
            return Err(format!(
                "'{}' is not a memory quantity (expected e.g. 4Gi or 4G)",
                value
            ));
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "'{}' is not a memory quantity (expected e.g. 4Gi or 4G)",
                value
            ));
        }
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("'{}' is out of range", value))?;
        if amount == 0 {
            return Err("memory must be at least 1".to_string());
        }
        Ok(Self { amount, unit })
    }

    pub fn bytes(&self) -> u64 {
        let scale: u64 = match self.unit {
            MemoryUnit::Gibibytes => 1 << 30,
            MemoryUnit::Gigabytes => 1_000_000_000,
        };
        self.amount.saturating_mul(scale)
    }
}

impl fmt::Display for MemoryQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            MemoryUnit::Gibibytes => write!(f, "{}Gi", self.amount),
            MemoryUnit::Gigabytes => write!(f, "{}G", self.amount),
        }
    }
}

impl Serialize for MemoryQuota {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MemoryQuota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MemoryQuota::parse(&raw).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A user may point at either the project directory or its `inferex.yaml`.
pub fn project_root(path: &Path) -> PathBuf {
    if path.is_file() {
        return path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
    }
    path.to_path_buf()
}

impl ProjectManifest {
    /// Template written by `inferex init`.
    pub fn default_for(name: &str) -> Self {
        Self {
            project: ProjectSection {
                name: name.to_string(),
            },
            scaling: Some(Scaling {
                replicas: 1,
                cpu: None,
                memory: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.project.name
    }

    /// Parse and validate manifest content, returning non-fatal warnings too.
    pub fn parse_with_warnings(content: &str) -> Result<(Self, Vec<String>)> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        let warnings = validate_manifest(&value).into_result()?;
        let manifest: ProjectManifest =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Schema(e.to_string()))?;
        Ok((manifest, warnings))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let (manifest, warnings) = Self::parse_with_warnings(content)?;
        for warning in warnings {
            tracing::warn!("{}", warning);
        }
        Ok(manifest)
    }

    pub fn load_with_warnings<P: AsRef<Path>>(path: P) -> Result<(Self, Vec<String>)> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        tracing::debug!("Loaded manifest from {}", path.display());
        Self::parse_with_warnings(&content)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (manifest, warnings) = Self::load_with_warnings(path)?;
        for warning in warnings {
            tracing::warn!("{}", warning);
        }
        Ok(manifest)
    }

    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::load(dir.as_ref().join(MANIFEST_FILE_NAME))
    }

    /// `Ok(None)` when the project has no `inferex.yaml`.
    pub fn load_optional<P: AsRef<Path>>(dir: P) -> Result<Option<(Self, Vec<String>)>> {
        match Self::load_with_warnings(dir.as_ref().join(MANIFEST_FILE_NAME)) {
            Ok(loaded) => Ok(Some(loaded)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write `inferex.yaml` into `dir`, refusing to overwrite an existing one.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let path = dir.join(MANIFEST_FILE_NAME);
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path));
        }
        fs::create_dir_all(dir).map_err(|e| ConfigError::FileWrite(dir.to_path_buf(), e))?;
        let content = self.to_yaml()?;
        fs::write(&path, content).map_err(|e| ConfigError::FileWrite(path.clone(), e))?;
        Ok(path)
    }
}
