use std::fs;
use std::path::{Component, Path};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use super::BuildError;

/// Per-project ignore file, gitignore syntax.
pub const IGNORE_FILE_NAME: &str = ".ixignore";

/// Directory and file names never shipped to the control plane.
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[
    ".git",
    "venv",
    ".venv",
    "__pycache__",
    ".pytest_cache",
    ".vscode",
    ".idea",
    "dist",
    "node_modules",
    IGNORE_FILE_NAME,
];

const EXCLUDED_SUFFIXES: &[&str] = &[".egg-info", ".tar", ".tar.gz", ".tgz", ".tar.xz"];

/// Hidden names, well-known caches and earlier archives.
pub fn is_default_excluded(name: &str) -> bool {
    name.starts_with('.')
        || DEFAULT_EXCLUDED_NAMES.contains(&name)
        || EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn has_excluded_component(relative_path: &Path) -> bool {
    relative_path.components().any(|component| match component {
        Component::Normal(name) => name.to_str().is_some_and(is_default_excluded),
        _ => false,
    })
}

/// Exclusions for one project root
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    user: Option<Gitignore>,
}

impl ExcludeRules {
    /// Default exclusions, `.ixignore` from `root` if present, then `extra`.
    pub fn load(root: &Path, extra: &[String]) -> Result<Self, BuildError> {
        let path = root.join(IGNORE_FILE_NAME);
        let mut patterns: Vec<String> = match fs::read_to_string(&path) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist", path.display());
                Vec::new()
            }
            Err(e) => return Err(BuildError::Read { path, source: e }),
        };
        patterns.extend(extra.iter().cloned());
        Self::from_patterns(root, &patterns)
    }

    pub fn from_patterns(root: &Path, patterns: &[String]) -> Result<Self, BuildError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut any = false;
        for pattern in patterns {
            let trimmed = pattern.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            builder
                .add_line(None, trimmed)
                .map_err(|e| BuildError::IgnorePattern {
                    pattern: trimmed.to_string(),
                    reason: e.to_string(),
                })?;
            any = true;
        }
        if !any {
            return Ok(Self { user: None });
        }
        let gitignore = builder.build().map_err(|e| BuildError::IgnorePattern {
            pattern: IGNORE_FILE_NAME.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            user: Some(gitignore),
        })
    }

    /// `relative_path` is relative to the project root.
    pub fn is_excluded(&self, relative_path: &Path, is_dir: bool) -> bool {
        if has_excluded_component(relative_path) {
            return true;
        }
        match &self.user {
            Some(matcher) => matcher
                .matched_path_or_any_parents(relative_path, is_dir)
                .is_ignore(),
            None => false,
        }
    }
}
