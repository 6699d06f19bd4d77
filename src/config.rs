//! Project configuration
//!
//! Optional `mcdc.yaml` at the project root carrying the project name, SIL
//! level, source list and include directories, so CI invocations stay short.
//! CLI flags always win over file values; a missing config file is not an
//! error.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file names probed by [`ProjectConfig::discover`]
const CONFIG_NAMES: &[&str] = &["mcdc.yaml", ".mcdc.yaml"];

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectConfig {
    /// Project name recorded in datasets and reports
    #[serde(default = "default_project")]
    pub project: String,

    /// Target safety integrity level
    #[serde(default = "default_sil")]
    pub sil_level: u32,

    /// Source files to analyze
    #[serde(default)]
    pub sources: Vec<String>,

    /// Include directories for the preprocessing step
    #[serde(default)]
    pub include_dirs: Vec<String>,

    /// Directory for generated datasets and reports
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Use the syntax-tree extraction path instead of scanning
    #[serde(default)]
    pub syntax_tree: bool,
}

fn default_project() -> String {
    "unknown".to_string()
}

fn default_sil() -> u32 {
    3
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            sil_level: default_sil(),
            sources: Vec::new(),
            include_dirs: Vec::new(),
            output_dir: None,
            syntax_tree: false,
        }
    }
}

impl ProjectConfig {
    /// Load from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_norway::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Probe a directory for a config file; `Ok(None)` when absent.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Option<Self>> {
        for name in CONFIG_NAMES {
            let candidate = dir.as_ref().join(name);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
        }
        Ok(None)
    }
}
