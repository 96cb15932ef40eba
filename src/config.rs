//! Generation settings: output target, explicit rendering context, run configuration.

use crate::error::ConfigError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Output language; exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Cpp,
    Python,
    Lua,
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c++" | "cpp" => Ok(Target::Cpp),
            "python" | "py" => Ok(Target::Python),
            "lua" | "wireshark" => Ok(Target::Lua),
            _ => Err(ConfigError::UnknownTarget(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Cpp => "C++",
            Target::Python => "Python",
            Target::Lua => "Lua",
        })
    }
}

/// Schema-wide options consulted while building the model and rendering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderContext {
    /// Flatten every qualified name to its bare name and drop namespace wrapping.
    pub merge_namespaces: bool,
}

impl RenderContext {
    pub fn merged() -> Self {
        RenderContext { merge_namespaces: true }
    }

    /// Namespace actually used for names declared in a group with namespace `ns`.
    pub fn effective_namespace<'a>(&self, ns: Option<&'a str>) -> Option<&'a str> {
        if self.merge_namespaces {
            None
        } else {
            ns
        }
    }
}

/// Everything one generation run needs.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    pub sources: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub target: Target,
    pub context: RenderContext,
}

impl GeneratorConfig {
    /// Check the configuration before any input is read.
    pub fn validate(&self) -> Result<&PathBuf, ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        self.output_dir.as_ref().ok_or(ConfigError::NoOutputDir)
    }
}
