use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{DocwrightError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Page generation settings
    pub generation: GenerationConfig,

    /// Call graph projection settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Extra noise words merged into the built-in lists
    #[serde(default)]
    pub noise: NoiseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Source directories to analyze
    pub source_dirs: Vec<PathBuf>,

    /// Glob patterns to ignore on top of .gitignore
    pub ignore_patterns: Vec<String>,

    /// Documentation output directory
    pub docs_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Languages to support
    pub languages: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on concurrently running page generations
    pub max_concurrency: usize,

    /// Manifest file name, relative to the docs directory
    pub manifest_file: String,

    /// Directory with `file.md` / `overview.md` templates overriding the built-ins
    pub template_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Maximum number of nodes kept in a rendered diagram
    pub max_nodes: usize,

    /// Maximum characters of a node label
    pub label_budget: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoiseSettings {
    /// Names ignored in every language
    #[serde(default)]
    pub common: Vec<String>,

    /// Names ignored for one language tag only
    #[serde(default)]
    pub languages: HashMap<String, Vec<String>>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 40,
            label_budget: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                source_dirs: vec![PathBuf::from("src")],
                ignore_patterns: vec![
                    "target/".to_string(),
                    "node_modules/".to_string(),
                    ".git/".to_string(),
                    "*.tmp".to_string(),
                ],
                docs_dir: PathBuf::from("docs"),
            },
            parsing: ParsingConfig {
                languages: vec![
                    "rust".to_string(),
                    "java".to_string(),
                    "python".to_string(),
                    "csharp".to_string(),
                    "javascript".to_string(),
                ],
                max_file_size: 1024 * 1024, // 1MB
            },
            generation: GenerationConfig {
                max_concurrency: 4,
                manifest_file: ".docwright-manifest.json".to_string(),
                template_dir: None,
            },
            graph: GraphConfig::default(),
            noise: NoiseSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| DocwrightError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DocwrightError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = ["Docwright.toml", "docwright.toml", ".docwright.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Absolute-or-relative location of the build manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.project.docs_dir.join(&self.generation.manifest_file)
    }

    fn validate(&self) -> Result<()> {
        if self.generation.max_concurrency == 0 {
            return Err(DocwrightError::Config(
                "generation.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.project.source_dirs.is_empty() {
            return Err(DocwrightError::Config(
                "project.source_dirs must name at least one directory".to_string(),
            ));
        }
        Ok(())
    }
}
