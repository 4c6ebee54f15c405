use crate::error::{Error, Result};
use crate::graph::{GraphOptions, DEFAULT_CHAIN_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "refgraph.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub chain: ChainConfig,
    pub render: RenderConfig,
    pub census: CensusConfig,
}

/// Diagram traversal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub max_depth: usize,
    pub too_many: usize,
    pub shortnames: bool,
    /// Show referrer counts in node labels
    pub refcounts: bool,
}

/// Chain search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub max_depth: usize,
}

/// External tools
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub viewer: String,
    pub renderer: String,
}

/// Census report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    pub limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            too_many: 10,
            shortnames: true,
            refcounts: false,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_CHAIN_DEPTH,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewer: "xdot".to_string(),
            renderer: "dot".to_string(),
        }
    }
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self { limit: 10 }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Ignoring config {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        depth: Option<usize>,
        too_many: Option<usize>,
        chain_depth: Option<usize>,
        limit: Option<usize>,
    ) {
        if let Some(d) = depth {
            self.graph.max_depth = d;
        }

        if let Some(n) = too_many {
            self.graph.too_many = n;
        }

        if let Some(d) = chain_depth {
            self.chain.max_depth = d;
        }

        if let Some(l) = limit {
            self.census.limit = l;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.graph.max_depth > 100 {
            return Err(Error::config_validation("graph max_depth cannot exceed 100"));
        }

        if self.chain.max_depth > 100 {
            return Err(Error::config_validation("chain max_depth cannot exceed 100"));
        }

        if self.graph.too_many == 0 {
            return Err(Error::config_validation("too_many must be at least 1"));
        }

        if self.render.viewer.trim().is_empty() || self.render.renderer.trim().is_empty() {
            return Err(Error::config_validation("viewer and renderer must be named"));
        }

        Ok(())
    }

    /// Traversal options seeded from the `[graph]` section
    pub fn graph_options<'a>(&self) -> GraphOptions<'a> {
        GraphOptions::new()
            .max_depth(self.graph.max_depth)
            .too_many(self.graph.too_many)
            .shortnames(self.graph.shortnames)
            .refcounts(self.graph.refcounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.graph.max_depth, 3);
        assert_eq!(config.graph.too_many, 10);
        assert!(config.graph.shortnames);
        assert!(!config.graph.refcounts);
        assert_eq!(config.chain.max_depth, 20);
        assert_eq!(config.render.viewer, "xdot");
        assert_eq!(config.render.renderer, "dot");
        assert_eq!(config.census.limit, 10);
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[graph]
max_depth = 5
shortnames = false

[render]
renderer = "neato"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.graph.max_depth, 5);
        assert_eq!(config.graph.too_many, 10);
        assert!(!config.graph.shortnames);
        assert_eq!(config.render.viewer, "xdot");
        assert_eq!(config.render.renderer, "neato");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/refgraph.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[graph\nmax_depth = ").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::ConfigParse(_))));
        assert_eq!(Config::load_or_default(file.path()).graph.max_depth, 3);
    }

    #[test]
    fn test_validation_depth_too_high() {
        let mut config = Config::default();
        config.graph.max_depth = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_depth_allowed() {
        let mut config = Config::default();
        config.graph.max_depth = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_too_many_zero() {
        let mut config = Config::default();
        config.graph.too_many = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_tool() {
        let mut config = Config::default();
        config.render.viewer = "  ".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigValidation(_))));
    }

    #[test]
    fn test_merge_cli() {
        let mut config = Config::default();
        config.merge_cli(Some(7), Some(4), Some(12), None);
        assert_eq!(config.graph.max_depth, 7);
        assert_eq!(config.graph.too_many, 4);
        assert_eq!(config.chain.max_depth, 12);
        assert_eq!(config.census.limit, 10);
    }

    #[test]
    fn test_graph_options() {
        let mut config = Config::default();
        config.graph.max_depth = 6;
        config.graph.shortnames = false;
        config.graph.refcounts = true;
        let options = config.graph_options();
        assert_eq!(options.max_depth, 6);
        assert_eq!(options.too_many, 10);
        assert!(!options.shortnames);
        assert!(options.refcounts);
    }
}
