//! Composer configuration.
//!
//! Serialized as camelCase JSON:
//!
//! ```json
//! {
//!   "assetsDir": "assets",
//!   "canvasSize": 640,
//!   "svgExportSize": 32,
//!   "renderPolicy": "latest-requested",
//!   "catalogPolicy": "fail",
//!   "seed": 42
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compositor::RenderPolicy;
use crate::error::ConfigError;
use crate::export::DEFAULT_SVG_EXPORT_SIZE;
use crate::surface::{DEFAULT_CANVAS_SIZE, MAX_CANVAS_SIZE};

/// What to do when the asset catalog cannot be loaded at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum CatalogPolicy {
    /// Abort start-up with the load error.
    #[default]
    Fail,
    /// Log the error and continue with an empty catalog.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfig {
    /// Root of the asset tree, one sub-directory per category.
    pub assets_dir: PathBuf,

    /// Side length of the square canvas, in pixels.
    pub canvas_size: u32,

    /// Side length and viewBox extent of exported SVG documents.
    pub svg_export_size: u32,

    pub render_policy: RenderPolicy,

    pub catalog_policy: CatalogPolicy,

    /// Seed for reproducible randomization. Uses OS entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            canvas_size: DEFAULT_CANVAS_SIZE,
            svg_export_size: DEFAULT_SVG_EXPORT_SIZE,
            render_policy: RenderPolicy::default(),
            catalog_policy: CatalogPolicy::default(),
            seed: None,
        }
    }
}

impl ComposerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn with_canvas_size(mut self, size: u32) -> Self {
        self.canvas_size = size;
        self
    }

    pub fn with_render_policy(mut self, policy: RenderPolicy) -> Self {
        self.render_policy = policy;
        self
    }

    pub fn with_catalog_policy(mut self, policy: CatalogPolicy) -> Self {
        self.catalog_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects settings that cannot produce an image.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas_size == 0 {
            return Err(ConfigError::Invalid("canvasSize must be positive".into()));
        }
        if self.canvas_size > MAX_CANVAS_SIZE {
            return Err(ConfigError::Invalid(format!(
                "canvasSize {} exceeds the maximum of {MAX_CANVAS_SIZE}",
                self.canvas_size
            )));
        }
        if self.svg_export_size == 0 {
            return Err(ConfigError::Invalid("svgExportSize must be positive".into()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses and validates a config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file.
    ///
    /// A relative `assetsDir` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&json)?;
        if config.assets_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.assets_dir = parent.join(&config.assets_dir);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_sizes() {
        let config = ComposerConfig::default();
        assert_eq!(config.canvas_size, 640);
        assert_eq!(config.svg_export_size, 32);
        assert_eq!(config.render_policy, RenderPolicy::LatestRequested);
        assert_eq!(config.catalog_policy, CatalogPolicy::Fail);
        assert!(config.seed.is_none());
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = ComposerConfig::from_json("{}").unwrap();
        assert_eq!(config, ComposerConfig::default());
    }

    #[test]
    fn json_uses_camel_case_and_kebab_enums() {
        let config = ComposerConfig::from_json(
            r#"{ "canvasSize": 128, "renderPolicy": "last-settled", "catalogPolicy": "empty", "seed": 5 }"#,
        )
        .unwrap();
        assert_eq!(config.canvas_size, 128);
        assert_eq!(config.render_policy, RenderPolicy::LastSettled);
        assert_eq!(config.catalog_policy, CatalogPolicy::Empty);
        assert_eq!(config.seed, Some(5));

        let json = config.to_json().unwrap();
        assert!(json.contains("\"svgExportSize\""));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(
            ComposerConfig::from_json(r#"{ "canvasSize": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(ComposerConfig::new().with_canvas_size(0).validate().is_err());
    }

    #[test]
    fn oversized_canvas_is_rejected() {
        assert!(matches!(
            ComposerConfig::from_json(r#"{ "canvasSize": 4294967295 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(ComposerConfig::new().with_canvas_size(8193).validate().is_err());
        assert!(ComposerConfig::new().with_canvas_size(MAX_CANVAS_SIZE).validate().is_ok());
    }

    #[test]
    fn load_resolves_assets_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");
        std::fs::write(&path, r#"{ "assetsDir": "art" }"#).unwrap();

        let config = ComposerConfig::load(&path).unwrap();
        assert_eq!(config.assets_dir, dir.path().join("art"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ComposerConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
