//! Error types for catalog loading, selection, export and configuration.

use std::path::PathBuf;

use crate::category::Category;

pub type ComposerResult<T> = Result<T, ComposerError>;

/// Failure to enumerate or fetch the asset catalog.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("asset root '{}' does not exist", .0.display())]
    RootNotFound(PathBuf),

    #[error("failed to discover {category} assets: {source}")]
    Discover {
        category: Category,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch asset '{asset}': {source}")]
    Fetch {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    #[error("asset '{0}' is not part of the catalog")]
    MissingAsset(String),
}

/// Rejected selection change.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("index {index} is out of range for {category} ({len} entries)")]
    OutOfRange {
        category: Category,
        index: usize,
        len: usize,
    },
}

/// Failure to serialize or deliver an exported file.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("svg serialization failed: {0}")]
    Xml(String),

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }
}

/// Invalid or unreadable configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ComposerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
