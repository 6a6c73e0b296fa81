//! Error types for every stage of a render.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the static catalogs at startup.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("block {guid} references unknown material {material}")]
    UnknownMaterial { guid: String, material: String },

    #[error("block {guid} references unknown size class {size_id}")]
    UnknownSizeClass { guid: String, size_id: u32 },

    #[error("size class key {0} is not an integer")]
    InvalidSizeClassKey(String),
}

/// Malformed or incomplete blueprint documents.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{file}: invalid JSON: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: {field} has malformed value {value:?}")]
    MalformedField {
        file: String,
        field: &'static str,
        value: String,
    },

    #[error("{file}: {field} has {found} entries, expected {expected}")]
    ArrayLength {
        file: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{file}: block rotation id {id} is outside 0..24")]
    RotationId { file: String, id: u32 },

    #[error("{file}: {field} resolves to {value}, outside the supported cell range ±{limit}")]
    CoordinateRange {
        file: String,
        field: &'static str,
        value: f64,
        limit: i64,
    },

    #[error("{0}: unsupported blueprint file extension")]
    UnsupportedExtension(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The realized cell bounds did not fit into the allocated view buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("view buffers of size {size:?} cannot hold cells spanning {min:?}..={max:?}")]
pub struct OverflowError {
    pub size: [usize; 3],
    pub min: [i32; 3],
    pub max: [i32; 3],
}

/// Sprite assets could not be loaded.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to load sprite {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("sprite {} has size {found:?}, expected {expected:?}", .path.display())]
    SpriteSize {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("failed to read font {}: {source}", .path.display())]
    FontIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("font {} is not a valid TrueType/OpenType font", .0.display())]
    InvalidFont(PathBuf),
}

/// Configuration files and option strings that could not be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid aspect ratio {0:?}, expected W:H or a preset name")]
    AspectRatio(String),

    #[error("invalid clip fractions {0:?}, expected up to three values in 0..=1 as side,top,front")]
    Clip(String),
}

/// Errors raised while executing a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("rasterization overflowed after retry: {0}")]
    Overflow(#[from] OverflowError),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("render cancelled")]
    Cancelled,
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Normalize,
    ComputeInfo,
    Rasterize,
    Compose,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Normalize => "normalize",
            Stage::ComputeInfo => "compute info",
            Stage::Rasterize => "rasterize",
            Stage::Compose => "compose",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A render failure tagged with the stage that raised it.
/// `output_path` names the file the render would have written, for cleanup.
#[derive(Error, Debug)]
#[error("{stage} stage failed for {}: {source}", .output_path.display())]
pub struct PipelineError {
    pub stage: Stage,
    pub output_path: PathBuf,
    #[source]
    pub source: RenderError,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, RenderError::Cancelled)
    }
}
