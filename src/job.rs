//! Fully resolved conversion instructions
//!
//! A `JobDescriptor` is built once by the planner (or by the single-image
//! export path) and consumed once by the executor.

use crate::textures::{
    ContainerVersion, FlagSet, ResampleFilter, ResizeMethod, SharpenFilter, TextureFormat,
};
use std::path::PathBuf;

/// Extension of the encoded container
pub const CONTAINER_EXTENSION: &str = "vtf";

/// Encoding pair: used without / with an alpha channel present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub color: TextureFormat,
    pub alpha: TextureFormat,
}

impl Encoding {
    pub fn new(color: TextureFormat, alpha: TextureFormat) -> Self {
        Self { color, alpha }
    }

    /// Same format for both slots
    pub fn uniform(format: TextureFormat) -> Self {
        Self::new(format, format)
    }
}

/// Mipmap generation filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipmapSpec {
    pub filter: ResampleFilter,
    pub sharpen: SharpenFilter,
}

/// Power-of-two resize request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub method: ResizeMethod,
    pub filter: ResampleFilter,
    pub sharpen: SharpenFilter,
}

/// Maximum output dimensions, both powers of two
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampDims {
    pub width: u32,
    pub height: u32,
}

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both sides are powers of two
    pub fn is_power_of_two(&self) -> bool {
        crate::textures::is_power_of_two(self.width) && crate::textures::is_power_of_two(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Ready-to-execute conversion of one source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Absolute path of the input image
    pub source_path: PathBuf,
    /// Absolute path of the output container
    pub dest_path: PathBuf,
    pub encoding: Encoding,
    /// `None` disables mipmap generation
    pub mipmaps: Option<MipmapSpec>,
    pub compute_reflectivity: bool,
    /// Image whose luminance becomes the destination's alpha channel
    pub embed_alpha_source: Option<PathBuf>,
    pub resize: Option<ResizeSpec>,
    pub clamp: Option<ClampDims>,
    pub flags: FlagSet,
    pub version: ContainerVersion,
    pub generate_thumbnail: bool,
}

impl JobDescriptor {
    /// File name of the source, for logs and reports
    pub fn source_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}
