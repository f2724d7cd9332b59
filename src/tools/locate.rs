//! Finding external binaries.
//!
//! Search order:
//! 1. The path configured in the settings file
//! 2. `bin/` next to our executable (bundled tools)
//! 3. `bin/` under the working directory
//! 4. `PATH`

use super::ToolError;
use crate::config::ToolPaths;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The external programs we drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Encoder,
    EncoderLegacy,
    Magick,
    Vtex,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Encoder => "VTFCmd",
            Tool::EncoderLegacy => "VTFCmd (legacy)",
            Tool::Magick => "ImageMagick",
            Tool::Vtex => "vtex",
        }
    }

    /// Locations relative to a `bin/` directory
    fn bundled(&self) -> &'static [&'static str] {
        match self {
            Tool::Encoder => &["vtfcmd/VTFCmd.exe", "vtfcmd/VTFCmd", "VTFCmd.exe", "VTFCmd"],
            Tool::EncoderLegacy => &["vtfcmd_old/VTFCmd.exe", "vtfcmd_old/VTFCmd"],
            Tool::Magick => &["imgmagick/magick.exe", "imgmagick/magick", "magick.exe", "magick"],
            Tool::Vtex => &["vtex.exe", "vtex"],
        }
    }

    /// Names to look up on PATH
    fn path_names(&self) -> &'static [&'static str] {
        match self {
            Tool::Encoder => &["VTFCmd", "vtfcmd"],
            Tool::EncoderLegacy => &[],
            Tool::Magick => &["magick"],
            Tool::Vtex => &["vtex"],
        }
    }

    fn configured<'a>(&self, tools: &'a ToolPaths) -> Option<&'a Path> {
        match self {
            Tool::Encoder => tools.encoder.as_deref(),
            Tool::EncoderLegacy => tools.encoder_legacy.as_deref(),
            Tool::Magick => tools.magick.as_deref(),
            Tool::Vtex => tools.vtex.as_deref(),
        }
    }
}

/// Find `tool` using the full search order
pub fn locate_tool(tool: Tool, tools: &ToolPaths) -> Result<PathBuf, ToolError> {
    let mut roots = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.join("bin"));
        }
    }
    roots.push(PathBuf::from("bin"));

    if let Some(found) = locate_in(tool, tool.configured(tools), &roots) {
        return Ok(found);
    }

    for name in tool.path_names() {
        if let Ok(path) = which::which(name) {
            debug!("Found {} on PATH: {}", tool.label(), path.display());
            return Ok(path);
        }
    }

    Err(ToolError::NotFound { tool: tool.label() })
}

/// Configured path, then bundled locations under each of `roots`
fn locate_in(tool: Tool, configured: Option<&Path>, roots: &[PathBuf]) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(
            "Configured {} path {} does not exist, searching elsewhere",
            tool.label(),
            path.display()
        );
    }

    for root in roots {
        for rel in tool.bundled() {
            let candidate = root.join(rel);
            if candidate.is_file() {
                debug!("Found bundled {}: {}", tool.label(), candidate.display());
                return Some(candidate);
            }
        }
    }

    None
}
