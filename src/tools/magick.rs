//! ImageMagick (`magick`) backend

use super::{expect_output, run_checked, ImageTool, ToolError};
use crate::job::Dimensions;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

const TOOL: &str = "ImageMagick";

pub struct Magick {
    binary: PathBuf,
}

impl Magick {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    fn run(&self, cmd: &mut Command, dst: &Path) -> Result<(), ToolError> {
        run_checked(TOOL, &self.binary, cmd)?;
        expect_output(TOOL, dst)
    }
}

/// `path[0]`: first frame of a possibly multi-frame image
fn first_frame(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_os_string();
    arg.push("[0]");
    arg
}

/// Read `[0].image.geometry` from `magick convert <img> json:` output.
///
/// Some builds print a bare object for single-frame images.
pub fn parse_geometry(json: &str) -> Result<Dimensions, String> {
    let value: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let image = match &value {
        Value::Array(frames) => frames.first().ok_or("empty image list")?,
        other => other,
    };

    let geometry = &image["image"]["geometry"];
    let side = |key: &str| -> Result<u32, String> {
        geometry[key]
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| format!("missing geometry.{}", key))
    };

    Ok(Dimensions::new(side("width")?, side("height")?))
}

impl ImageTool for Magick {
    fn probe_dimensions(&self, path: &Path) -> Result<Dimensions, ToolError> {
        let output = run_checked(
            TOOL,
            &self.binary,
            self.command().arg("convert").arg(first_frame(path)).arg("json:"),
        )?;

        parse_geometry(&output.stdout).map_err(|detail| ToolError::BadProbe {
            path: path.to_path_buf(),
            detail,
        })
    }

    fn resize_exact(&self, src: &Path, dst: &Path, dims: Dimensions) -> Result<(), ToolError> {
        self.run(
            self.command()
                .arg(src)
                .arg("-resize")
                .arg(format!("{}!", dims))
                .arg(dst),
            dst,
        )
    }

    fn convert_format(&self, src: &Path, dst: &Path) -> Result<(), ToolError> {
        self.run(self.command().arg(first_frame(src)).arg(dst), dst)
    }

    fn composite_alpha(&self, rgb: &Path, alpha: &Path, dst: &Path) -> Result<(), ToolError> {
        self.run(
            self.command()
                .arg(first_frame(rgb))
                .arg(alpha)
                .args(["-alpha", "off", "-compose", "CopyOpacity", "-composite"])
                .arg(dst),
            dst,
        )
    }

    fn convert_to_pfm(&self, src: &Path, dst: &Path) -> Result<(), ToolError> {
        self.run(
            self.command().arg(src).args(["-endian", "LSB"]).arg(dst),
            dst,
        )
    }
}
