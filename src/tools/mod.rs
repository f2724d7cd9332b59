//! External programs
//!
//! Each program sits behind a narrow trait so the executor and the skybox
//! compiler never build argument lists themselves:
//!
//! - [`ImageTool`]: ImageMagick (`magick`) for probing, resizing, format
//!   conversion and alpha compositing
//! - [`TextureEncoder`]: VTFCmd, current or legacy build
//! - [`DirectiveCompiler`]: `vtex`, driven by `.txt` directive files
//!
//! The CLI-backed implementations live in the submodules, binary lookup in
//! [`locate`].

pub mod locate;
pub mod magick;
pub mod vtex;
pub mod vtfcmd;

#[cfg(test)]
pub mod fake;

use crate::job::{Dimensions, JobDescriptor};
use crate::textures::EncoderVariant;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub use locate::{locate_tool, Tool};
pub use magick::Magick;
pub use vtex::Vtex;
pub use vtfcmd::{encoder_args, VtfCmd};

/// Failures talking to an external program
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} not found (looked in settings, bin/ and PATH)")]
    NotFound { tool: &'static str },

    #[error("Failed to run {tool} ({}): {source}", binary.display())]
    Spawn {
        tool: &'static str,
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {output}")]
    Failed {
        tool: &'static str,
        status: String,
        output: String,
    },

    #[error("{tool} did not produce {}", path.display())]
    NoOutput { tool: &'static str, path: PathBuf },

    #[error("Could not read dimensions of {}: {detail}", path.display())]
    BadProbe { path: PathBuf, detail: String },
}

/// Raster operations
pub trait ImageTool: Send + Sync {
    /// Pixel size of the first frame
    fn probe_dimensions(&self, path: &Path) -> Result<Dimensions, ToolError>;

    /// Resize to exactly `dims`, ignoring aspect ratio
    fn resize_exact(&self, src: &Path, dst: &Path, dims: Dimensions) -> Result<(), ToolError>;

    /// Write the first frame of `src` in the format implied by `dst`'s extension
    fn convert_format(&self, src: &Path, dst: &Path) -> Result<(), ToolError>;

    /// Copy the luminance of `alpha` into the alpha channel of `rgb`
    fn composite_alpha(&self, rgb: &Path, alpha: &Path, dst: &Path) -> Result<(), ToolError>;

    /// Little-endian PFM for vtex
    fn convert_to_pfm(&self, src: &Path, dst: &Path) -> Result<(), ToolError>;
}

/// Result of one encoder run
#[derive(Debug, Clone, Default)]
pub struct EncodeOutput {
    pub exit_ok: bool,
    /// Combined stdout and stderr
    pub log: String,
}

/// Texture container encoder
pub trait TextureEncoder: Send + Sync {
    fn variant(&self) -> EncoderVariant;

    /// Encode `input` into `<output_dir>/<input stem>.vtf`.
    ///
    /// A non-zero exit is reported in `EncodeOutput`, not as an error.
    fn encode(
        &self,
        job: &JobDescriptor,
        input: &Path,
        output_dir: &Path,
    ) -> Result<EncodeOutput, ToolError>;
}

/// Compiler for `.txt` texture directive files
pub trait DirectiveCompiler {
    /// Compile `directive` into `out_dir`, returning the tool's output
    fn compile(&self, directive: &Path, out_dir: &Path) -> Result<String, ToolError>;
}

/// Captured result of a finished process
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    /// stdout followed by stderr
    pub log: String,
}

/// Run a prepared command and capture everything it printed
pub(crate) fn run(tool: &'static str, binary: &Path, cmd: &mut Command) -> Result<ProcessOutput, ToolError> {
    debug!("Running {:?}", cmd);

    let output = cmd.output().map_err(|source| ToolError::Spawn {
        tool,
        binary: binary.to_path_buf(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let mut log = stdout.clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !log.is_empty() && !log.ends_with('\n') {
            log.push('\n');
        }
        log.push_str(&stderr);
    }

    Ok(ProcessOutput {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout,
        log,
    })
}

/// Like [`run`], but a non-zero exit is an error
pub(crate) fn run_checked(
    tool: &'static str,
    binary: &Path,
    cmd: &mut Command,
) -> Result<ProcessOutput, ToolError> {
    let output = run(tool, binary, cmd)?;
    if !output.success {
        return Err(ToolError::Failed {
            tool,
            status: output.status,
            output: output.log.trim().to_string(),
        });
    }
    Ok(output)
}

/// Error unless `path` exists after a tool run
pub(crate) fn expect_output(tool: &'static str, path: &Path) -> Result<(), ToolError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::NoOutput {
            tool,
            path: path.to_path_buf(),
        })
    }
}
