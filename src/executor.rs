//! Runs one job through the external tools
//!
//! `convert` never fails as a whole: every per-job problem ends up in the
//! returned `JobOutcome` so a batch keeps going. Intermediate images live in
//! the batch temp directory and are removed when the job finishes.

use crate::hash::SourceKey;
use crate::job::{Dimensions, JobDescriptor, CONTAINER_EXTENSION};
use crate::paths::{file_stem, has_extension_in};
use crate::tools::{ImageTool, TextureEncoder, ToolError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions VTFCmd reads directly
pub const NATIVE_EXTENSIONS: &[&str] = &[".tga", ".jpeg", ".jpg", ".png", ".bmp", ".dds", ".gif"];

/// Why a job was not attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    DestinationDirMissing(PathBuf),
    NotPowerOfTwo(Dimensions),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DestinationDirMissing(dir) => {
                write!(f, "destination folder {} does not exist", dir.display())
            }
            SkipReason::NotPowerOfTwo(dims) => {
                write!(f, "{} is not a power of two and resizing is off", dims)
            }
        }
    }
}

/// Why a job failed
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Could not read image size: {0}")]
    Probe(#[source] ToolError),

    #[error("Could not convert to TGA: {0}")]
    Convert(#[source] ToolError),

    #[error("Encoder could not run: {0}")]
    Tool(#[source] ToolError),

    #[error("Could not create staging folder {}: {source}", path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder did not produce {}", .0.display())]
    MissingEncoderOutput(PathBuf),

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one job
#[derive(Debug)]
pub enum JobOutcome {
    Converted { dest: PathBuf, log: String },
    Skipped(SkipReason),
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, JobOutcome::Converted { .. })
    }
}

/// Temp files and folders removed on drop
#[derive(Default)]
struct TempArtifacts {
    paths: Vec<PathBuf>,
}

impl TempArtifacts {
    fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        for path in &self.paths {
            let removed = if path.is_dir() {
                fs::remove_dir_all(path)
            } else if path.exists() {
                fs::remove_file(path)
            } else {
                Ok(())
            };
            if let Err(e) = removed {
                debug!("Could not remove temp {}: {}", path.display(), e);
            }
        }
    }
}

/// Executes jobs with a fixed set of tools and a temp directory
pub struct Executor<'a> {
    image: &'a dyn ImageTool,
    encoder: &'a dyn TextureEncoder,
    temp_dir: &'a Path,
}

impl<'a> Executor<'a> {
    pub fn new(image: &'a dyn ImageTool, encoder: &'a dyn TextureEncoder, temp_dir: &'a Path) -> Self {
        Self {
            image,
            encoder,
            temp_dir,
        }
    }

    /// Convert one job
    pub fn convert(&self, job: &JobDescriptor) -> JobOutcome {
        let name = job.source_name();

        match job.dest_path.parent() {
            Some(dir) if dir.is_dir() => {}
            parent => {
                let dir = parent.map(Path::to_path_buf).unwrap_or_default();
                warn!("Skipping {}: destination folder {} does not exist", name, dir.display());
                return JobOutcome::Skipped(SkipReason::DestinationDirMissing(dir));
            }
        }

        let dims = match self.image.probe_dimensions(&job.source_path) {
            Ok(dims) => dims,
            Err(e) => return JobOutcome::Failed(JobError::Probe(e)),
        };

        if !dims.is_power_of_two() {
            match &job.resize {
                None if job.clamp.is_none() => {
                    warn!("Skipping {}: {} is not a power of two and resizing is off", name, dims);
                    return JobOutcome::Skipped(SkipReason::NotPowerOfTwo(dims));
                }
                Some(resize) => debug!(
                    "{} ({}) will be resized to {}x{}",
                    name,
                    dims,
                    resize.method.align(dims.width),
                    resize.method.align(dims.height)
                ),
                None => {}
            }
        }

        let key = SourceKey::for_path(&job.source_path).to_hex();
        let stem = file_stem(&job.source_path);
        let mut temps = TempArtifacts::default();

        let mut input = job.source_path.clone();
        let mut with_alpha = false;

        if let Some(alpha) = &job.embed_alpha_source {
            let target = self.temp_dir.join(format!("{}.{}.wa.tga", stem, key));
            if let Some(path) = self.embed_alpha(job, alpha, dims, &stem, &key, temps.track(target)) {
                input = path;
                with_alpha = true;
            }
        }

        if !with_alpha && !has_extension_in(&job.source_path, NATIVE_EXTENSIONS) {
            let tga = temps.track(self.temp_dir.join(format!("{}.{}.tga", stem, key)));
            debug!("Converting {} to {}", name, tga.display());
            if let Err(e) = self.image.convert_format(&job.source_path, &tga) {
                return JobOutcome::Failed(JobError::Convert(e));
            }
            input = tga;
        }

        // Encoder output goes to a folder only this job writes to
        let stage = temps.track(self.temp_dir.join(format!("{}.{}.out", stem, key)));
        if let Err(source) = fs::create_dir_all(&stage) {
            return JobOutcome::Failed(JobError::Stage { path: stage, source });
        }

        debug!("Encoding {} with VTFCmd ({})", name, self.encoder.variant());
        let output = match self.encoder.encode(job, &input, &stage) {
            Ok(output) => output,
            Err(e) => return JobOutcome::Failed(JobError::Tool(e)),
        };
        debug!("Encoder output for {}:\n{}", name, output.log.trim_end());
        if !output.exit_ok {
            warn!("Encoder reported an error for {}", name);
        }

        // The encoder names its output after the input stem
        let produced = stage.join(format!("{}.{}", file_stem(&input), CONTAINER_EXTENSION));
        if !produced.is_file() {
            return JobOutcome::Failed(JobError::MissingEncoderOutput(produced));
        }

        if let Err(source) = replace_file(&produced, &job.dest_path) {
            return JobOutcome::Failed(JobError::Rename {
                from: produced,
                to: job.dest_path.clone(),
                source,
            });
        }

        debug!("Converted {} -> {}", name, job.dest_path.display());
        JobOutcome::Converted {
            dest: job.dest_path.clone(),
            log: output.log,
        }
    }

    /// Composite `alpha` into the source's alpha channel, writing `target`.
    ///
    /// Returns `None` (with a warning) when the job should continue without
    /// an embedded alpha.
    fn embed_alpha(
        &self,
        job: &JobDescriptor,
        alpha: &Path,
        dims: Dimensions,
        stem: &str,
        key: &str,
        target: PathBuf,
    ) -> Option<PathBuf> {
        let name = job.source_name();
        if !alpha.is_file() {
            warn!("Alpha source {} not found, converting {} without it", alpha.display(), name);
            return None;
        }

        let alpha_dims = match self.image.probe_dimensions(alpha) {
            Ok(d) => d,
            Err(e) => {
                warn!("Could not read alpha source {}: {}", alpha.display(), e);
                return None;
            }
        };

        // Removed as soon as compositing is done
        let mut resized_guard = TempArtifacts::default();
        let alpha_input = if alpha_dims != dims {
            let resized = resized_guard.track(self.temp_dir.join(format!("{}.{}.alpha.tga", stem, key)));
            debug!("Resizing alpha source {} from {} to {}", alpha.display(), alpha_dims, dims);
            if let Err(e) = self.image.resize_exact(alpha, &resized, dims) {
                warn!("Could not resize alpha source for {}: {}", name, e);
                return None;
            }
            resized
        } else {
            alpha.to_path_buf()
        };

        let result = self.image.composite_alpha(&job.source_path, &alpha_input, &target);
        drop(resized_guard);

        match result {
            Ok(()) => Some(target),
            Err(e) => {
                warn!("Could not embed alpha into {}, continuing without it: {}", name, e);
                None
            }
        }
    }
}

/// Move `from` over `to`, replacing an existing file
fn replace_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.is_file() {
        fs::remove_file(to)?;
    }
    // The staging folder may sit on another filesystem
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}
