//! Recording test doubles that write canned outputs instead of spawning
//! processes

use super::{DirectiveCompiler, EncodeOutput, ImageTool, TextureEncoder, ToolError};
use crate::job::{Dimensions, JobDescriptor};
use crate::textures::EncoderVariant;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn write(path: &Path, contents: &[u8]) -> Result<(), ToolError> {
    fs::write(path, contents).map_err(|e| ToolError::Failed {
        tool: "fake",
        status: "io".into(),
        output: e.to_string(),
    })
}

fn failure(tool: &'static str) -> ToolError {
    ToolError::Failed {
        tool,
        status: "exit status: 1".into(),
        output: "canned failure".into(),
    }
}

#[derive(Default)]
pub struct FakeImageTool {
    /// Dimensions by file name; anything else is 512x512
    pub dims: HashMap<String, Dimensions>,
    pub fail_probe: bool,
    pub fail_convert: bool,
    pub fail_composite: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeImageTool {
    pub fn with_dims(mut self, name: &str, width: u32, height: u32) -> Self {
        self.dims.insert(name.to_string(), Dimensions::new(width, height));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl ImageTool for FakeImageTool {
    fn probe_dimensions(&self, path: &Path) -> Result<Dimensions, ToolError> {
        self.record(format!("probe {}", name(path)));
        if self.fail_probe {
            return Err(ToolError::BadProbe {
                path: path.to_path_buf(),
                detail: "canned failure".into(),
            });
        }
        Ok(self
            .dims
            .get(&name(path))
            .copied()
            .unwrap_or(Dimensions::new(512, 512)))
    }

    fn resize_exact(&self, src: &Path, dst: &Path, dims: Dimensions) -> Result<(), ToolError> {
        self.record(format!("resize {} {} {}", name(src), name(dst), dims));
        write(dst, b"resized")
    }

    fn convert_format(&self, src: &Path, dst: &Path) -> Result<(), ToolError> {
        self.record(format!("convert {} {}", name(src), name(dst)));
        if self.fail_convert {
            return Err(failure("fake magick"));
        }
        write(dst, b"converted")
    }

    fn composite_alpha(&self, rgb: &Path, alpha: &Path, dst: &Path) -> Result<(), ToolError> {
        self.record(format!("composite {} {} {}", name(rgb), name(alpha), name(dst)));
        if self.fail_composite {
            return Err(failure("fake magick"));
        }
        write(dst, b"composited")
    }

    fn convert_to_pfm(&self, src: &Path, dst: &Path) -> Result<(), ToolError> {
        self.record(format!("pfm {} {}", name(src), name(dst)));
        write(dst, b"PF")
    }
}

/// One recorded encoder invocation
#[derive(Debug, Clone)]
pub struct EncodeCall {
    pub source: PathBuf,
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

pub struct FakeEncoder {
    pub variant: EncoderVariant,
    /// Write `<output_dir>/<input stem>.vtf`
    pub produce_output: bool,
    pub exit_ok: bool,
    pub calls: Mutex<Vec<EncodeCall>>,
}

impl Default for FakeEncoder {
    fn default() -> Self {
        Self {
            variant: EncoderVariant::Current,
            produce_output: true,
            exit_ok: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEncoder {
    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl TextureEncoder for FakeEncoder {
    fn variant(&self) -> EncoderVariant {
        self.variant
    }

    fn encode(
        &self,
        job: &JobDescriptor,
        input: &Path,
        output_dir: &Path,
    ) -> Result<EncodeOutput, ToolError> {
        self.calls.lock().unwrap().push(EncodeCall {
            source: job.source_path.clone(),
            input: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        });

        if self.produce_output {
            let stem = crate::paths::file_stem(input);
            write(&output_dir.join(format!("{}.vtf", stem)), b"VTF\0")?;
        }

        Ok(EncodeOutput {
            exit_ok: self.exit_ok,
            log: format!("encoded {}", name(input)),
        })
    }
}

#[derive(Default)]
pub struct FakeCompiler {
    pub calls: Mutex<Vec<PathBuf>>,
}

impl FakeCompiler {
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl DirectiveCompiler for FakeCompiler {
    fn compile(&self, directive: &Path, out_dir: &Path) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(directive.to_path_buf());
        let stem = crate::paths::file_stem(directive);
        write(&out_dir.join(format!("{}.vtf", stem)), b"VTF\0")?;
        Ok(format!("compiled {}", name(directive)))
    }
}
