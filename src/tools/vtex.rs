//! vtex backend: `vtex -nopause -outdir <dir> <file.txt>`

use super::{run_checked, DirectiveCompiler, ToolError};
use std::path::{Path, PathBuf};
use std::process::Command;

const TOOL: &str = "vtex";

pub struct Vtex {
    binary: PathBuf,
}

impl Vtex {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl DirectiveCompiler for Vtex {
    fn compile(&self, directive: &Path, out_dir: &Path) -> Result<String, ToolError> {
        let output = run_checked(
            TOOL,
            &self.binary,
            Command::new(&self.binary)
                .arg("-nopause")
                .arg("-outdir")
                .arg(out_dir)
                .arg(directive),
        )?;
        Ok(output.log)
    }
}
