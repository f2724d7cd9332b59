//! Skybox compilation
//!
//! Renders six cube faces through a [`SceneRenderer`], compiles them with
//! vtex and writes the matching sky materials.
//!
//! Layout under the game folder (`<name>` is the sky name):
//!
//! ```text
//! materialsrc/skybox/<name>/<name>_exr_src/<name><face>.exr        (HDR renders)
//! materialsrc/skybox/<name>/<name>_generated_pfm/<name>_hdr<face>.{pfm,txt}
//! materialsrc/skybox/<name>/<name>_tga_src/<name><face>.{tga,txt}
//! materials/skybox/<name>/<name>[_hdr]<face>.{vtf,vmt}
//! ```
//!
//! vtex lives in `<game>/../bin`.

pub mod directives;
pub mod faces;
pub mod prerendered;

pub use faces::{face_views, Face, FaceView};
pub use prerendered::PrerenderedFaces;

use crate::job::Dimensions;
use crate::tools::{DirectiveCompiler, ImageTool, ToolError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Draws camera views to image files.
///
/// `save_state` is called once before the first face; `restore_state` is
/// guaranteed to run afterwards, also when rendering fails.
pub trait SceneRenderer {
    fn save_state(&mut self) -> anyhow::Result<()>;

    /// Undo everything done since `save_state`, including the capture camera
    fn restore_state(&mut self);

    /// Render `view` to `path` (`.exr` or `.tga`)
    fn render_face(&mut self, view: &FaceView, path: &Path) -> anyhow::Result<()>;

    /// Write a tone-mapped LDR copy of an HDR render at `dims`
    fn tonemap_downscale(&mut self, exr: &Path, tga: &Path, dims: Dimensions) -> anyhow::Result<()>;
}

/// Restores the renderer when dropped
struct RestoreGuard<'r> {
    renderer: &'r mut dyn SceneRenderer,
}

impl<'r> RestoreGuard<'r> {
    fn new(renderer: &'r mut dyn SceneRenderer) -> anyhow::Result<Self> {
        renderer.save_state()?;
        Ok(Self { renderer })
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        debug!("Restoring scene state");
        self.renderer.restore_state();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SkyboxError {
    #[error("vtex not found at {}", .0.display())]
    VtexMissing(PathBuf),

    #[error("Skybox source folder {} already exists (enable overwrite to replace it)", .0.display())]
    DestinationExists(PathBuf),

    #[error("Face size {0} must be a power of two between 8 and 4096")]
    InvalidSize(u32),

    #[error("Invalid sky name '{0}'")]
    InvalidName(String),

    #[error("Could not save scene state: {0:#}")]
    SaveState(anyhow::Error),

    #[error("Failed to render face {face}: {error:#}")]
    Render { face: Face, error: anyhow::Error },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SkyboxError + '_ {
    move |source| SkyboxError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Options for one skybox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyboxSettings {
    /// Game content folder, e.g. `Half-Life 2/ep2`
    pub game_dir: PathBuf,
    /// Overrides `<game>/../bin/vtex.exe`
    pub vtex: Option<PathBuf>,
    pub name: String,
    /// Face width in pixels
    pub size: u32,
    /// Sides are half as tall as they are wide
    pub half_size: bool,
    pub hdr: bool,
    pub hdr_compressed: bool,
    /// Replace the bottom face with an 8x8 placeholder
    pub no_bottom: bool,
    pub overwrite: bool,
    pub keep_exr: bool,
    pub keep_pfm: bool,
}

impl SkyboxSettings {
    /// Configured vtex, or the first of `vtex.exe` / `vtex` in `<game>/../bin`
    pub fn vtex_path(&self) -> PathBuf {
        if let Some(path) = &self.vtex {
            return path.clone();
        }
        let bin = self
            .game_dir
            .parent()
            .map(|p| p.join("bin"))
            .unwrap_or_else(|| PathBuf::from("bin"));
        let exe = bin.join("vtex.exe");
        if exe.is_file() {
            return exe;
        }
        let plain = bin.join("vtex");
        if plain.is_file() {
            plain
        } else {
            exe
        }
    }

    /// `materialsrc/skybox/<name>`
    pub fn source_dir(&self) -> PathBuf {
        self.game_dir.join("materialsrc").join("skybox").join(&self.name)
    }

    /// `materials/skybox/<name>`
    pub fn materials_dir(&self) -> PathBuf {
        self.game_dir.join("materials").join("skybox").join(&self.name)
    }

    fn exr_dir(&self) -> PathBuf {
        self.source_dir().join(format!("{}_exr_src", self.name))
    }

    fn pfm_dir(&self) -> PathBuf {
        self.source_dir().join(format!("{}_generated_pfm", self.name))
    }

    fn tga_dir(&self) -> PathBuf {
        self.source_dir().join(format!("{}_tga_src", self.name))
    }

    pub fn validate(&self) -> Result<(), SkyboxError> {
        if !crate::textures::is_power_of_two(self.size) || !(8..=4096).contains(&self.size) {
            return Err(SkyboxError::InvalidSize(self.size));
        }
        let name = self.name.trim();
        if name.is_empty() || name != self.name || self.name.contains(['/', '\\']) {
            return Err(SkyboxError::InvalidName(self.name.clone()));
        }
        Ok(())
    }
}

/// What a compile run produced
#[derive(Debug, Clone, Default)]
pub struct SkyboxReport {
    pub materials_dir: PathBuf,
    pub materials: Vec<PathBuf>,
    /// Combined vtex output
    pub log: String,
}

pub struct SkyboxCompiler<'a> {
    settings: &'a SkyboxSettings,
    image: &'a dyn ImageTool,
    compiler: &'a dyn DirectiveCompiler,
}

impl<'a> SkyboxCompiler<'a> {
    pub fn new(
        settings: &'a SkyboxSettings,
        image: &'a dyn ImageTool,
        compiler: &'a dyn DirectiveCompiler,
    ) -> Self {
        Self {
            settings,
            image,
            compiler,
        }
    }

    /// Run the whole workflow
    pub fn compile(&self, renderer: &mut dyn SceneRenderer) -> Result<SkyboxReport, SkyboxError> {
        let s = self.settings;
        s.validate()?;

        let vtex = s.vtex_path();
        if !vtex.is_file() {
            return Err(SkyboxError::VtexMissing(vtex));
        }

        self.prepare_source_dirs()?;

        let views = face_views(s.size, s.half_size, s.no_bottom, s.hdr);
        self.render(renderer, &views)?;

        let materials_dir = s.materials_dir();
        if materials_dir.exists() {
            fs::remove_dir_all(&materials_dir).map_err(io_err(&materials_dir))?;
        }
        fs::create_dir_all(&materials_dir).map_err(io_err(&materials_dir))?;

        let mut report = SkyboxReport {
            materials_dir: materials_dir.clone(),
            ..Default::default()
        };

        for view in &views {
            self.compile_face(view.face, &materials_dir, &mut report)?;
        }

        self.cleanup();
        info!("Skybox '{}' written to {}", s.name, materials_dir.display());
        Ok(report)
    }

    fn prepare_source_dirs(&self) -> Result<(), SkyboxError> {
        let s = self.settings;
        let dest = s.source_dir();
        if dest.is_dir() {
            if !s.overwrite {
                return Err(SkyboxError::DestinationExists(dest));
            }
            fs::remove_dir_all(&dest).map_err(io_err(&dest))?;
        }

        for dir in [s.exr_dir(), s.pfm_dir(), s.tga_dir()] {
            fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        }
        Ok(())
    }

    fn render(&self, renderer: &mut dyn SceneRenderer, views: &[FaceView]) -> Result<(), SkyboxError> {
        let s = self.settings;
        let guard = RestoreGuard::new(renderer).map_err(SkyboxError::SaveState)?;

        for view in views {
            let face = view.face;
            let ldr = s.tga_dir().join(format!("{}{}.tga", s.name, face));
            debug!("Rendering {} at {}", face, view.dims);

            if s.hdr {
                let exr = s.exr_dir().join(format!("{}{}.exr", s.name, face));
                guard
                    .renderer
                    .render_face(view, &exr)
                    .map_err(|error| SkyboxError::Render { face, error })?;

                let half = Dimensions::new((view.dims.width / 2).max(1), (view.dims.height / 2).max(1));
                guard
                    .renderer
                    .tonemap_downscale(&exr, &ldr, half)
                    .map_err(|error| SkyboxError::Render { face, error })?;
            } else {
                guard
                    .renderer
                    .render_face(view, &ldr)
                    .map_err(|error| SkyboxError::Render { face, error })?;
            }
        }

        Ok(())
    }

    fn compile_face(
        &self,
        face: Face,
        materials_dir: &Path,
        report: &mut SkyboxReport,
    ) -> Result<(), SkyboxError> {
        let s = self.settings;

        if s.hdr {
            let exr = s.exr_dir().join(format!("{}{}.exr", s.name, face));
            let stem = format!("{}_hdr{}", s.name, face);
            let pfm = s.pfm_dir().join(format!("{}.pfm", stem));
            self.image.convert_to_pfm(&exr, &pfm)?;

            let txt = s.pfm_dir().join(format!("{}.txt", stem));
            fs::write(&txt, directives::hdr_directive(s.size, s.hdr_compressed))
                .map_err(io_err(&txt))?;
            report.log.push_str(&self.compiler.compile(&txt, materials_dir)?);

            let vmt = materials_dir.join(format!("{}.vmt", stem));
            let material = directives::hdr_material(&s.name, face, s.hdr_compressed, s.half_size);
            fs::write(&vmt, material.to_vmt()).map_err(io_err(&vmt))?;
            report.materials.push(vmt);
        }

        let stem = format!("{}{}", s.name, face);
        let txt = s.tga_dir().join(format!("{}.txt", stem));
        fs::write(&txt, directives::ldr_directive()).map_err(io_err(&txt))?;
        report.log.push_str(&self.compiler.compile(&txt, materials_dir)?);

        let vmt = materials_dir.join(format!("{}.vmt", stem));
        let material = directives::ldr_material(&s.name, face, s.half_size);
        fs::write(&vmt, material.to_vmt()).map_err(io_err(&vmt))?;
        report.materials.push(vmt);

        Ok(())
    }

    /// Drop intermediate HDR sources unless asked to keep them
    fn cleanup(&self) {
        let s = self.settings;

        if s.hdr && !s.keep_exr {
            let dir = s.exr_dir();
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!("Could not remove {}: {}", dir.display(), e);
            }
        }

        if s.hdr && !s.keep_pfm {
            let pfms = fs::read_dir(s.pfm_dir())
                .into_iter()
                .flatten()
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| crate::paths::has_extension_in(p, &[".pfm"]));
            for pfm in pfms {
                if let Err(e) = fs::remove_file(&pfm) {
                    warn!("Could not remove {}: {}", pfm.display(), e);
                }
            }
        }
    }
}
