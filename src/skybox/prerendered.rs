//! Renderer backed by face images that were rendered elsewhere.
//!
//! Looks for `<name><face>.exr` (HDR) or `<name><face>.tga` / `.png` (LDR) in
//! a folder. Faces whose size doesn't match the requested view are resized
//! with the image tool.

use super::{FaceView, SceneRenderer};
use crate::job::Dimensions;
use crate::tools::ImageTool;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const LDR_EXTENSIONS: &[&str] = &["tga", "png"];

pub struct PrerenderedFaces<'a> {
    source_dir: PathBuf,
    name: String,
    image: &'a dyn ImageTool,
}

impl<'a> PrerenderedFaces<'a> {
    pub fn new(source_dir: PathBuf, name: &str, image: &'a dyn ImageTool) -> Self {
        Self {
            source_dir,
            name: name.to_string(),
            image,
        }
    }

    fn find(&self, face: &str, extensions: &[&str]) -> Option<PathBuf> {
        extensions
            .iter()
            .map(|ext| self.source_dir.join(format!("{}{}.{}", self.name, face, ext)))
            .find(|p| p.is_file())
    }

    /// Copy `src` to `dst`, resizing when the size is off
    fn place(&self, src: &Path, dst: &Path, dims: Dimensions) -> Result<()> {
        let actual = self.image.probe_dimensions(src)?;
        if actual == dims && src.extension() == dst.extension() {
            std::fs::copy(src, dst)
                .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
        } else {
            debug!("Resizing {} from {} to {}", src.display(), actual, dims);
            self.image.resize_exact(src, dst, dims)?;
        }
        Ok(())
    }
}

impl SceneRenderer for PrerenderedFaces<'_> {
    fn save_state(&mut self) -> Result<()> {
        if !self.source_dir.is_dir() {
            bail!("Face folder {} does not exist", self.source_dir.display());
        }
        Ok(())
    }

    fn restore_state(&mut self) {}

    fn render_face(&mut self, view: &FaceView, path: &Path) -> Result<()> {
        let face = view.face.name();
        let extensions: &[&str] = if view.hdr { &["exr"] } else { LDR_EXTENSIONS };
        let Some(src) = self.find(face, extensions) else {
            bail!(
                "No {}{}.{} in {}",
                self.name,
                face,
                extensions.join("/"),
                self.source_dir.display()
            );
        };
        self.place(&src, path, view.dims)
    }

    fn tonemap_downscale(&mut self, exr: &Path, tga: &Path, dims: Dimensions) -> Result<()> {
        // A hand-made LDR version beats converting the EXR
        let face = crate::paths::file_stem(tga);
        let face = face.strip_prefix(self.name.as_str()).unwrap_or(face.as_str());
        match self.find(face, LDR_EXTENSIONS) {
            Some(ldr) => self.image.resize_exact(&ldr, tga, dims)?,
            None => self.image.resize_exact(exr, tga, dims)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skybox::{face_views, Face};
    use crate::tools::fake::FakeImageTool;
    use std::fs;

    #[test]
    fn test_copies_matching_faces() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("faces");
        let out = dir.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(src.join("duskft.tga"), b"front").unwrap();

        let image = FakeImageTool::default();
        let mut renderer = PrerenderedFaces::new(src, "dusk", &image);
        renderer.save_state().unwrap();

        let view = face_views(512, false, false, false)[0];
        assert_eq!(view.face, Face::Front);
        renderer.render_face(&view, &out.join("duskft.tga")).unwrap();
        assert_eq!(fs::read(out.join("duskft.tga")).unwrap(), b"front");

        let left = face_views(512, false, false, false)[1];
        assert!(renderer.render_face(&left, &out.join("dusklf.tga")).is_err());
    }

    #[test]
    fn test_resizes_mismatched_faces() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("faces");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("duskft.exr"), b"hdr").unwrap();

        let image = FakeImageTool::default().with_dims("duskft.exr", 1024, 1024);
        let mut renderer = PrerenderedFaces::new(src, "dusk", &image);

        let view = face_views(512, true, false, true)[0];
        let target = dir.path().join("duskft.exr");
        renderer.render_face(&view, &target).unwrap();
        assert_eq!(image.calls().last().unwrap(), "resize duskft.exr duskft.exr 512x256");

        renderer
            .tonemap_downscale(&target, &dir.path().join("duskft.tga"), Dimensions::new(256, 128))
            .unwrap();
        assert_eq!(image.calls().last().unwrap(), "resize duskft.exr duskft.tga 256x128");
    }

    #[test]
    fn test_missing_folder() {
        let image = FakeImageTool::default();
        let mut renderer = PrerenderedFaces::new(PathBuf::from("/nonexistent/faces"), "dusk", &image);
        assert!(renderer.save_state().is_err());
    }
}
