//! Settings layers and the settings file
//!
//! Three layers feed the parameter resolver:
//! - `SharedSettings`: tool-wide values, every field concrete
//! - `BatchSettings`: per-run overrides, `None` inherits from shared
//! - `ImageSettings`: per-image overrides, `None` inherits from batch
//!
//! Resize and mipmap filter choices exist only on the shared layer.
//!
//! The layers plus tool locations are stored in
//! `~/.config/vtfbatch/settings.json`.

use crate::textures::{
    is_valid_clamp, ContainerVersion, EncoderVariant, FlagSet, ResampleFilter, ResizeMethod,
    SharpenFilter, TextureFormat,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool-wide settings and global defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedSettings {
    /// Which VTFCmd build to run
    pub encoder: EncoderVariant,
    /// Container version written to every texture
    pub version: ContainerVersion,
    pub generate_thumbnail: bool,

    pub resize_filter: ResampleFilter,
    pub resize_sharpen: SharpenFilter,
    pub mipmap_filter: ResampleFilter,
    pub mipmap_sharpen: SharpenFilter,

    // Global defaults for the fields the batch and image layers may override
    pub format: TextureFormat,
    pub format_alpha: TextureFormat,
    pub mipmaps: bool,
    pub resize: bool,
    pub resize_method: ResizeMethod,
    pub clamp: bool,
    pub clamp_width: u32,
    pub clamp_height: u32,
    pub compute_reflectivity: bool,
    pub flags: FlagSet,
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self {
            encoder: EncoderVariant::Current,
            version: ContainerVersion::V7_4,
            generate_thumbnail: true,
            resize_filter: ResampleFilter::Cubic,
            resize_sharpen: SharpenFilter::SharpenMedium,
            mipmap_filter: ResampleFilter::Point,
            mipmap_sharpen: SharpenFilter::SharpenSoft,
            format: TextureFormat::Dxt1,
            format_alpha: TextureFormat::Dxt5,
            mipmaps: true,
            resize: false,
            resize_method: ResizeMethod::Nearest,
            clamp: false,
            clamp_width: 4096,
            clamp_height: 4096,
            compute_reflectivity: true,
            flags: FlagSet::empty(),
        }
    }
}

/// Batch-level overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TextureFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_alpha: Option<TextureFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mipmaps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_method: Option<ResizeMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_reflectivity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<FlagSet>,
}

/// Per-image overrides plus the image's own export target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Included by "export marked"
    pub export: bool,
    /// Destination folder (defaults to the source's folder)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<PathBuf>,
    /// Output file stem (defaults to the source stem)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Image merged into the alpha channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_alpha: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TextureFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_alpha: Option<TextureFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mipmaps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_method: Option<ResizeMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_reflectivity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<FlagSet>,
}

/// Explicit locations of the external programs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// VTFCmd (current)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<PathBuf>,
    /// VTFCmd (legacy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_legacy: Option<PathBuf>,
    /// ImageMagick `magick`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magick: Option<PathBuf>,
    /// vtex, for skybox compilation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtex: Option<PathBuf>,
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub shared: SharedSettings,
    pub batch: BatchSettings,
    pub tools: ToolPaths,
}

impl Settings {
    /// Get the config directory path (~/.config/vtfbatch)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("vtfbatch");

        Ok(config_dir)
    }

    /// Get the default settings file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from `path`, or the default location.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        settings
            .validate()
            .with_context(|| format!("Invalid settings in {:?}", path))?;

        Ok(settings)
    }

    /// Save settings to `path`, or the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(path)
    }

    /// Validate every layer
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.batch.validate()
    }
}

impl SharedSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_clamp(Some(self.clamp_width))?;
        check_clamp(Some(self.clamp_height))
    }
}

impl BatchSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_clamp(self.clamp_width)?;
        check_clamp(self.clamp_height)
    }
}

impl ImageSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_clamp(self.clamp_width)?;
        check_clamp(self.clamp_height)?;
        if let Some(name) = &self.rename {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::InvalidRename(name.clone()));
            }
        }
        Ok(())
    }
}

fn check_clamp(size: Option<u32>) -> Result<(), ConfigError> {
    match size {
        Some(n) if !is_valid_clamp(n) => Err(ConfigError::InvalidClampSize(n)),
        _ => Ok(()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Clamp size {0} is not a power of two between 2 and 4096")]
    InvalidClampSize(u32),

    #[error("Invalid output name '{0}'")]
    InvalidRename(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::TextureFlag;

    #[test]
    fn test_shared_defaults() {
        let shared = SharedSettings::default();
        assert_eq!(shared.format, TextureFormat::Dxt1);
        assert_eq!(shared.format_alpha, TextureFormat::Dxt5);
        assert!(shared.mipmaps);
        assert!(!shared.resize);
        assert_eq!(shared.version, ContainerVersion::V7_4);
        assert_eq!(shared.resize_filter, ResampleFilter::Cubic);
        assert_eq!(shared.mipmap_sharpen, SharpenFilter::SharpenSoft);
        assert_eq!((shared.clamp_width, shared.clamp_height), (4096, 4096));
    }

    #[test]
    fn test_settings_serialize() {
        let mut settings = Settings::default();
        settings.batch.format = Some(TextureFormat::Bgra8888);
        settings.batch.flags = Some([TextureFlag::Normal].into_iter().collect());
        settings.tools.magick = Some(PathBuf::from("/usr/bin/magick"));

        let json = serde_json::to_string(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded: Settings =
            serde_json::from_str(r#"{ "batch": { "format": "dxt5" } }"#).unwrap();
        assert_eq!(loaded.batch.format, Some(TextureFormat::Dxt5));
        assert_eq!(loaded.batch.mipmaps, None);
        assert_eq!(loaded.shared, SharedSettings::default());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = Settings::load(Some(&dir.path().join("nope.json")))?;
        assert_eq!(settings, Settings::default());
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.shared.encoder = EncoderVariant::Legacy;
        settings.save(Some(&path))?;

        let loaded = Settings::load(Some(&path))?;
        assert_eq!(loaded.shared.encoder, EncoderVariant::Legacy);
        Ok(())
    }

    #[test]
    fn test_invalid_clamp_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "batch": { "clamp_width": 500 } }"#)?;

        assert!(Settings::load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn test_image_rename_validation() {
        let image = ImageSettings {
            rename: Some("sub/name".into()),
            ..Default::default()
        };
        assert!(matches!(image.validate(), Err(ConfigError::InvalidRename(_))));
    }
}
