//! Parameter resolution
//!
//! Merges the shared, batch and image layers into a concrete
//! `JobDescriptor`. Precedence is image > batch > shared, field by field.
//!
//! Resize and mipmap *enablement* is resolved like any other field, but the
//! filter and sharpen choices are always read from the shared layer.

use crate::config::{BatchSettings, ImageSettings, SharedSettings};
use crate::job::{ClampDims, Encoding, JobDescriptor, MipmapSpec, ResizeSpec};
use crate::textmax::RuleOverride;
use crate::textures::{FlagSet, ResizeMethod};
use std::path::{Path, PathBuf};

/// Concrete per-batch values after layering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProfile {
    pub encoding: Encoding,
    pub mipmaps: bool,
    pub resize: bool,
    pub resize_method: ResizeMethod,
    /// `None` when clamping is disabled
    pub clamp: Option<ClampDims>,
    /// Clamp size used when clamping gets enabled by a later layer
    pub clamp_size: ClampDims,
    pub compute_reflectivity: bool,
    pub flags: FlagSet,
    pub embed_alpha: Option<PathBuf>,
}

/// Layer batch settings over the shared defaults
pub fn resolve_batch(shared: &SharedSettings, batch: &BatchSettings) -> BatchProfile {
    let clamp_size = ClampDims {
        width: batch.clamp_width.unwrap_or(shared.clamp_width),
        height: batch.clamp_height.unwrap_or(shared.clamp_height),
    };
    let clamp_enabled = batch.clamp.unwrap_or(shared.clamp);

    BatchProfile {
        encoding: Encoding::new(
            batch.format.unwrap_or(shared.format),
            batch.format_alpha.unwrap_or(shared.format_alpha),
        ),
        mipmaps: batch.mipmaps.unwrap_or(shared.mipmaps),
        resize: batch.resize.unwrap_or(shared.resize),
        resize_method: batch.resize_method.unwrap_or(shared.resize_method),
        clamp: clamp_enabled.then_some(clamp_size),
        clamp_size,
        compute_reflectivity: batch.compute_reflectivity.unwrap_or(shared.compute_reflectivity),
        flags: batch.flags.unwrap_or(shared.flags),
        embed_alpha: None,
    }
}

impl BatchProfile {
    /// Layer an individual image's overrides on top of this profile
    pub fn with_image(&self, image: &ImageSettings) -> BatchProfile {
        let clamp_size = ClampDims {
            width: image.clamp_width.unwrap_or(self.clamp_size.width),
            height: image.clamp_height.unwrap_or(self.clamp_size.height),
        };
        let clamp_enabled = image.clamp.unwrap_or(self.clamp.is_some());

        BatchProfile {
            encoding: Encoding::new(
                image.format.unwrap_or(self.encoding.color),
                image.format_alpha.unwrap_or(self.encoding.alpha),
            ),
            mipmaps: image.mipmaps.unwrap_or(self.mipmaps),
            resize: image.resize.unwrap_or(self.resize),
            resize_method: image.resize_method.unwrap_or(self.resize_method),
            clamp: clamp_enabled.then_some(clamp_size),
            clamp_size,
            compute_reflectivity: image.compute_reflectivity.unwrap_or(self.compute_reflectivity),
            flags: image.flags.unwrap_or(self.flags),
            embed_alpha: image.embed_alpha.clone().or_else(|| self.embed_alpha.clone()),
        }
    }

    /// Apply a TextMax rule: its format, clamp and flags win, and resize is
    /// forced on with nearest power-of-two alignment.
    pub fn with_rule(&self, rule: &RuleOverride) -> BatchProfile {
        BatchProfile {
            encoding: rule.encoding,
            resize: true,
            resize_method: ResizeMethod::Nearest,
            clamp: rule.clamp,
            flags: rule.flags,
            ..self.clone()
        }
    }

    /// Produce the job descriptor for one source/destination pair
    pub fn resolve_job(&self, shared: &SharedSettings, source: &Path, dest: &Path) -> JobDescriptor {
        JobDescriptor {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            encoding: self.encoding,
            mipmaps: self.mipmaps.then_some(MipmapSpec {
                filter: shared.mipmap_filter,
                sharpen: shared.mipmap_sharpen,
            }),
            compute_reflectivity: self.compute_reflectivity,
            embed_alpha_source: self.embed_alpha.clone(),
            resize: self.resize.then_some(ResizeSpec {
                method: self.resize_method,
                filter: shared.resize_filter,
                sharpen: shared.resize_sharpen,
            }),
            clamp: self.clamp,
            flags: self.flags,
            version: shared.version,
            generate_thumbnail: shared.generate_thumbnail,
        }
    }
}

/// Resolve a single image against all three layers
pub fn resolve_image(
    shared: &SharedSettings,
    batch: &BatchSettings,
    image: Option<&ImageSettings>,
    source: &Path,
    dest: &Path,
) -> JobDescriptor {
    let profile = resolve_batch(shared, batch);
    let profile = match image {
        Some(image) => profile.with_image(image),
        None => profile,
    };
    profile.resolve_job(shared, source, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::{ResampleFilter, SharpenFilter, TextureFlag, TextureFormat};

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("/in/brick.png"), PathBuf::from("/out/brick.vtf"))
    }

    #[test]
    fn test_batch_overrides_shared() {
        let shared = SharedSettings::default();
        let batch = BatchSettings {
            format: Some(TextureFormat::Bgr888),
            mipmaps: Some(false),
            ..Default::default()
        };
        let (src, dst) = paths();
        let job = resolve_image(&shared, &batch, None, &src, &dst);

        assert_eq!(job.encoding.color, TextureFormat::Bgr888);
        // Unset batch field falls through to shared
        assert_eq!(job.encoding.alpha, TextureFormat::Dxt5);
        assert!(job.mipmaps.is_none());
    }

    #[test]
    fn test_image_overrides_batch() {
        let shared = SharedSettings::default();
        let batch = BatchSettings {
            format: Some(TextureFormat::Dxt1),
            format_alpha: Some(TextureFormat::Dxt3),
            ..Default::default()
        };
        let image = ImageSettings {
            format: Some(TextureFormat::Dxt5),
            ..Default::default()
        };
        let (src, dst) = paths();
        let job = resolve_image(&shared, &batch, Some(&image), &src, &dst);

        assert_eq!(job.encoding.color, TextureFormat::Dxt5);
        // Unset image field falls through to batch
        assert_eq!(job.encoding.alpha, TextureFormat::Dxt3);
    }

    #[test]
    fn test_filters_always_from_shared() {
        let shared = SharedSettings {
            resize_filter: ResampleFilter::Kaiser,
            resize_sharpen: SharpenFilter::Emboss,
            mipmap_filter: ResampleFilter::Gaussian,
            mipmap_sharpen: SharpenFilter::None,
            mipmaps: false,
            ..Default::default()
        };
        let batch = BatchSettings {
            resize: Some(true),
            resize_method: Some(ResizeMethod::Biggest),
            ..Default::default()
        };
        let image = ImageSettings {
            mipmaps: Some(true),
            ..Default::default()
        };
        let (src, dst) = paths();
        let job = resolve_image(&shared, &batch, Some(&image), &src, &dst);

        let resize = job.resize.expect("resize enabled at batch layer");
        assert_eq!(resize.method, ResizeMethod::Biggest);
        assert_eq!(resize.filter, ResampleFilter::Kaiser);
        assert_eq!(resize.sharpen, SharpenFilter::Emboss);

        let mips = job.mipmaps.expect("mipmaps enabled at image layer");
        assert_eq!(mips.filter, ResampleFilter::Gaussian);
        assert_eq!(mips.sharpen, SharpenFilter::None);
    }

    #[test]
    fn test_clamp_enabled_by_image_uses_batch_size() {
        let shared = SharedSettings::default();
        let batch = BatchSettings {
            clamp_width: Some(512),
            ..Default::default()
        };
        let image = ImageSettings {
            clamp: Some(true),
            clamp_height: Some(256),
            ..Default::default()
        };
        let (src, dst) = paths();
        let job = resolve_image(&shared, &batch, Some(&image), &src, &dst);

        assert_eq!(job.clamp, Some(ClampDims { width: 512, height: 256 }));
    }

    #[test]
    fn test_image_can_disable_batch_clamp() {
        let shared = SharedSettings::default();
        let batch = BatchSettings {
            clamp: Some(true),
            ..Default::default()
        };
        let image = ImageSettings {
            clamp: Some(false),
            ..Default::default()
        };
        let (src, dst) = paths();
        let job = resolve_image(&shared, &batch, Some(&image), &src, &dst);
        assert!(job.clamp.is_none());
    }

    #[test]
    fn test_rule_forces_nearest_resize() {
        let shared = SharedSettings::default();
        let batch = BatchSettings {
            resize: Some(false),
            resize_method: Some(ResizeMethod::Smallest),
            ..Default::default()
        };
        let profile = resolve_batch(&shared, &batch);
        let rule = RuleOverride {
            encoding: Encoding::uniform(TextureFormat::Dxt5),
            clamp: Some(ClampDims { width: 512, height: 4096 }),
            flags: [TextureFlag::Normal].into_iter().collect(),
        };
        let (src, dst) = paths();
        let job = profile.with_rule(&rule).resolve_job(&shared, &src, &dst);

        assert_eq!(job.resize.map(|r| r.method), Some(ResizeMethod::Nearest));
        assert_eq!(job.encoding, Encoding::uniform(TextureFormat::Dxt5));
        assert!(job.flags.contains(TextureFlag::Normal));
        // Untouched fields keep batch values
        assert!(job.mipmaps.is_some());
    }

    #[test]
    fn test_shared_only_fields() {
        let shared = SharedSettings {
            generate_thumbnail: false,
            version: crate::textures::ContainerVersion::V7_2,
            ..Default::default()
        };
        let (src, dst) = paths();
        let job = resolve_image(&shared, &BatchSettings::default(), None, &src, &dst);
        assert!(!job.generate_thumbnail);
        assert_eq!(job.version, crate::textures::ContainerVersion::V7_2);
        assert_eq!(job.source_path, src);
        assert_eq!(job.dest_path, dst);
    }
}
