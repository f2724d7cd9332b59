//! VTFCmd backend
//!
//! Argument order:
//!
//! ```text
//! -file <input>
//! [-resize -rmethod M -rfilter F [-rsharpen S]]
//! [-rclampwidth W -rclampheight H]
//! -format FMT -alphaformat FMT
//! [-mfilter F [-msharpen S] | -nomipmaps]
//! -version VER [-noreflectivity] [-nothumbnail]
//! [-flag NAME]...
//! -output <dir>
//! ```
//!
//! Sharpen filters are only understood by the legacy build.

use super::{run, EncodeOutput, TextureEncoder, ToolError};
use crate::job::JobDescriptor;
use crate::textures::EncoderVariant;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

const TOOL: &str = "VTFCmd";

pub struct VtfCmd {
    binary: PathBuf,
    variant: EncoderVariant,
}

impl VtfCmd {
    pub fn new(binary: PathBuf, variant: EncoderVariant) -> Self {
        Self { binary, variant }
    }
}

/// Build the VTFCmd argument list for `job`, reading from `input` and
/// writing into `output_dir`
pub fn encoder_args(
    job: &JobDescriptor,
    input: &Path,
    output_dir: &Path,
    variant: EncoderVariant,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-file".into(), input.as_os_str().to_os_string()];
    let mut push = |s: &str| args.push(OsString::from(s));

    if let Some(resize) = &job.resize {
        push("-resize");
        push("-rmethod");
        push(resize.method.name());
        push("-rfilter");
        push(resize.filter.name());
        if variant.accepts_sharpen() {
            push("-rsharpen");
            push(resize.sharpen.name());
        }

        if let Some(clamp) = &job.clamp {
            push("-rclampwidth");
            push(&clamp.width.to_string());
            push("-rclampheight");
            push(&clamp.height.to_string());
        }
    }

    push("-format");
    push(job.encoding.color.name());
    push("-alphaformat");
    push(job.encoding.alpha.name());

    match &job.mipmaps {
        Some(mips) => {
            push("-mfilter");
            push(mips.filter.name());
            if variant.accepts_sharpen() {
                push("-msharpen");
                push(mips.sharpen.name());
            }
        }
        None => push("-nomipmaps"),
    }

    push("-version");
    push(job.version.name());

    if !job.compute_reflectivity {
        push("-noreflectivity");
    }
    if !job.generate_thumbnail {
        push("-nothumbnail");
    }

    for flag in job.flags.iter() {
        push("-flag");
        push(flag.name());
    }

    push("-output");
    args.push(output_dir.as_os_str().to_os_string());
    args
}

impl TextureEncoder for VtfCmd {
    fn variant(&self) -> EncoderVariant {
        self.variant
    }

    fn encode(
        &self,
        job: &JobDescriptor,
        input: &Path,
        output_dir: &Path,
    ) -> Result<EncodeOutput, ToolError> {
        let args = encoder_args(job, input, output_dir, self.variant);
        let output = run(TOOL, &self.binary, Command::new(&self.binary).args(&args))?;

        Ok(EncodeOutput {
            exit_ok: output.success,
            log: output.log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ClampDims, Encoding, MipmapSpec, ResizeSpec};
    use crate::textures::{
        ContainerVersion, FlagSet, ResampleFilter, ResizeMethod, SharpenFilter, TextureFlag,
        TextureFormat,
    };

    fn job() -> JobDescriptor {
        JobDescriptor {
            source_path: PathBuf::from("/in/brick.png"),
            dest_path: PathBuf::from("/out/brick.vtf"),
            encoding: Encoding::new(TextureFormat::Dxt1, TextureFormat::Dxt5),
            mipmaps: Some(MipmapSpec {
                filter: ResampleFilter::Point,
                sharpen: SharpenFilter::SharpenSoft,
            }),
            compute_reflectivity: true,
            embed_alpha_source: None,
            resize: None,
            clamp: None,
            flags: FlagSet::empty(),
            version: ContainerVersion::V7_4,
            generate_thumbnail: true,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    fn args(job: &JobDescriptor, variant: EncoderVariant) -> Vec<String> {
        strings(encoder_args(job, Path::new("/in/brick.png"), Path::new("/out"), variant))
    }

    #[test]
    fn test_minimal_args() {
        assert_eq!(
            args(&job(), EncoderVariant::Current),
            vec![
                "-file", "/in/brick.png", "-format", "DXT1", "-alphaformat", "DXT5", "-mfilter",
                "POINT", "-version", "7.4", "-output", "/out",
            ]
        );
    }

    #[test]
    fn test_flags_in_canonical_order() {
        let mut job = job();
        job.flags = [TextureFlag::NoMip, TextureFlag::Normal].into_iter().collect();
        let args = args(&job, EncoderVariant::Current);

        let flag_args: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-flag")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(flag_args, vec!["NORMAL", "NOMIP"]);

        let joined = args.join(" ");
        assert!(joined.contains("-flag NORMAL -flag NOMIP -output"));
    }

    #[test]
    fn test_resize_and_clamp_legacy() {
        let mut job = job();
        job.resize = Some(ResizeSpec {
            method: ResizeMethod::Nearest,
            filter: ResampleFilter::Cubic,
            sharpen: SharpenFilter::SharpenMedium,
        });
        job.clamp = Some(ClampDims { width: 512, height: 256 });
        let args = args(&job, EncoderVariant::Legacy).join(" ");

        assert!(args.starts_with(
            "-file /in/brick.png -resize -rmethod NEAREST -rfilter CUBIC -rsharpen SHARPENMEDIUM \
             -rclampwidth 512 -rclampheight 256 -format"
        ));
        assert!(args.contains("-mfilter POINT -msharpen SHARPENSOFT -version"));
    }

    #[test]
    fn test_current_encoder_omits_sharpen() {
        let mut job = job();
        job.resize = Some(ResizeSpec {
            method: ResizeMethod::Biggest,
            filter: ResampleFilter::Kaiser,
            sharpen: SharpenFilter::Emboss,
        });
        let args = args(&job, EncoderVariant::Current);
        assert!(!args.iter().any(|a| a.contains("sharpen")));
    }

    #[test]
    fn test_clamp_needs_resize() {
        let mut job = job();
        job.clamp = Some(ClampDims { width: 512, height: 512 });
        let args = args(&job, EncoderVariant::Current);
        assert!(!args.iter().any(|a| a.starts_with("-rclamp")));
    }

    #[test]
    fn test_disabled_options() {
        let mut job = job();
        job.mipmaps = None;
        job.compute_reflectivity = false;
        job.generate_thumbnail = false;
        job.version = ContainerVersion::V7_2;
        let args = args(&job, EncoderVariant::Current).join(" ");
        assert!(args.contains("-nomipmaps -version 7.2 -noreflectivity -nothumbnail -output /out"));
        assert!(!args.contains("-mfilter"));
    }
}
