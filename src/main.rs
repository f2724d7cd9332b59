//! vtfbatch - batch VTF texture converter
//!
//! Converts folders of images to VTF with VTFCmd, optionally driven by a
//! TextMax rule file, and compiles skyboxes with vtex.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vtfbatch::batch::{self, Batch, BatchReport, FolderRequest, ImageRequest, Toolchain};
use vtfbatch::config::{BatchSettings, ImageSettings, Settings, SharedSettings};
use vtfbatch::planner::{self, PlanRequest};
use vtfbatch::resolver::resolve_batch;
use vtfbatch::skybox::{PrerenderedFaces, SkyboxCompiler, SkyboxSettings};
use vtfbatch::textmax::RuleSet;
use vtfbatch::textures::{
    ContainerVersion, EncoderVariant, FlagSet, ResizeMethod, TextureFormat,
};
use vtfbatch::tools::{locate_tool, Magick, Tool, Vtex};

#[derive(Parser)]
#[command(name = "vtfbatch")]
#[command(version)]
#[command(about = "Batch VTF texture converter driving VTFCmd, ImageMagick and vtex")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, env = "VTFBATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every matching image in a folder
    Folder {
        #[command(flatten)]
        folder: FolderArgs,

        /// Worker threads (1 = sequential)
        #[arg(short, long, default_value = "1")]
        jobs: usize,
    },

    /// List the jobs a folder batch would run, without converting
    Plan {
        #[command(flatten)]
        folder: FolderArgs,
    },

    /// Convert one image
    Single {
        /// Source image
        source: PathBuf,

        /// Destination folder (defaults to the source's folder)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Output name without extension
        #[arg(long)]
        rename: Option<String>,

        /// Image to merge into the alpha channel
        #[arg(long)]
        alpha: Option<PathBuf>,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Convert the images marked for export in a JSON manifest
    Marked {
        /// JSON array of {"source": ..., "export": true, <overrides>}
        manifest: PathBuf,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Compile a skybox from pre-rendered faces
    Skybox {
        /// Game content folder (e.g. "Half-Life 2/ep2")
        #[arg(short, long)]
        game: PathBuf,

        /// Skybox name
        name: String,

        /// Folder holding <name><face>.exr / .tga images
        #[arg(short, long)]
        faces: PathBuf,

        /// Face width in pixels
        #[arg(short, long, default_value = "1024")]
        size: u32,

        /// Half-height sides
        #[arg(long)]
        half_size: bool,

        /// Also build HDR textures
        #[arg(long)]
        hdr: bool,

        /// Use compressed HDR textures
        #[arg(long)]
        compressed: bool,

        /// Use an 8x8 bottom face
        #[arg(long)]
        no_bottom: bool,

        /// Replace an existing skybox of the same name
        #[arg(long)]
        overwrite: bool,

        /// Keep the EXR renders
        #[arg(long)]
        keep_exr: bool,

        /// Keep the generated PFM files
        #[arg(long)]
        keep_pfm: bool,

        /// vtex executable (defaults to <game>/../bin/vtex.exe)
        #[arg(long)]
        vtex: Option<PathBuf>,
    },

    /// Show or create the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings as JSON
    Show,
    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct FolderArgs {
    /// Input folder, optionally ending in a wildcard ("textures/*.png")
    input: PathBuf,

    /// Output folder (must exist)
    #[arg(short, long)]
    output: PathBuf,

    /// Glob for file names when the input has no wildcard
    #[arg(short, long)]
    pattern: Option<String>,

    /// Descend into subfolders and mirror them in the output
    #[arg(short, long)]
    recursive: bool,

    /// TextMax rule file
    #[arg(long)]
    rules: Option<PathBuf>,

    /// In rule mode, also convert files no rule matches
    #[arg(long, requires = "rules")]
    fallback: bool,

    #[command(flatten)]
    encode: EncodeArgs,
}

/// Overrides for the batch and shared layers
#[derive(Args)]
struct EncodeArgs {
    /// Format for images without alpha
    #[arg(long, value_parser = parse_format)]
    format: Option<TextureFormat>,

    /// Format for images with alpha
    #[arg(long, value_parser = parse_format)]
    alpha_format: Option<TextureFormat>,

    /// Don't generate mipmaps
    #[arg(long)]
    no_mipmaps: bool,

    /// Resize to a power of two
    #[arg(long)]
    resize: bool,

    /// Power-of-two rounding: NEAREST, BIGGEST or SMALLEST
    #[arg(long, value_parser = parse_resize_method)]
    resize_method: Option<ResizeMethod>,

    /// Clamp the resized size, e.g. 512x512
    #[arg(long, value_parser = parse_clamp)]
    clamp: Option<(u32, u32)>,

    /// Don't compute the reflectivity vector
    #[arg(long)]
    no_reflectivity: bool,

    /// Comma-separated header flags, e.g. "NORMAL,NOMIP"
    #[arg(long)]
    flags: Option<String>,

    /// VTFCmd build: CURRENT or LEGACY
    #[arg(long, value_parser = parse_encoder)]
    encoder: Option<EncoderVariant>,

    /// VTF version, e.g. 7.4
    #[arg(long, value_parser = parse_container_version)]
    vtf_version: Option<ContainerVersion>,

    /// Don't write a thumbnail
    #[arg(long)]
    no_thumbnail: bool,
}

impl EncodeArgs {
    /// Layer the command line over the settings file
    fn apply(&self, shared: &mut SharedSettings, batch: &mut BatchSettings) {
        if let Some(encoder) = self.encoder {
            shared.encoder = encoder;
        }
        if let Some(version) = self.vtf_version {
            shared.version = version;
        }
        if self.no_thumbnail {
            shared.generate_thumbnail = false;
        }

        batch.format = self.format.or(batch.format);
        batch.format_alpha = self.alpha_format.or(batch.format_alpha);
        if self.no_mipmaps {
            batch.mipmaps = Some(false);
        }
        if self.resize {
            batch.resize = Some(true);
        }
        batch.resize_method = self.resize_method.or(batch.resize_method);
        if let Some((width, height)) = self.clamp {
            batch.clamp = Some(true);
            batch.clamp_width = Some(width);
            batch.clamp_height = Some(height);
        }
        if self.no_reflectivity {
            batch.compute_reflectivity = Some(false);
        }
        if let Some(list) = &self.flags {
            let (flags, unknown) = FlagSet::parse_list(list);
            for name in unknown {
                eprintln!("Ignoring unknown flag {}", name);
            }
            batch.flags = Some(flags);
        }
    }
}

fn parse_format(s: &str) -> Result<TextureFormat, String> {
    TextureFormat::from_str(s).ok_or_else(|| format!("unknown format {}", s))
}

fn parse_resize_method(s: &str) -> Result<ResizeMethod, String> {
    ResizeMethod::from_str(s).ok_or_else(|| format!("unknown resize method {}", s))
}

fn parse_encoder(s: &str) -> Result<EncoderVariant, String> {
    EncoderVariant::from_str(s).ok_or_else(|| format!("unknown encoder {}", s))
}

fn parse_container_version(s: &str) -> Result<ContainerVersion, String> {
    ContainerVersion::from_str(s).ok_or_else(|| format!("unknown VTF version {}", s))
}

fn parse_clamp(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {}", s))?;
    let w = w.trim().parse().map_err(|_| format!("bad width in {}", s))?;
    let h = h.trim().parse().map_err(|_| format!("bad height in {}", s))?;
    Ok((w, h))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env().add_directive(if cli.verbose {
            "vtfbatch=debug".parse()?
        } else {
            "vtfbatch=warn".parse()?
        });
        if cli.log_json {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Folder { folder, jobs } => {
            folder.encode.apply(&mut settings.shared, &mut settings.batch);
            let tools = Toolchain::locate(&settings)?;
            let request = folder_request(&folder, &settings.batch, jobs);

            println!("vtfbatch - folder batch");
            println!("Input:   {}", request.input.display());
            println!("Output:  {}", request.output.display());
            if let Some(rules) = &request.rule_file {
                println!("Rules:   {}", rules.display());
            }
            println!();

            let report = Batch::new(&settings.shared, &settings.batch, &tools.image, &tools.encoder)
                .with_progress(true)
                .export_folder(&request)?;
            finish(&report)?;
        }

        Commands::Plan { folder } => {
            folder.encode.apply(&mut settings.shared, &mut settings.batch);
            print_plan(&folder, &settings)?;
        }

        Commands::Single {
            source,
            dest,
            rename,
            alpha,
            encode,
        } => {
            encode.apply(&mut settings.shared, &mut settings.batch);
            let tools = Toolchain::locate(&settings)?;
            let request = ImageRequest {
                source,
                settings: ImageSettings {
                    export: true,
                    dest_dir: dest,
                    rename,
                    embed_alpha: alpha,
                    ..Default::default()
                },
            };
            let report = Batch::new(&settings.shared, &settings.batch, &tools.image, &tools.encoder)
                .export_single(&request)?;
            finish(&report)?;
        }

        Commands::Marked { manifest, encode } => {
            encode.apply(&mut settings.shared, &mut settings.batch);
            let requests = batch::load_manifest(&manifest)?;
            let tools = Toolchain::locate(&settings)?;
            let report = Batch::new(&settings.shared, &settings.batch, &tools.image, &tools.encoder)
                .with_progress(true)
                .export_marked(&requests)?;
            finish(&report)?;
        }

        Commands::Skybox {
            game,
            name,
            faces,
            size,
            half_size,
            hdr,
            compressed,
            no_bottom,
            overwrite,
            keep_exr,
            keep_pfm,
            vtex,
        } => {
            let sky = SkyboxSettings {
                game_dir: game,
                vtex: vtex.or_else(|| settings.tools.vtex.clone()),
                name,
                size,
                half_size,
                hdr,
                hdr_compressed: compressed,
                no_bottom,
                overwrite,
                keep_exr,
                keep_pfm,
            };
            let image = Magick::new(locate_tool(Tool::Magick, &settings.tools)?);
            let compiler = Vtex::new(sky.vtex_path());
            let mut renderer = PrerenderedFaces::new(faces, &sky.name, &image);

            let report = SkyboxCompiler::new(&sky, &image, &compiler).compile(&mut renderer)?;

            println!("\n=== Skybox Summary ===");
            println!("Materials: {}", report.materials_dir.display());
            for material in &report.materials {
                println!("  {}", material.display());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            ConfigAction::Init { force } => {
                let path = match &cli.config {
                    Some(p) => p.clone(),
                    None => Settings::default_path()?,
                };
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                let written = Settings::default().save(Some(&path))?;
                println!("Wrote {}", written.display());
            }
        },
    }

    Ok(())
}

fn folder_request(args: &FolderArgs, batch: &BatchSettings, jobs: usize) -> FolderRequest {
    FolderRequest {
        input: args.input.clone(),
        output: args.output.clone(),
        pattern: args.pattern.clone(),
        recursive: args.recursive,
        rule_file: args.rules.clone(),
        fallback: args.fallback,
        batch: batch.clone(),
        jobs,
    }
}

fn print_plan(args: &FolderArgs, settings: &Settings) -> Result<()> {
    settings.batch.validate().context("Invalid batch settings")?;
    let profile = resolve_batch(&settings.shared, &settings.batch);
    let rules = match &args.rules {
        Some(path) => {
            let rules = RuleSet::load(path, &profile)?;
            for warning in rules.warnings() {
                eprintln!("{}: {}", path.display(), warning);
            }
            Some(rules)
        }
        None => None,
    };

    let plan = planner::plan(&PlanRequest {
        input: &args.input,
        output: &args.output,
        pattern: args.pattern.as_deref(),
        recursive: args.recursive,
        create_dirs: false,
        rules: rules.as_ref(),
        fallback: args.fallback,
        profile: &profile,
        shared: &settings.shared,
    })?;

    for (key, job) in &plan.tasks {
        let flags: Vec<&str> = job.flags.iter().map(|f| f.name()).collect();
        let clamp = job
            .clamp
            .map(|c| format!(" clamp {}x{}", c.width, c.height))
            .unwrap_or_default();
        println!(
            "{} {} -> {} [{}/{}{}{}{}]",
            key,
            job.source_path.display(),
            job.dest_path.display(),
            job.encoding.color,
            job.encoding.alpha,
            if job.resize.is_some() { " resize" } else { "" },
            clamp,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" {}", flags.join(","))
            },
        );
    }

    eprintln!("\nPattern: {}", plan.pattern);
    eprintln!("Total: {} jobs", plan.len());
    if !plan.unmatched.is_empty() {
        eprintln!("Unmatched by rules: {}", plan.unmatched.len());
    }
    if !plan.collisions.is_empty() {
        eprintln!("Destination collisions: {}", plan.collisions.len());
    }
    Ok(())
}

fn finish(report: &BatchReport) -> Result<()> {
    report.print_summary();
    if !report.is_success() {
        bail!("{} textures failed", report.stats.failed);
    }
    if report.stats.total() > 0 {
        println!("\nBatch complete!");
    }
    Ok(())
}
