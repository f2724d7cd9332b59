//! Batch entry points
//!
//! `export_single`, `export_marked` and `export_folder` turn requests into a
//! `TaskMap`, run it through the executor and collect a `BatchReport`.
//! Tools are located once, before any job starts.

use crate::config::{BatchSettings, ImageSettings, Settings, SharedSettings};
use crate::executor::{Executor, JobOutcome};
use crate::hash::SourceKey;
use crate::job::JobDescriptor;
use crate::paths;
use crate::planner::{self, PlanRequest, TaskMap};
use crate::resolver::resolve_batch;
use crate::textmax::RuleSet;
use crate::textures::EncoderVariant;
use crate::tools::{locate_tool, ImageTool, Magick, TextureEncoder, Tool, ToolError, VtfCmd};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One image with its own overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub source: PathBuf,
    #[serde(flatten)]
    pub settings: ImageSettings,
}

/// Convert every matching file in a folder
#[derive(Debug, Clone, Default)]
pub struct FolderRequest {
    /// Folder, optionally ending in a wildcard (`textures/*.png`)
    pub input: PathBuf,
    pub output: PathBuf,
    pub pattern: Option<String>,
    pub recursive: bool,
    /// TextMax rule file; switches the batch to rule mode
    pub rule_file: Option<PathBuf>,
    /// In rule mode, also convert files no rule matched
    pub fallback: bool,
    pub batch: BatchSettings,
    /// Worker count; 0 or 1 runs sequentially
    pub jobs: usize,
}

/// Job counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.converted + self.skipped + self.failed
    }
}

/// What happened to every job of a batch, in task order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(PathBuf, JobOutcome)>,
    pub stats: BatchStats,
    /// Rule mode only: files no rule claimed
    pub unmatched: Vec<PathBuf>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<(PathBuf, JobOutcome)>) -> Self {
        let mut stats = BatchStats::default();
        for (_, outcome) in &outcomes {
            match outcome {
                JobOutcome::Converted { .. } => stats.converted += 1,
                JobOutcome::Skipped(_) => stats.skipped += 1,
                JobOutcome::Failed(_) => stats.failed += 1,
            }
        }
        Self {
            outcomes,
            stats,
            unmatched: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.stats.failed == 0
    }

    pub fn print_summary(&self) {
        println!("\n=== Batch Summary ===");
        println!(
            "Textures: {} converted, {} skipped, {} failed",
            self.stats.converted, self.stats.skipped, self.stats.failed
        );
        if !self.unmatched.is_empty() {
            println!("Unmatched by rules: {}", self.unmatched.len());
        }

        for (source, outcome) in &self.outcomes {
            match outcome {
                JobOutcome::Skipped(reason) => println!("  SKIP {}: {}", source.display(), reason),
                JobOutcome::Failed(err) => println!("  FAIL {}: {}", source.display(), err),
                JobOutcome::Converted { .. } => {}
            }
        }
    }
}

/// The real external programs, found via the settings and the search path
pub struct Toolchain {
    pub image: Magick,
    pub encoder: VtfCmd,
}

impl Toolchain {
    /// Locate ImageMagick and the configured VTFCmd build
    pub fn locate(settings: &Settings) -> Result<Self, ToolError> {
        let variant = settings.shared.encoder;
        let encoder_tool = match variant {
            EncoderVariant::Current => Tool::Encoder,
            EncoderVariant::Legacy => Tool::EncoderLegacy,
        };
        let encoder = locate_tool(encoder_tool, &settings.tools)?;
        let magick = locate_tool(Tool::Magick, &settings.tools)?;
        info!("Using {} and {}", encoder.display(), magick.display());

        Ok(Self {
            image: Magick::new(magick),
            encoder: VtfCmd::new(encoder, variant),
        })
    }
}

/// Runs batches against one set of tools and settings
pub struct Batch<'a> {
    shared: &'a SharedSettings,
    batch: &'a BatchSettings,
    image: &'a dyn ImageTool,
    encoder: &'a dyn TextureEncoder,
    show_progress: bool,
}

impl<'a> Batch<'a> {
    pub fn new(
        shared: &'a SharedSettings,
        batch: &'a BatchSettings,
        image: &'a dyn ImageTool,
        encoder: &'a dyn TextureEncoder,
    ) -> Self {
        Self {
            shared,
            batch,
            image,
            encoder,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Convert one image next to its source (or into its `dest_dir`)
    pub fn export_single(&self, request: &ImageRequest) -> Result<BatchReport> {
        self.export_images(std::slice::from_ref(request))
    }

    /// Convert the requests marked for export
    pub fn export_marked(&self, requests: &[ImageRequest]) -> Result<BatchReport> {
        let marked: Vec<ImageRequest> =
            requests.iter().filter(|r| r.settings.export).cloned().collect();
        debug!("{} of {} images marked for export", marked.len(), requests.len());
        self.export_images(&marked)
    }

    fn export_images(&self, requests: &[ImageRequest]) -> Result<BatchReport> {
        let profile = resolve_batch(self.shared, self.batch);
        let mut tasks = TaskMap::new();

        for request in requests {
            request
                .settings
                .validate()
                .with_context(|| format!("Invalid settings for {}", request.source.display()))?;

            let key = SourceKey::for_path(&request.source);
            if tasks.contains_key(&key) {
                debug!("{} requested twice, keeping the first", request.source.display());
                continue;
            }
            let dest = paths::single_destination(
                &request.source,
                request.settings.dest_dir.as_deref(),
                request.settings.rename.as_deref(),
            );
            let job = profile
                .with_image(&request.settings)
                .resolve_job(self.shared, &request.source, &dest);
            tasks.insert(key, job);
        }

        self.run(&tasks, 1)
    }

    /// Plan and convert a folder
    pub fn export_folder(&self, request: &FolderRequest) -> Result<BatchReport> {
        request.batch.validate().context("Invalid batch settings")?;
        let profile = resolve_batch(self.shared, &request.batch);

        let rules = match &request.rule_file {
            Some(path) => {
                let rules = RuleSet::load(path, &profile)?;
                for warning in rules.warnings() {
                    warn!("{}: {}", path.display(), warning);
                }
                info!("Loaded {} rules from {}", rules.len(), path.display());
                Some(rules)
            }
            None => None,
        };

        let plan = planner::plan(&PlanRequest {
            input: &request.input,
            output: &request.output,
            pattern: request.pattern.as_deref(),
            recursive: request.recursive,
            create_dirs: true,
            rules: rules.as_ref(),
            fallback: request.fallback,
            profile: &profile,
            shared: self.shared,
        })?;

        let mut report = self.run(&plan.tasks, request.jobs)?;
        report.unmatched = plan.unmatched;
        Ok(report)
    }

    /// Execute a task map, sequentially or on a pool of `workers` threads
    pub fn run(&self, tasks: &TaskMap, workers: usize) -> Result<BatchReport> {
        if tasks.is_empty() {
            info!("Nothing to convert");
            return Ok(BatchReport::default());
        }

        let temp = tempfile::Builder::new()
            .prefix("vtfbatch-")
            .tempdir()
            .context("Failed to create temp directory")?;
        let executor = Executor::new(self.image, self.encoder, temp.path());
        let jobs: Vec<&JobDescriptor> = tasks.values().collect();

        let pb = self.progress_bar(jobs.len());
        let ok = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        let convert = |job: &&JobDescriptor| {
            pb.set_message(job.source_name());
            let outcome = executor.convert(job);
            match &outcome {
                JobOutcome::Converted { .. } => ok.fetch_add(1, Ordering::Relaxed),
                JobOutcome::Failed(_) => failed.fetch_add(1, Ordering::Relaxed),
                JobOutcome::Skipped(_) => 0,
            };
            pb.inc(1);
            (job.source_path.clone(), outcome)
        };

        let outcomes: Vec<(PathBuf, JobOutcome)> = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .context("Failed to build worker pool")?;
            info!("Converting {} textures on {} workers", jobs.len(), workers);
            pool.install(|| jobs.par_iter().map(convert).collect::<Vec<_>>())
        } else {
            jobs.iter().map(convert).collect()
        };

        pb.finish_with_message(format!(
            "OK:{} Fail:{}",
            ok.load(Ordering::Relaxed),
            failed.load(Ordering::Relaxed)
        ));

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            "Batch done: {} converted, {} skipped, {} failed",
            report.stats.converted, report.stats.skipped, report.stats.failed
        );
        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Read an `export_marked` manifest: a JSON array of image requests
pub fn load_manifest(path: &Path) -> Result<Vec<ImageRequest>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SkipReason;
    use crate::planner::PlanError;
    use crate::textures::{TextureFlag, TextureFormat};
    use crate::tools::fake::{FakeEncoder, FakeImageTool};
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        shared: SharedSettings,
        batch: BatchSettings,
        image: FakeImageTool,
        encoder: FakeEncoder,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("in")).unwrap();
            fs::create_dir_all(dir.path().join("out")).unwrap();
            for f in files {
                fs::write(dir.path().join("in").join(f), b"img").unwrap();
            }
            Self {
                dir,
                shared: SharedSettings::default(),
                batch: BatchSettings::default(),
                image: FakeImageTool::default(),
                encoder: FakeEncoder::default(),
            }
        }

        fn input(&self) -> PathBuf {
            self.dir.path().join("in")
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        fn batch(&self) -> Batch<'_> {
            Batch::new(&self.shared, &self.batch, &self.image, &self.encoder)
        }

        fn folder(&self) -> FolderRequest {
            FolderRequest {
                input: self.input(),
                output: self.output(),
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_folder_converts_once() {
        let fx = Fixture::new(&["brick.png"]);
        let report = fx.batch().export_folder(&fx.folder()).unwrap();

        assert_eq!(report.stats, BatchStats { converted: 1, skipped: 0, failed: 0 });
        assert!(report.is_success());
        assert_eq!(fx.encoder.calls().len(), 1);
        assert!(fx.output().join("brick.vtf").is_file());
    }

    #[test]
    fn test_folder_with_rules() {
        let fx = Fixture::new(&["metal_plate.tga", "wood.tga"]);
        let rules = fx.dir.path().join("rules.txt");
        fs::write(&rules, "metal_*.tga DXT5 512x* -normal,nomip\n").unwrap();

        let request = FolderRequest {
            rule_file: Some(rules),
            ..fx.folder()
        };
        let report = fx.batch().export_folder(&request).unwrap();

        assert_eq!(report.stats.converted, 1);
        assert_eq!(report.unmatched.len(), 1);
        let calls = fx.encoder.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].source.ends_with("metal_plate.tga"));
    }

    #[test]
    fn test_missing_rule_file_is_fatal() {
        let fx = Fixture::new(&["brick.png"]);
        let request = FolderRequest {
            rule_file: Some(fx.dir.path().join("missing.txt")),
            ..fx.folder()
        };
        let err = fx.batch().export_folder(&request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanError>(),
            Some(PlanError::RuleFileMissing(_))
        ));
        assert!(fx.encoder.calls().is_empty());
    }

    #[test]
    fn test_non_power_of_two_skipped() {
        let mut fx = Fixture::new(&["odd.png", "even.png"]);
        fx.image = FakeImageTool::default().with_dims("odd.png", 300, 200);
        let report = fx.batch().export_folder(&fx.folder()).unwrap();

        assert_eq!(report.stats, BatchStats { converted: 1, skipped: 1, failed: 0 });
        let (source, outcome) = &report.outcomes[1];
        assert!(source.ends_with("odd.png"));
        assert!(matches!(outcome, JobOutcome::Skipped(SkipReason::NotPowerOfTwo(_))));
        assert_eq!(fx.encoder.calls().len(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let files = ["a.png", "b.png", "c.png", "d.png", "e.png"];
        let fx = Fixture::new(&files);
        let request = FolderRequest {
            jobs: 3,
            ..fx.folder()
        };
        let report = fx.batch().export_folder(&request).unwrap();

        assert_eq!(report.stats.converted, files.len());
        assert_eq!(fx.encoder.calls().len(), files.len());
        // Report keeps task order regardless of worker scheduling
        let order: Vec<_> = report
            .outcomes
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(order, files);
    }

    #[test]
    fn test_failures_are_counted() {
        let mut fx = Fixture::new(&["brick.png"]);
        fx.encoder.produce_output = false;
        let report = fx.batch().export_folder(&fx.folder()).unwrap();

        assert_eq!(report.stats.failed, 1);
        assert!(!report.is_success());
        assert_eq!(report.stats.total(), 1);
    }

    #[test]
    fn test_existing_output_does_not_mask_failure() {
        let mut fx = Fixture::new(&["brick.png"]);
        fs::write(fx.output().join("brick.vtf"), b"OLD").unwrap();
        fx.encoder.produce_output = false;
        fx.encoder.exit_ok = false;
        let report = fx.batch().export_folder(&fx.folder()).unwrap();

        assert_eq!(report.stats, BatchStats { converted: 0, skipped: 0, failed: 1 });
    }

    #[test]
    fn test_marked_same_stem_into_one_folder() {
        let fx = Fixture::new(&[]);
        let mut requests = Vec::new();
        for (folder, rename) in [("a", None), ("b", Some("floor".to_string()))] {
            let dir = fx.input().join(folder);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("brick.png"), b"img").unwrap();
            requests.push(ImageRequest {
                source: dir.join("brick.png"),
                settings: ImageSettings {
                    export: true,
                    dest_dir: Some(fx.output()),
                    rename,
                    ..Default::default()
                },
            });
        }
        let report = fx.batch().export_marked(&requests).unwrap();

        assert_eq!(report.stats.converted, 2);
        assert!(fx.output().join("brick.vtf").is_file());
        assert!(fx.output().join("floor.vtf").is_file());
    }

    #[test]
    fn test_single_with_rename() {
        let fx = Fixture::new(&["brick.png"]);
        let request = ImageRequest {
            source: fx.input().join("brick.png"),
            settings: ImageSettings {
                dest_dir: Some(fx.output()),
                rename: Some("wall".to_string()),
                format: Some(TextureFormat::Bgra8888),
                ..Default::default()
            },
        };
        let report = fx.batch().export_single(&request).unwrap();

        assert_eq!(report.stats.converted, 1);
        assert!(fx.output().join("wall.vtf").is_file());
        assert!(!fx.output().join("brick.vtf").exists());
    }

    #[test]
    fn test_marked_only_exports_marked() {
        let fx = Fixture::new(&["a.png", "b.png"]);
        let request = |name: &str, export: bool| ImageRequest {
            source: fx.input().join(name),
            settings: ImageSettings {
                export,
                dest_dir: Some(fx.output()),
                ..Default::default()
            },
        };
        let requests = vec![request("a.png", false), request("b.png", true), request("b.png", true)];
        let report = fx.batch().export_marked(&requests).unwrap();

        assert_eq!(report.stats.converted, 1);
        let calls = fx.encoder.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].source.ends_with("b.png"));
    }

    #[test]
    fn test_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marked.json");
        fs::write(
            &path,
            r#"[
                {"source": "a.png", "export": true, "format": "DXT5", "flags": ["NORMAL"]},
                {"source": "b.png"}
            ]"#,
        )
        .unwrap();

        let requests = load_manifest(&path).unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].settings.export);
        assert_eq!(requests[0].settings.format, Some(TextureFormat::Dxt5));
        let flags: Vec<_> = requests[0].settings.flags.unwrap().iter().collect();
        assert_eq!(flags, vec![TextureFlag::Normal]);
        assert!(!requests[1].settings.export);
    }

    #[test]
    fn test_empty_folder() {
        let fx = Fixture::new(&[]);
        let report = fx.batch().export_folder(&fx.folder()).unwrap();
        assert_eq!(report.stats.total(), 0);
        assert!(fx.encoder.calls().is_empty());
    }
}
