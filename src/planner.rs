//! Task planning
//!
//! Turns an input folder (optionally with a TextMax rule set) into an ordered,
//! deduplicated `TaskMap` of job descriptors. Rules are applied in file
//! order, then the fallback pattern fills whatever is still unclaimed.

use crate::config::SharedSettings;
use crate::hash::SourceKey;
use crate::job::JobDescriptor;
use crate::paths;
use crate::resolver::BatchProfile;
use crate::textmax::RuleSet;
use globset::{GlobBuilder, GlobMatcher};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Jobs keyed by source identity, in registration order
pub type TaskMap = IndexMap<SourceKey, JobDescriptor>;

/// Errors that stop a batch before any job runs
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Output folder does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("Input folder does not exist: {0}")]
    InputDirMissing(PathBuf),

    #[error("Rule file not found: {0}")]
    RuleFileMissing(PathBuf),

    #[error("Invalid file pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Inputs of one planning run
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    /// Input folder, possibly ending in a glob (`textures/*.png`)
    pub input: &'a Path,
    pub output: &'a Path,
    /// Fallback pattern; a glob in `input` takes precedence
    pub pattern: Option<&'a str>,
    pub recursive: bool,
    /// Create missing destination subfolders in recursive mode; off for dry runs
    pub create_dirs: bool,
    pub rules: Option<&'a RuleSet>,
    /// Also convert files no rule claimed
    pub fallback: bool,
    pub profile: &'a BatchProfile,
    pub shared: &'a SharedSettings,
}

/// Result of planning
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub tasks: TaskMap,
    /// Input folder after wildcard splitting
    pub input_root: PathBuf,
    /// Pattern used for the fallback pass
    pub pattern: String,
    /// Files no rule matched (rule mode without fallback)
    pub unmatched: Vec<PathBuf>,
    /// Destinations claimed by more than one source
    pub collisions: Vec<PathBuf>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.tasks.values()
    }
}

/// Build the task map for a folder batch
pub fn plan(request: &PlanRequest) -> Result<Plan, PlanError> {
    if !request.output.is_dir() {
        return Err(PlanError::OutputDirMissing(request.output.to_path_buf()));
    }

    let (folder, wildcard) = paths::split_wildcard(request.input);
    let pattern = wildcard
        .or_else(|| request.pattern.map(str::to_string))
        .unwrap_or_else(|| paths::DEFAULT_PATTERN.to_string());

    if !folder.is_dir() {
        return Err(PlanError::InputDirMissing(folder));
    }

    let input_root = paths::absolute(&folder);
    let output_root = paths::absolute(request.output);
    let files = enumerate(&input_root, request.recursive);
    debug!("Found {} files under {}", files.len(), input_root.display());

    let mut planner = Registry {
        request,
        input_root: &input_root,
        output_root: &output_root,
        tasks: TaskMap::new(),
        destinations: HashMap::new(),
        collisions: Vec::new(),
    };

    if let Some(rules) = request.rules {
        for rule in rules.iter() {
            let profile = request.profile.with_rule(&rule.overrides);
            for (file, name) in &files {
                if rule.matches(name) {
                    planner.register(file, &profile)?;
                }
            }
        }
    }

    let mut unmatched = Vec::new();
    if request.rules.is_none() || request.fallback {
        let matcher = glob_matcher(&pattern)?;
        for (file, name) in &files {
            if matcher.is_match(name) {
                planner.register(file, request.profile)?;
            }
        }
    } else {
        for (file, _) in &files {
            if !planner.tasks.contains_key(&SourceKey::for_path(file)) {
                debug!("No rule matches {}", file.display());
                unmatched.push(file.clone());
            }
        }
    }

    let Registry {
        tasks, collisions, ..
    } = planner;
    info!(
        "Planned {} jobs ({} unmatched, {} destination collisions)",
        tasks.len(),
        unmatched.len(),
        collisions.len()
    );

    Ok(Plan {
        tasks,
        input_root,
        pattern,
        unmatched,
        collisions,
    })
}

/// Files under `root` with their file names, sorted by name at every level
fn enumerate(root: &Path, recursive: bool) -> Vec<(PathBuf, String)> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            (e.into_path(), name)
        })
        .collect()
}

fn glob_matcher(pattern: &str) -> Result<GlobMatcher, PlanError> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|source| PlanError::BadPattern {
            pattern: pattern.to_string(),
            source,
        })
}

struct Registry<'a> {
    request: &'a PlanRequest<'a>,
    input_root: &'a Path,
    output_root: &'a Path,
    tasks: TaskMap,
    destinations: HashMap<PathBuf, SourceKey>,
    collisions: Vec<PathBuf>,
}

impl Registry<'_> {
    /// Register a job unless the source is already claimed
    fn register(&mut self, source: &Path, profile: &BatchProfile) -> Result<(), PlanError> {
        let key = SourceKey::for_path(source);
        if self.tasks.contains_key(&key) {
            debug!("Already planned: {}", source.display());
            return Ok(());
        }

        let dest = paths::mirror_destination(source, self.input_root, self.output_root);
        if self.request.recursive && self.request.create_dirs {
            paths::ensure_parent_dirs(&dest).map_err(|e| PlanError::Io {
                path: dest.clone(),
                source: e,
            })?;
        }

        if let Some(other) = self.destinations.get(&dest) {
            let first = self.tasks.get(other).map(|j| j.source_path.display().to_string());
            warn!(
                "{} and {} both convert to {}",
                first.unwrap_or_default(),
                source.display(),
                dest.display()
            );
            self.collisions.push(dest.clone());
        } else {
            self.destinations.insert(dest.clone(), key);
        }

        let job = profile.resolve_job(self.request.shared, source, &dest);
        self.tasks.insert(key, job);
        Ok(())
    }
}
