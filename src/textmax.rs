//! TextMax rule files
//!
//! A line-oriented DSL mapping file name globs to encoding overrides:
//!
//! ```text
//! # pattern      format  [WxH]   [-flags]
//! metal_*.tga    DXT5    512x*   -normal,nomip
//! *_sky.png      *       *x*     -*
//! door_*.png     DXT1
//! ```
//!
//! - `format`: a format name (used for both color and alpha) or `*` for the
//!   batch format pair
//! - `WxH`: clamp size, either axis may be `*` for the batch value;
//!   present means clamping is on
//! - `-flags`: comma-separated flag names, or `-*` for the batch flags
//!
//! Missing clamp/flags tokens inherit the batch values. Malformed lines are
//! skipped with a warning; parsing always continues with the next line.

use crate::job::{ClampDims, Encoding};
use crate::planner::PlanError;
use crate::resolver::BatchProfile;
use crate::textures::{is_valid_clamp, FlagSet, TextureFormat};
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Resolved overrides for one pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOverride {
    pub encoding: Encoding,
    pub clamp: Option<ClampDims>,
    pub flags: FlagSet,
}

/// One parsed rule line
#[derive(Debug, Clone)]
pub struct RulePattern {
    pub pattern: String,
    pub overrides: RuleOverride,
    /// 1-based line number in the rule file
    pub line: usize,
    matcher: GlobMatcher,
}

impl RulePattern {
    /// Match against a file name (case-insensitive)
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

/// Why a rule line was skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("missing format token")]
    MissingFormat,

    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("invalid size clamp '{0}' (expected WxH with powers of two 2..4096 or '*')")]
    BadClamp(String),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("invalid pattern '{0}': {1}")]
    BadPattern(String, String),

    #[error("duplicate pattern '{0}', first definition on line {1} wins")]
    DuplicatePattern(String, usize),
}

/// A skipped line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    pub line: usize,
    pub text: String,
    pub error: RuleError,
}

impl std::fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.error, self.text)
    }
}

/// Ordered rule set, first registered pattern wins
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RulePattern>,
    warnings: Vec<RuleWarning>,
}

fn clamp_regex() -> &'static Regex {
    static CLAMP_RE: OnceLock<Regex> = OnceLock::new();
    CLAMP_RE.get_or_init(|| Regex::new(r"^(\*|\d+)[xX](\*|\d+)$").expect("valid clamp regex"))
}

impl RuleSet {
    /// Load a rule file. A missing file is fatal for the batch.
    pub fn load(path: &Path, profile: &BatchProfile) -> Result<Self, PlanError> {
        if !path.is_file() {
            return Err(PlanError::RuleFileMissing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let rules = Self::parse(&text, profile);
        debug!(
            "Loaded {} rules from {} ({} lines skipped)",
            rules.len(),
            path.display(),
            rules.warnings.len()
        );
        Ok(rules)
    }

    /// Parse rule text, resolving `*` tokens against the batch profile
    pub fn parse(text: &str, profile: &BatchProfile) -> Self {
        let mut set = RuleSet::default();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.replace('\t', " ");
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let result = parse_line(line, profile).and_then(|(pattern, overrides)| {
                if let Some(first) = set.rules.iter().find(|r| r.pattern == pattern) {
                    return Err(RuleError::DuplicatePattern(pattern, first.line));
                }
                let matcher = GlobBuilder::new(&pattern)
                    .case_insensitive(true)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| RuleError::BadPattern(pattern.clone(), e.kind().to_string()))?
                    .compile_matcher();
                Ok(RulePattern {
                    pattern,
                    overrides,
                    line: line_no,
                    matcher,
                })
            });

            match result {
                Ok(rule) => set.rules.push(rule),
                Err(error) => {
                    let warning = RuleWarning {
                        line: line_no,
                        text: line.to_string(),
                        error,
                    };
                    warn!("Skipping rule {}", warning);
                    set.warnings.push(warning);
                }
            }
        }

        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &RulePattern> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Lines that were skipped
    pub fn warnings(&self) -> &[RuleWarning] {
        &self.warnings
    }
}

fn parse_line(line: &str, profile: &BatchProfile) -> Result<(String, RuleOverride), RuleError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (pattern, format) = match tokens.as_slice() {
        [pattern, format, ..] => (*pattern, *format),
        _ => return Err(RuleError::MissingFormat),
    };

    let encoding = if format == "*" {
        profile.encoding
    } else {
        TextureFormat::from_str(format)
            .map(Encoding::uniform)
            .ok_or_else(|| RuleError::UnknownFormat(format.to_string()))?
    };

    let mut rest = &tokens[2..];

    let mut clamp = profile.clamp;
    if let Some(token) = rest.first().filter(|t| !t.starts_with('-')) {
        clamp = Some(parse_clamp(token, profile)?);
        rest = &rest[1..];
    }

    let mut flags = profile.flags;
    if let Some(token) = rest.first().filter(|t| t.starts_with('-')) {
        flags = parse_flags(token, profile);
        rest = &rest[1..];
    }

    if let Some(extra) = rest.first() {
        return Err(RuleError::UnexpectedToken(extra.to_string()));
    }

    Ok((
        pattern.to_string(),
        RuleOverride {
            encoding,
            clamp,
            flags,
        },
    ))
}

fn parse_clamp(token: &str, profile: &BatchProfile) -> Result<ClampDims, RuleError> {
    let bad = || RuleError::BadClamp(token.to_string());
    let caps = clamp_regex().captures(token).ok_or_else(bad)?;

    let axis = |text: &str, default: u32| -> Result<u32, RuleError> {
        if text == "*" {
            return Ok(default);
        }
        let n: u32 = text.parse().map_err(|_| bad())?;
        if is_valid_clamp(n) {
            Ok(n)
        } else {
            Err(bad())
        }
    };

    Ok(ClampDims {
        width: axis(&caps[1], profile.clamp_size.width)?,
        height: axis(&caps[2], profile.clamp_size.height)?,
    })
}

fn parse_flags(token: &str, profile: &BatchProfile) -> FlagSet {
    let list = &token[1..];
    if list == "*" {
        return profile.flags;
    }
    let (set, unknown) = FlagSet::parse_list(list);
    if !unknown.is_empty() {
        debug!("Ignoring unknown flags: {}", unknown.join(", "));
    }
    set
}
