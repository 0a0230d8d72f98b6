use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use changelens_core::config::ContextSection;
use changelens_core::segment::{FileType, segment};
use changelens_core::{ChangeSet, analyze};
use clap::Args;
use tracing::{debug, info, warn};

use crate::render::{OutputFormat, render};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Unified diff file (`-` reads standard input)
    #[arg(long, default_value = "-")]
    pub diff: String,

    /// Directory holding the pre-change snapshot
    #[arg(long)]
    pub before: PathBuf,

    /// Directory holding the post-change snapshot
    #[arg(long)]
    pub after: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Configuration file (default: ./changelens.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also load untouched files matching the configured context patterns
    #[arg(long)]
    pub context: bool,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let before_root = resolve_dir(&args.before)?;
    let after_root = resolve_dir(&args.after)?;

    let mut changes = ChangeSet::new(read_diff(&args.diff)?);

    let segmentation = segment(&changes.diff, config.diff.context_lines);
    for unit in &segmentation.units {
        if let Some(path) = unit.before_path() {
            load_file(&before_root, path, &mut changes.before)?;
        }
        if let Some(path) = unit.after_path() {
            load_file(&after_root, path, &mut changes.after)?;
        }
    }

    if args.context {
        load_context(&before_root, &config.context, &mut changes.before)?;
        load_context(&after_root, &config.context, &mut changes.after)?;
    }
    info!(
        touched = segmentation.units.len(),
        before = changes.before.len(),
        after = changes.after.len(),
        "Change set loaded"
    );

    let report = analyze(&changes, &config).context("Analysis failed")?;
    println!("{}", render(&report, args.format)?);
    Ok(())
}

fn resolve_dir(path: &Path) -> anyhow::Result<PathBuf> {
    let resolved = std::fs::canonicalize(path)
        .with_context(|| format!("Cannot resolve path: {}", path.display()))?;
    if !resolved.is_dir() {
        anyhow::bail!("Cannot resolve path: {} is not a directory", path.display());
    }
    Ok(resolved)
}

fn read_diff(source: &str) -> anyhow::Result<String> {
    let bytes = if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Cannot read diff from standard input")?;
        buf
    } else {
        std::fs::read(source).with_context(|| format!("Cannot read diff: {source}"))?
    };
    String::from_utf8(bytes).map_err(|_| anyhow::anyhow!("Invalid diff: {source} is not valid UTF-8"))
}

/// Paths from the diff must stay inside the snapshot directory.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Read one touched file. Files absent from the snapshot are left out so the
/// analysis reports them as missing content.
fn load_file(
    root: &Path,
    relative: &Path,
    into: &mut BTreeMap<PathBuf, String>,
) -> anyhow::Result<()> {
    if !is_contained(relative) {
        warn!(path = %relative.display(), "Path escapes the snapshot directory, ignoring");
        return Ok(());
    }
    let full = root.join(relative);
    if !full.is_file() {
        debug!(path = %full.display(), "Touched file not present in snapshot");
        return Ok(());
    }
    let bytes = std::fs::read(&full).with_context(|| format!("Cannot read {}", full.display()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| anyhow::anyhow!("Invalid content: {} is not valid UTF-8", relative.display()))?;
    into.insert(relative.to_path_buf(), text);
    Ok(())
}

/// Add untouched PHP files matching the include patterns. Touched files
/// already loaded are never replaced.
fn load_context(
    root: &Path,
    section: &ContextSection,
    into: &mut BTreeMap<PathBuf, String>,
) -> anyhow::Result<()> {
    let excludes = section
        .exclude_patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).with_context(|| format!("Invalid context exclude pattern in config: {p}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let mut added = 0usize;
    for include in &section.include_patterns {
        let pattern = format!("{escaped_root}/{include}");
        let entries = glob::glob(&pattern)
            .with_context(|| format!("Invalid context include pattern in config: {include}"))?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    debug!(error = %e, "Unreadable context entry");
                    continue;
                }
            };
            if !path.is_file() || FileType::from_path(&path) != Some(FileType::Php) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if is_excluded(relative, &excludes) || into.contains_key(relative) {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    into.insert(relative.to_path_buf(), text);
                    added += 1;
                }
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping context file"),
            }
        }
    }
    debug!(root = %root.display(), added, "Context files loaded");
    Ok(())
}

fn is_excluded(relative: &Path, excludes: &[glob::Pattern]) -> bool {
    excludes.iter().any(|pattern| {
        pattern.matches_path(relative)
            || relative
                .components()
                .any(|c| pattern.matches(&c.as_os_str().to_string_lossy()))
    })
}
