//! Diff segmentation: unified diff text → per-file [`DiffUnit`]s.
//!
//! Segmentation never fails as a whole. A file whose section is malformed is
//! reported as a [`SkippedFile`] and the remaining files are still returned.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{SkipReason, SkippedFile};

static HUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(?: ?(.*))?$").expect("valid regex")
});

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z_\x{80}-\x{10FFFF}][A-Za-z0-9_\x{80}-\x{10FFFF}]*$").expect("valid regex")
});

const DEV_NULL: &str = "/dev/null";

// ── Output types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
}

/// File categories the detectors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Php,
    Transfer,
    /// Propel database schema (`*.schema.xml`).
    Schema,
    ComposerManifest,
}

impl FileType {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".transfer.xml") {
            Some(Self::Transfer)
        } else if lower.ends_with(".schema.xml") {
            Some(Self::Schema)
        } else if name == "composer.json" {
            Some(Self::ComposerManifest)
        } else if lower.ends_with(".php") {
            Some(Self::Php)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTag {
    Context,
    Addition,
    Removal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub tag: LineTag,
    pub content: String,
    /// 1-based line in the old file (context and removals).
    pub old_line: Option<usize>,
    /// 1-based line in the new file (context and additions).
    pub new_line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// Trailing text of the header, usually the enclosing function.
    pub section: Option<String>,
    /// Lines after context trimming.
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffUnit {
    /// Post-change path (pre-change path for deletions).
    pub path: PathBuf,
    /// Pre-change path, absent for additions.
    pub old_path: Option<PathBuf>,
    pub status: FileStatus,
    pub file_type: FileType,
    /// Class name implied by the file name (PHP files only).
    pub class_name: Option<String>,
    pub hunks: Vec<Hunk>,
    pub context_width: usize,
}

impl DiffUnit {
    pub fn added_lines(&self) -> usize {
        self.count(LineTag::Addition)
    }

    pub fn removed_lines(&self) -> usize {
        self.count(LineTag::Removal)
    }

    fn count(&self, tag: LineTag) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.tag == tag)
            .count()
    }

    /// Path holding the pre-change content, if the file existed before.
    pub fn before_path(&self) -> Option<&Path> {
        match self.status {
            FileStatus::Added => None,
            _ => Some(self.old_path.as_deref().unwrap_or(&self.path)),
        }
    }

    /// Path holding the post-change content, if the file exists after.
    pub fn after_path(&self) -> Option<&Path> {
        match self.status {
            FileStatus::Deleted => None,
            _ => Some(&self.path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    pub units: Vec<DiffUnit>,
    pub skipped: Vec<SkippedFile>,
}

// ── Raw section accumulation ───────────────────────────────────────

#[derive(Debug, Default)]
struct RawSection {
    git_old: Option<String>,
    git_new: Option<String>,
    minus: Option<String>,
    plus: Option<String>,
    new_file: bool,
    deleted_file: bool,
    rename_from: Option<String>,
    rename_to: Option<String>,
    copy_from: Option<String>,
    copy_to: Option<String>,
    hunks: Vec<Hunk>,
    malformed: bool,
}

#[derive(Debug)]
struct OpenHunk {
    old_remaining: usize,
    new_remaining: usize,
    old_line: usize,
    new_line: usize,
}

/// Split unified diff text into per-file units.
///
/// Sections start at `diff --git` or at a `--- ` header outside a hunk. Hunk
/// bodies must match their header counts; a mismatch skips that file only.
pub fn segment(diff: &str, context_width: usize) -> Segmentation {
    let mut sections: Vec<RawSection> = Vec::new();
    let mut open: Option<OpenHunk> = None;

    for line in diff.lines() {
        if let Some(state) = open.as_mut() {
            if let Some(section) = sections.last_mut() {
                match consume_hunk_line(line, state, section) {
                    HunkLine::Consumed => {
                        if state.old_remaining == 0 && state.new_remaining == 0 {
                            open = None;
                        }
                        continue;
                    }
                    HunkLine::Ignored => continue,
                    HunkLine::Foreign => {
                        section.malformed = true;
                        open = None;
                    }
                }
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            let (old, new) = split_git_paths(rest);
            sections.push(RawSection {
                git_old: old,
                git_new: new,
                ..RawSection::default()
            });
        } else if let Some(rest) = line.strip_prefix("--- ") {
            let path = header_path(rest);
            let in_git_header = sections.last().is_some_and(|s| {
                s.git_old.is_some() && s.minus.is_none() && s.hunks.is_empty() && !s.malformed
            });
            if let (true, Some(section)) = (in_git_header, sections.last_mut()) {
                section.minus = Some(path);
            } else {
                sections.push(RawSection {
                    minus: Some(path),
                    ..RawSection::default()
                });
            }
        } else if let Some(section) = sections.last_mut() {
            if let Some(rest) = line.strip_prefix("+++ ") {
                section.plus = Some(header_path(rest));
            } else if line.starts_with("new file mode") {
                section.new_file = true;
            } else if line.starts_with("deleted file mode") {
                section.deleted_file = true;
            } else if let Some(rest) = line.strip_prefix("rename from ") {
                section.rename_from = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("rename to ") {
                section.rename_to = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("copy from ") {
                section.copy_from = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("copy to ") {
                section.copy_to = Some(rest.trim().to_string());
            } else if line.starts_with("@@") {
                match parse_hunk_header(line) {
                    Some(hunk) => {
                        let state = OpenHunk {
                            old_remaining: hunk.old_count,
                            new_remaining: hunk.new_count,
                            old_line: hunk.old_start,
                            new_line: hunk.new_start,
                        };
                        section.hunks.push(hunk);
                        if state.old_remaining > 0 || state.new_remaining > 0 {
                            open = Some(state);
                        }
                    }
                    None => {
                        debug!(header = line, "Unparseable hunk header");
                        section.malformed = true;
                    }
                }
            } else if !section.hunks.is_empty()
                && (line.starts_with('+') || line.starts_with('-') || line.starts_with(' '))
            {
                // Body lines beyond the counts announced by the header.
                section.malformed = true;
            }
        }
    }

    if open.is_some() {
        if let Some(section) = sections.last_mut() {
            section.malformed = true;
        }
    }

    let mut result = Segmentation::default();
    for section in sections {
        finish_section(section, context_width, &mut result);
    }
    result
}

enum HunkLine {
    Consumed,
    Ignored,
    Foreign,
}

fn consume_hunk_line(line: &str, state: &mut OpenHunk, section: &mut RawSection) -> HunkLine {
    if line.starts_with('\\') {
        return HunkLine::Ignored;
    }
    let (tag, content) = match line.chars().next() {
        None => (LineTag::Context, ""),
        Some(' ') => (LineTag::Context, &line[1..]),
        Some('+') => (LineTag::Addition, &line[1..]),
        Some('-') => (LineTag::Removal, &line[1..]),
        Some(_) => return HunkLine::Foreign,
    };

    let (uses_old, uses_new) = match tag {
        LineTag::Context => (true, true),
        LineTag::Addition => (false, true),
        LineTag::Removal => (true, false),
    };
    if (uses_old && state.old_remaining == 0) || (uses_new && state.new_remaining == 0) {
        return HunkLine::Foreign;
    }

    let old_line = uses_old.then_some(state.old_line);
    let new_line = uses_new.then_some(state.new_line);
    if uses_old {
        state.old_remaining -= 1;
        state.old_line += 1;
    }
    if uses_new {
        state.new_remaining -= 1;
        state.new_line += 1;
    }

    if let Some(hunk) = section.hunks.last_mut() {
        hunk.lines.push(DiffLine {
            tag,
            content: content.to_string(),
            old_line,
            new_line,
        });
    }
    HunkLine::Consumed
}

fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let caps = HUNK_HEADER_RE.captures(line.trim_end())?;
    let number = |i: usize, default: usize| -> Option<usize> {
        caps.get(i).map_or(Some(default), |m| m.as_str().parse().ok())
    };
    let (old_start, old_count) = (number(1, 0)?, number(2, 1)?);
    let (new_start, new_count) = (number(3, 0)?, number(4, 1)?);
    // Line numbering runs up to start + count; a range past usize is malformed.
    old_start.checked_add(old_count)?;
    new_start.checked_add(new_count)?;
    Some(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        section: caps
            .get(5)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty()),
        lines: Vec::new(),
    })
}

fn split_git_paths(rest: &str) -> (Option<String>, Option<String>) {
    match rest.rsplit_once(" b/") {
        Some((old, new)) => (
            Some(old.strip_prefix("a/").unwrap_or(old).to_string()),
            Some(new.to_string()),
        ),
        None => (None, None),
    }
}

/// `a/src/Foo.php\t2024-01-01` → `src/Foo.php`. `/dev/null` is kept verbatim.
fn header_path(rest: &str) -> String {
    let raw = rest.split('\t').next().unwrap_or(rest).trim();
    if raw == DEV_NULL {
        return raw.to_string();
    }
    raw.strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw)
        .to_string()
}

fn finish_section(section: RawSection, context_width: usize, out: &mut Segmentation) {
    let added = section.new_file || section.minus.as_deref() == Some(DEV_NULL);
    let deleted = section.deleted_file || section.plus.as_deref() == Some(DEV_NULL);
    let minus = section.minus.filter(|p| p != DEV_NULL);
    let plus = section.plus.filter(|p| p != DEV_NULL);

    let old_path = minus
        .or_else(|| section.rename_from.clone())
        .or_else(|| section.copy_from.clone())
        .or_else(|| section.git_old.clone());
    let new_path = plus
        .or(section.rename_to)
        .or(section.copy_to)
        .or(section.git_new);

    let status = if added {
        FileStatus::Added
    } else if deleted {
        FileStatus::Deleted
    } else if section.copy_from.is_some() {
        FileStatus::Copied
    } else if section.rename_from.is_some() || old_path != new_path {
        FileStatus::Renamed
    } else {
        FileStatus::Modified
    };

    let path = match status {
        FileStatus::Deleted => old_path.clone().or_else(|| new_path.clone()),
        _ => new_path.clone().or_else(|| old_path.clone()),
    };
    let Some(path) = path.map(PathBuf::from) else {
        warn!("Diff section without any file path; ignoring");
        return;
    };

    let skip = |out: &mut Segmentation, reason: SkipReason| {
        debug!(path = %path.display(), reason = reason.as_str(), "Skipping file");
        out.skipped.push(SkippedFile {
            path: path.clone(),
            reason,
        });
    };

    let Some(file_type) = FileType::from_path(&path) else {
        skip(out, SkipReason::UnsupportedFileType);
        return;
    };
    if section.malformed {
        skip(out, SkipReason::ParseFailed);
        return;
    }

    let class_name = if file_type == FileType::Php {
        match class_name_from_path(&path) {
            Some(name) => Some(name),
            None => {
                skip(out, SkipReason::NameExtractionFailed);
                return;
            }
        }
    } else {
        None
    };

    let old_path = match status {
        FileStatus::Added => None,
        _ => old_path.map(PathBuf::from),
    };

    out.units.push(DiffUnit {
        path,
        old_path,
        status,
        file_type,
        class_name,
        hunks: section
            .hunks
            .into_iter()
            .map(|h| trim_context(h, context_width))
            .collect(),
        context_width,
    });
}

/// Class name from the `.../ClassName.php` naming convention.
pub fn class_name_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    IDENTIFIER_RE.is_match(stem).then(|| stem.to_string())
}

/// Keep only context lines within `width` lines of a change.
///
/// One forward pass: context lines wait in `pending` until the next change
/// decides which of them are close enough to keep.
fn trim_context(mut hunk: Hunk, width: usize) -> Hunk {
    let lines = std::mem::take(&mut hunk.lines);
    let mut kept = Vec::with_capacity(lines.len());
    let mut pending: Vec<DiffLine> = Vec::new();
    // Context lines seen since the last change, if there was one.
    let mut since_change: Option<usize> = None;

    for line in lines {
        if line.tag == LineTag::Context {
            match since_change {
                Some(seen) if seen < width => {
                    kept.push(line);
                    since_change = Some(seen + 1);
                }
                _ => {
                    since_change = since_change.map(|seen| seen.saturating_add(1));
                    pending.push(line);
                }
            }
        } else {
            let keep_from = pending.len().saturating_sub(width);
            kept.extend(pending.drain(..).skip(keep_from));
            kept.push(line);
            since_change = Some(0);
        }
    }
    hunk.lines = kept;
    hunk
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODIFIED: &str = "\
diff --git a/src/Pyz/Zed/Cart/CartConfig.php b/src/Pyz/Zed/Cart/CartConfig.php
index 1111111..2222222 100644
--- a/src/Pyz/Zed/Cart/CartConfig.php
+++ b/src/Pyz/Zed/Cart/CartConfig.php
@@ -3,4 +3,4 @@ class CartConfig
 {
-    public function getMaxItems() { return 10; }
+    public function getMaxItems() { return 20; }

 }
";

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(segment("", 10), Segmentation::default());
    }

    #[test]
    fn modified_file_with_blank_context_line() {
        let seg = segment(MODIFIED, 10);
        assert!(seg.skipped.is_empty());
        assert_eq!(seg.units.len(), 1);

        let unit = &seg.units[0];
        assert_eq!(unit.path, PathBuf::from("src/Pyz/Zed/Cart/CartConfig.php"));
        assert_eq!(unit.status, FileStatus::Modified);
        assert_eq!(unit.file_type, FileType::Php);
        assert_eq!(unit.class_name.as_deref(), Some("CartConfig"));
        assert_eq!(unit.added_lines(), 1);
        assert_eq!(unit.removed_lines(), 1);

        let hunk = &unit.hunks[0];
        assert_eq!(hunk.section.as_deref(), Some("class CartConfig"));
        assert_eq!(hunk.lines.len(), 5);
        assert_eq!(hunk.lines[1].old_line, Some(4));
        assert_eq!(hunk.lines[2].new_line, Some(4));
        assert_eq!(hunk.lines[3].content, "");
    }

    #[test]
    fn statuses() {
        let diff = "\
diff --git a/src/New.php b/src/New.php
new file mode 100644
--- /dev/null
+++ b/src/New.php
@@ -0,0 +1 @@
+<?php
diff --git a/src/Old.php b/src/Old.php
deleted file mode 100644
--- a/src/Old.php
+++ /dev/null
@@ -1 +0,0 @@
-<?php
diff --git a/src/A.php b/src/B.php
similarity index 100%
rename from src/A.php
rename to src/B.php
diff --git a/src/C.php b/src/D.php
similarity index 90%
copy from src/C.php
copy to src/D.php
--- a/src/C.php
+++ b/src/D.php
@@ -1 +1 @@
-<?php
+<?php // copy
";
        let seg = segment(diff, 10);
        assert!(seg.skipped.is_empty(), "{:?}", seg.skipped);
        let statuses: Vec<_> = seg.units.iter().map(|u| (u.path.clone(), u.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (PathBuf::from("src/New.php"), FileStatus::Added),
                (PathBuf::from("src/Old.php"), FileStatus::Deleted),
                (PathBuf::from("src/B.php"), FileStatus::Renamed),
                (PathBuf::from("src/D.php"), FileStatus::Copied),
            ]
        );
        assert_eq!(seg.units[0].before_path(), None);
        assert_eq!(seg.units[1].after_path(), None);
        assert_eq!(seg.units[2].before_path(), Some(Path::new("src/A.php")));
    }

    #[test]
    fn plain_unified_diff_without_git_header() {
        let diff = "\
--- a/src/Foo.php\t2024-01-01 00:00:00
+++ b/src/Bar.php\t2024-01-02 00:00:00
@@ -1,2 +1,2 @@
 <?php
-// a
+// b
--- a/src/Baz.php
+++ b/src/Baz.php
@@ -1 +1 @@
-x
+y
";
        let seg = segment(diff, 10);
        assert_eq!(seg.units.len(), 2);
        assert_eq!(seg.units[0].status, FileStatus::Renamed);
        assert_eq!(seg.units[0].old_path, Some(PathBuf::from("src/Foo.php")));
        assert_eq!(seg.units[1].status, FileStatus::Modified);
    }

    #[test]
    fn removed_line_that_looks_like_a_header_stays_in_hunk() {
        let diff = "\
--- a/src/Foo.php
+++ b/src/Foo.php
@@ -1,2 +1,1 @@
 <?php
---- comment
";
        let seg = segment(diff, 10);
        assert_eq!(seg.units.len(), 1);
        assert_eq!(seg.units[0].removed_lines(), 1);
        assert_eq!(seg.units[0].hunks[0].lines[1].content, "--- comment");
    }

    #[test]
    fn bad_hunks_skip_only_their_file() {
        let diff = "\
diff --git a/src/Bad.php b/src/Bad.php
--- a/src/Bad.php
+++ b/src/Bad.php
@@ -1,3 +1,3 @@
 <?php
-a
+b
diff --git a/src/Header.php b/src/Header.php
--- a/src/Header.php
+++ b/src/Header.php
@@ -x +1 @@
+b
diff --git a/src/Good.php b/src/Good.php
--- a/src/Good.php
+++ b/src/Good.php
@@ -1 +1 @@
-a
+b
";
        let seg = segment(diff, 10);
        assert_eq!(seg.units.len(), 1);
        assert_eq!(seg.units[0].path, PathBuf::from("src/Good.php"));
        assert_eq!(
            seg.skipped,
            vec![
                SkippedFile {
                    path: PathBuf::from("src/Bad.php"),
                    reason: SkipReason::ParseFailed
                },
                SkippedFile {
                    path: PathBuf::from("src/Header.php"),
                    reason: SkipReason::ParseFailed
                },
            ]
        );
    }

    #[test]
    fn excess_body_lines_are_malformed() {
        let diff = "\
--- a/src/Foo.php
+++ b/src/Foo.php
@@ -1 +1 @@
-a
+b
+c
";
        let seg = segment(diff, 10);
        assert!(seg.units.is_empty());
        assert_eq!(seg.skipped[0].reason, SkipReason::ParseFailed);
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let diff = "\
--- a/src/Foo.php
+++ b/src/Foo.php
@@ -1 +1 @@
-a
\\ No newline at end of file
+b
\\ No newline at end of file
";
        let seg = segment(diff, 10);
        assert!(seg.skipped.is_empty());
        assert_eq!(seg.units[0].hunks[0].lines.len(), 2);
    }

    #[test]
    fn file_type_classification() {
        let diff = "\
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-a
+b
diff --git a/src/Shared/Cart/Transfer/cart.transfer.xml b/src/Shared/Cart/Transfer/cart.transfer.xml
--- a/src/Shared/Cart/Transfer/cart.transfer.xml
+++ b/src/Shared/Cart/Transfer/cart.transfer.xml
@@ -1 +1 @@
-a
+b
diff --git a/composer.json b/composer.json
--- a/composer.json
+++ b/composer.json
@@ -1 +1 @@
-a
+b
diff --git a/src/Zed/Cart/Persistence/Propel/Schema/spy_cart.schema.xml b/src/Zed/Cart/Persistence/Propel/Schema/spy_cart.schema.xml
--- a/src/Zed/Cart/Persistence/Propel/Schema/spy_cart.schema.xml
+++ b/src/Zed/Cart/Persistence/Propel/Schema/spy_cart.schema.xml
@@ -1 +1 @@
-a
+b
diff --git a/src/my-helpers.php b/src/my-helpers.php
--- a/src/my-helpers.php
+++ b/src/my-helpers.php
@@ -1 +1 @@
-a
+b
";
        let seg = segment(diff, 10);
        let types: Vec<_> = seg.units.iter().map(|u| u.file_type).collect();
        assert_eq!(types, vec![FileType::Transfer, FileType::ComposerManifest, FileType::Schema]);
        assert_eq!(
            seg.skipped,
            vec![
                SkippedFile {
                    path: PathBuf::from("README.md"),
                    reason: SkipReason::UnsupportedFileType
                },
                SkippedFile {
                    path: PathBuf::from("src/my-helpers.php"),
                    reason: SkipReason::NameExtractionFailed
                },
            ]
        );
    }

    #[test]
    fn context_is_trimmed_around_changes() {
        let mut diff = String::from("--- a/src/Foo.php\n+++ b/src/Foo.php\n@@ -1,9 +1,9 @@\n");
        for i in 0..4 {
            diff.push_str(&format!(" c{i}\n"));
        }
        diff.push_str("-old\n+new\n");
        for i in 4..8 {
            diff.push_str(&format!(" c{i}\n"));
        }
        let seg = segment(&diff, 2);
        let contents: Vec<_> = seg.units[0].hunks[0]
            .lines
            .iter()
            .map(|l| l.content.as_str())
            .collect();
        assert_eq!(contents, vec!["c2", "c3", "old", "new", "c4", "c5"]);
        assert_eq!(seg.units[0].context_width, 2);
    }

    #[test]
    fn overflowing_hunk_range_skips_file() {
        let diff = "\
diff --git a/src/Huge.php b/src/Huge.php
--- a/src/Huge.php
+++ b/src/Huge.php
@@ -18446744073709551615,2 +1,2 @@
 a
 b
diff --git a/src/Good.php b/src/Good.php
--- a/src/Good.php
+++ b/src/Good.php
@@ -1 +1 @@
-a
+b
";
        let seg = segment(diff, 10);
        assert_eq!(seg.units.len(), 1);
        assert_eq!(seg.units[0].path, PathBuf::from("src/Good.php"));
        assert_eq!(
            seg.skipped,
            vec![SkippedFile {
                path: PathBuf::from("src/Huge.php"),
                reason: SkipReason::ParseFailed
            }]
        );
    }

    #[test]
    fn hunk_ending_at_usize_max_is_accepted() {
        let header = format!("@@ -{},1 +1 @@", usize::MAX - 1);
        let hunk = parse_hunk_header(&header).unwrap();
        assert_eq!(hunk.old_start, usize::MAX - 1);
        assert!(parse_hunk_header(&format!("@@ -1 +{},2 @@", usize::MAX)).is_none());
        assert!(parse_hunk_header("@@ -1 +99999999999999999999999 @@").is_none());
    }

    #[test]
    fn context_between_close_changes_is_kept_once() {
        let diff = "\
--- a/src/Foo.php
+++ b/src/Foo.php
@@ -1,7 +1,7 @@
 c0
-a
+A
 c1
 c2
 c3
-b
+B
 c4
";
        let contents = |width: usize| -> Vec<String> {
            segment(diff, width).units[0].hunks[0]
                .lines
                .iter()
                .map(|l| l.content.clone())
                .collect()
        };
        assert_eq!(contents(0), vec!["a", "A", "b", "B"]);
        assert_eq!(contents(1), vec!["c0", "a", "A", "c1", "c3", "b", "B", "c4"]);
        assert_eq!(
            contents(2),
            vec!["c0", "a", "A", "c1", "c2", "c3", "b", "B", "c4"]
        );
    }

    #[test]
    fn class_names_follow_file_stems() {
        assert_eq!(class_name_from_path(Path::new("a/b/CartFacade.php")).as_deref(), Some("CartFacade"));
        assert_eq!(class_name_from_path(Path::new("a/b/_Private1.php")).as_deref(), Some("_Private1"));
        assert_eq!(class_name_from_path(Path::new("a/b/1Bad.php")), None);
        assert_eq!(class_name_from_path(Path::new("a/b/with-dash.php")), None);
    }
}
