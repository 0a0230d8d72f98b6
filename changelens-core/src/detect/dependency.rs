//! Composer manifest (`composer.json`) comparison.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::types::{
    ConstraintChange, ConstraintChangeKind, PhpVersionChange, SkipReason, VersionChange,
    VersionChangeKind,
};

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    require: BTreeMap<String, String>,
    #[serde(default, rename = "require-dev")]
    require_dev: BTreeMap<String, String>,
}

/// The platform requirement, tracked apart from packages.
const PHP: &str = "php";

impl Manifest {
    fn parse(json: &str) -> Result<Self, SkipReason> {
        serde_json::from_str(json).map_err(|e| {
            debug!(error = %e, "composer manifest is not valid JSON");
            SkipReason::ParseFailed
        })
    }

    /// The `php` constraint of `require`.
    fn php(&self) -> Option<&String> {
        self.require.get(PHP)
    }

    /// `require` and `require-dev` merged without `php`; `require-dev` wins
    /// on conflict.
    fn packages(self) -> BTreeMap<String, String> {
        let mut all = self.require;
        all.extend(self.require_dev);
        all.remove(PHP);
        all
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyChanges {
    pub versions: Vec<VersionChange>,
    pub constraints: Vec<ConstraintChange>,
    pub php: Vec<PhpVersionChange>,
}

impl DependencyChanges {
    pub fn extend(&mut self, other: DependencyChanges) {
        self.versions.extend(other.versions);
        self.constraints.extend(other.constraints);
        self.php.extend(other.php);
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.constraints.is_empty() && self.php.is_empty()
    }

    /// File, then package.
    pub fn sort(&mut self) {
        self.versions
            .sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.package.cmp(&b.package)));
        self.constraints
            .sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.package.cmp(&b.package)));
        self.php.sort_by(|a, b| a.file.cmp(&b.file));
    }
}

/// Compare two revisions of the manifest at `file`. A missing side counts as
/// an empty manifest; unreadable JSON on either side skips the file.
pub fn compare_manifests(
    file: &Path,
    before: Option<&str>,
    after: Option<&str>,
) -> Result<DependencyChanges, SkipReason> {
    let old = before.map(Manifest::parse).transpose()?.unwrap_or_default();
    let new = after.map(Manifest::parse).transpose()?.unwrap_or_default();
    let mut changes = DependencyChanges::default();

    let (old_php, new_php) = (old.php().cloned(), new.php().cloned());
    if old_php != new_php {
        let change = match (&old_php, &new_php) {
            (Some(o), Some(n)) => compare_versions(o, n),
            (None, _) => VersionChangeKind::Added,
            (_, None) => VersionChangeKind::Removed,
        };
        changes.php.push(PhpVersionChange {
            file: file.to_path_buf(),
            old: old_php,
            new: new_php,
            change,
        });
    }

    let (old, new) = (old.packages(), new.packages());
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    for package in names {
        let old_constraint = old.get(package);
        let new_constraint = new.get(package);
        if old_constraint == new_constraint {
            continue;
        }

        let version = match (old_constraint, new_constraint) {
            (None, Some(_)) => VersionChangeKind::Added,
            (Some(_), None) => VersionChangeKind::Removed,
            (Some(o), Some(n)) => compare_versions(o, n),
            (None, None) => continue,
        };
        changes.versions.push(VersionChange {
            file: file.to_path_buf(),
            package: package.clone(),
            old: old_constraint.cloned(),
            new: new_constraint.cloned(),
            change: version,
        });

        if let (Some(o), Some(n)) = (old_constraint, new_constraint) {
            changes.constraints.push(ConstraintChange {
                file: file.to_path_buf(),
                package: package.clone(),
                old: Some(o.clone()),
                new: Some(n.clone()),
                change: compare_constraints(o, n),
            });
        }
    }
    Ok(changes)
}

/// Numeric `[major, minor, patch]`.
pub type Version = [u64; 3];

/// Alternatives of a constraint (`^1.0 || ^2.0` has two).
fn alternatives(constraint: &str) -> Vec<&str> {
    constraint
        .split('|')
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .collect()
}

/// Lower bound of one alternative: its first token with operators removed.
fn parse_lower_bound(alternative: &str) -> Option<Version> {
    let token = alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|t| !t.is_empty())?;
    let token = token.trim_start_matches(|c: char| matches!(c, '^' | '~' | '>' | '=' | '<' | 'v' | 'V'));

    let mut version = [0; 3];
    for (i, part) in token.split('.').take(3).enumerate() {
        if matches!(part, "*" | "x" | "X") {
            break;
        }
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        match digits.parse::<u64>() {
            Ok(n) => version[i] = n,
            Err(_) if i == 0 => return None,
            Err(_) => break,
        }
    }
    Some(version)
}

/// Smallest lower bound across all alternatives of a constraint.
pub fn lowest_lower_bound(constraint: &str) -> Option<Version> {
    if constraint.trim() == "*" {
        return Some([0; 3]);
    }
    alternatives(constraint)
        .into_iter()
        .filter_map(parse_lower_bound)
        .min()
}

fn compare_versions(old: &str, new: &str) -> VersionChangeKind {
    match (lowest_lower_bound(old), lowest_lower_bound(new)) {
        (Some(o), Some(n)) => match n.cmp(&o) {
            Ordering::Greater => VersionChangeKind::Upgraded,
            Ordering::Less => VersionChangeKind::Downgraded,
            Ordering::Equal => VersionChangeKind::Unchanged,
        },
        _ => VersionChangeKind::Unchanged,
    }
}

fn compare_constraints(old: &str, new: &str) -> ConstraintChangeKind {
    let old_alts = alternatives(old).len();
    let new_alts = alternatives(new).len();
    match new_alts.cmp(&old_alts) {
        Ordering::Greater => return ConstraintChangeKind::Relaxed,
        Ordering::Less => return ConstraintChangeKind::Tightened,
        Ordering::Equal => {}
    }

    let (Some(o), Some(n)) = (lowest_lower_bound(old), lowest_lower_bound(new)) else {
        return ConstraintChangeKind::Unchanged;
    };
    match o.iter().zip(n.iter()).position(|(a, b)| a != b) {
        Some(0) => ConstraintChangeKind::Major,
        Some(1) => ConstraintChangeKind::Minor,
        Some(_) => ConstraintChangeKind::Patch,
        None => ConstraintChangeKind::Unchanged,
    }
}
