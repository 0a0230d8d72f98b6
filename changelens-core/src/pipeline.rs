//! One analysis run: diff + snapshot contents → [`ImpactReport`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use changelens_graphs::{FileDeclarations, LanguageRegistry, extract_file};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::ChangelensConfig;
use crate::detect::constant::{ConstantRules, detect_constant_changes};
use crate::detect::dependency::{DependencyChanges, compare_manifests};
use crate::detect::schema::compare_schemas;
use crate::detect::transfer::compare_transfers;
use crate::detect::{DetectionRules, detect_changes};
use crate::error::{AnalysisError, Result};
use crate::index::{CodeIndexBuilder, FrozenIndex, IndexRules, resolve_inherited_docs};
use crate::report::{ImpactReport, ReportParts, TouchedFile};
use crate::segment::{DiffUnit, FileType, segment};
use crate::types::{Diagnostic, Side, SkipReason, SkippedFile};

/// Input of one run: the diff plus full file contents of both snapshots,
/// keyed by repository-relative path.
///
/// Every file touched by the diff must be present on each side where it
/// exists. Further PHP files (typically interfaces) may be supplied as
/// context for documentation inheritance.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub diff: String,
    pub before: BTreeMap<PathBuf, String>,
    pub after: BTreeMap<PathBuf, String>,
}

impl ChangeSet {
    pub fn new(diff: impl Into<String>) -> Self {
        Self {
            diff: diff.into(),
            ..Self::default()
        }
    }

    pub fn with_before(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.before.insert(path.into(), content.into());
        self
    }

    pub fn with_after(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.after.insert(path.into(), content.into());
        self
    }

    fn snapshot(&self, side: Side) -> &BTreeMap<PathBuf, String> {
        match side {
            Side::Before => &self.before,
            Side::After => &self.after,
        }
    }
}

/// Run the whole analysis.
///
/// Phases are strictly ordered: segmentation, indexing of both snapshots,
/// doc resolution of both snapshots, then detection.
#[instrument(skip_all, name = "analyze", fields(before = changes.before.len(), after = changes.after.len()))]
pub fn analyze(changes: &ChangeSet, config: &ChangelensConfig) -> Result<ImpactReport> {
    config.validate()?;
    let rules = IndexRules::from_config(config)?;

    let segmentation = segment(&changes.diff, config.diff.context_lines);
    let units = segmentation.units;
    let mut skipped = segmentation.skipped;

    for unit in &units {
        require_content(changes, unit)?;
    }

    // ── Indexing ──
    let registry = LanguageRegistry::new();
    let before = extract_snapshot(&registry, &changes.before);
    let after = extract_snapshot(&registry, &changes.after);

    let mut failed: BTreeSet<PathBuf> = before
        .failed
        .iter()
        .chain(&after.failed)
        .cloned()
        .collect();
    for unit in &units {
        let Some(old) = &unit.old_path else { continue };
        if failed.contains(old) || failed.contains(&unit.path) {
            failed.insert(old.clone());
            failed.insert(unit.path.clone());
        }
    }
    for path in &failed {
        warn!(path = %path.display(), "PHP file could not be parsed, skipping on both sides");
        skipped.push(SkippedFile {
            path: path.clone(),
            reason: SkipReason::ParseFailed,
        });
    }

    // Touched files the segmenter rejected stay out of both indexes too.
    let mut excluded = failed;
    excluded.extend(skipped.iter().map(|s| s.path.clone()));

    let before_index = build_index(Side::Before, &rules, &before.files, &excluded);
    let after_index = build_index(Side::After, &rules, &after.files, &excluded);

    // ── Detection ──
    let structural = detect_changes(&before_index, &after_index, &DetectionRules::from_config(config));
    let constants =
        detect_constant_changes(&before_index, &after_index, &ConstantRules::from_config(config));

    let mut transfers = Vec::new();
    let mut schema = Vec::new();
    let mut dependencies = DependencyChanges::default();
    for unit in &units {
        let old = unit.before_path().and_then(|p| changes.before.get(p)).map(String::as_str);
        let new = unit.after_path().and_then(|p| changes.after.get(p)).map(String::as_str);
        match unit.file_type {
            FileType::Php => {}
            FileType::Transfer => transfers.extend(compare_transfers(&unit.path, old, new)),
            FileType::Schema => schema.extend(compare_schemas(&unit.path, old, new)),
            FileType::ComposerManifest => match compare_manifests(&unit.path, old, new) {
                Ok(found) => dependencies.extend(found),
                Err(reason) => skipped.push(SkippedFile {
                    path: unit.path.clone(),
                    reason,
                }),
            },
        }
    }

    let mut diagnostics: Vec<Diagnostic> = before_index.diagnostics().to_vec();
    diagnostics.extend_from_slice(after_index.diagnostics());

    let report = ImpactReport::assemble(
        ReportParts {
            changes: structural,
            transfers,
            constants,
            schema,
            dependencies,
            touched_files: units.iter().map(TouchedFile::from).collect(),
            skipped_files: skipped,
            diagnostics,
        },
        &config.risk,
    );

    info!(
        risk = %report.risk().level,
        bump = %report.version().bump,
        touched = report.summary().touched_files,
        skipped = report.summary().skipped_files,
        "Analysis complete"
    );
    Ok(report)
}

fn require_content(changes: &ChangeSet, unit: &DiffUnit) -> Result<()> {
    for (side, path) in [(Side::Before, unit.before_path()), (Side::After, unit.after_path())] {
        let Some(path) = path else { continue };
        if !changes.snapshot(side).contains_key(path) {
            return Err(AnalysisError::MissingContent {
                path: path.to_path_buf(),
                side,
            });
        }
    }
    Ok(())
}

#[derive(Debug)]
struct ExtractedSnapshot {
    files: Vec<FileDeclarations>,
    failed: Vec<PathBuf>,
}

/// Parse every PHP file of one snapshot in parallel. Results keep the
/// sorted path order of the input map.
fn extract_snapshot(
    registry: &LanguageRegistry,
    sources: &BTreeMap<PathBuf, String>,
) -> ExtractedSnapshot {
    let php: Vec<(&PathBuf, &String)> = sources
        .iter()
        .filter(|(path, _)| FileType::from_path(path) == Some(FileType::Php))
        .collect();

    let results: Vec<(&PathBuf, Option<FileDeclarations>)> = php
        .par_iter()
        .map(|(path, source)| {
            let decls = match extract_file(registry, path, source) {
                Ok(decls) if !decls.has_syntax_errors => Some(decls),
                Ok(_) => None,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Extraction failed");
                    None
                }
            };
            (*path, decls)
        })
        .collect();

    let mut snapshot = ExtractedSnapshot {
        files: Vec::with_capacity(results.len()),
        failed: Vec::new(),
    };
    for (path, decls) in results {
        match decls {
            Some(decls) => snapshot.files.push(decls),
            None => snapshot.failed.push(path.clone()),
        }
    }
    snapshot
}

fn build_index(
    side: Side,
    rules: &IndexRules,
    files: &[FileDeclarations],
    excluded: &BTreeSet<PathBuf>,
) -> FrozenIndex {
    let mut builder = CodeIndexBuilder::new(side, rules);
    for decls in files.iter().filter(|d| !excluded.contains(&d.file_path)) {
        builder.add_file(decls);
    }
    let mut index = builder.finish();
    resolve_inherited_docs(&mut index);
    index.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::risk::RiskLevel;
    use crate::types::{ConstantChangeKind, ConstraintChangeKind, DocSource, SchemaChangeKind};
    use crate::version::VersionBump;

    const DIFF: &str = "\
diff --git a/src/App/Foo.php b/src/App/Foo.php
--- a/src/App/Foo.php
+++ b/src/App/Foo.php
@@ -3,3 +3,5 @@
 class Foo implements FooInterface
 {
+    public function bar() {}
+
 }
";

    const BEFORE: &str = "<?php\nnamespace App;\nclass Foo implements FooInterface\n{\n}\n";
    const AFTER: &str =
        "<?php\nnamespace App;\nclass Foo implements FooInterface\n{\n    public function bar() {}\n\n}\n";
    const IFACE: &str = "<?php\nnamespace App;\ninterface FooInterface\n{\n    /**\n     * Returns a widget.\n     *\n     * @return string\n     */\n    public function bar();\n}\n";

    fn change_set() -> ChangeSet {
        ChangeSet::new(DIFF)
            .with_before("src/App/Foo.php", BEFORE)
            .with_after("src/App/Foo.php", AFTER)
            .with_before("src/App/FooInterface.php", IFACE)
            .with_after("src/App/FooInterface.php", IFACE)
    }

    #[test]
    fn new_method_inherits_interface_docs() {
        let report = analyze(&change_set(), &ChangelensConfig::default()).unwrap();

        let new = &report.changes().new_public_api;
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].key.as_str(), "\\App\\Foo::bar");
        assert_eq!(report.risk().level, RiskLevel::Low);
        assert_eq!(report.summary().touched_files, 1);
        assert!(report.skipped_files().is_empty());
    }

    #[test]
    fn doc_source_is_reported_through_the_index() {
        let changes = change_set();
        let config = ChangelensConfig::default();
        let rules = IndexRules::from_config(&config).unwrap();
        let registry = LanguageRegistry::new();
        let after = extract_snapshot(&registry, &changes.after);
        let index = build_index(Side::After, &rules, &after.files, &BTreeSet::new());
        let bar = index
            .method(&crate::types::CanonicalKey::new(&crate::types::Fqn::new("App\\Foo"), "bar"))
            .unwrap();
        assert_eq!(bar.doc, "Returns a widget.\n\n@return string");
        assert_eq!(
            bar.doc_source,
            DocSource::Inherited(crate::types::Fqn::new("App\\FooInterface"))
        );
    }

    #[test]
    fn missing_content_is_fatal() {
        let changes = ChangeSet::new(DIFF).with_after("src/App/Foo.php", AFTER);
        let err = analyze(&changes, &ChangelensConfig::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingContent);
        assert!(matches!(err, AnalysisError::MissingContent { side: Side::Before, .. }));
    }

    #[test]
    fn empty_diff_is_an_empty_report() {
        let report = analyze(&ChangeSet::default(), &ChangelensConfig::default()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.risk().level, RiskLevel::Low);
    }

    #[test]
    fn unparsable_file_is_skipped_on_both_sides() {
        let broken = "<?php\nnamespace App;\nclass Foo implements FooInterface\n{\n    public function bar( {\n}\n";
        let changes = ChangeSet::new(DIFF)
            .with_before("src/App/Foo.php", BEFORE)
            .with_after("src/App/Foo.php", broken);
        let report = analyze(&changes, &ChangelensConfig::default()).unwrap();
        assert_eq!(
            report.skipped_files(),
            &[SkippedFile {
                path: PathBuf::from("src/App/Foo.php"),
                reason: SkipReason::ParseFailed,
            }]
        );
        assert!(report.changes().removed_classes.is_empty());
        assert!(report.is_empty());
    }

    #[test]
    fn case_only_renames_report_nothing() {
        let diff = "\
diff --git a/src/App/CartFacade.php b/src/App/CartFacade.php
--- a/src/App/CartFacade.php
+++ b/src/App/CartFacade.php
@@ -3,3 +3,3 @@
 class CartFacade
 {
-    public function getItems() { return []; }
+    public function getitems() { return []; }
";
        let before = "<?php\nnamespace App;\nclass CartFacade\n{\n    public function getItems() { return []; }\n}\n";
        let after = "<?php\nnamespace App;\nclass CartFacade\n{\n    public function getitems() { return []; }\n}\n";
        let changes = ChangeSet::new(diff)
            .with_before("src/App/CartFacade.php", before)
            .with_after("src/App/CartFacade.php", after);
        let report = analyze(&changes, &ChangelensConfig::default()).unwrap();
        assert!(report.is_empty(), "{:?}", report.summary());
        assert_eq!(report.summary().touched_files, 1);
    }

    #[test]
    fn manifests_are_compared_per_file() {
        let diff = "\
diff --git a/composer.json b/composer.json
--- a/composer.json
+++ b/composer.json
@@ -1 +1 @@
-{\"require\": {\"php\": \">=8.1\", \"spryker/kernel\": \"^3.0.0\"}}
+{\"require\": {\"php\": \">=8.2\", \"spryker/kernel\": \"^4.0.0\"}}
diff --git a/src/Pyz/Zed/Cart/composer.json b/src/Pyz/Zed/Cart/composer.json
--- a/src/Pyz/Zed/Cart/composer.json
+++ b/src/Pyz/Zed/Cart/composer.json
@@ -1 +1 @@
-{\"require\": {\"spryker/kernel\": \"^3.0.0\"}}
+{\"require\": {\"spryker/kernel\": \"^3.1.0\"}}
";
        let changes = ChangeSet::new(diff)
            .with_before("composer.json", r#"{"require": {"php": ">=8.1", "spryker/kernel": "^3.0.0"}}"#)
            .with_after("composer.json", r#"{"require": {"php": ">=8.2", "spryker/kernel": "^4.0.0"}}"#)
            .with_before("src/Pyz/Zed/Cart/composer.json", r#"{"require": {"spryker/kernel": "^3.0.0"}}"#)
            .with_after("src/Pyz/Zed/Cart/composer.json", r#"{"require": {"spryker/kernel": "^3.1.0"}}"#);
        let report = analyze(&changes, &ChangelensConfig::default()).unwrap();

        let constraints: Vec<_> = report
            .constraint_changes()
            .iter()
            .map(|c| (c.file.clone(), c.package.as_str(), c.change))
            .collect();
        assert_eq!(
            constraints,
            vec![
                (PathBuf::from("composer.json"), "spryker/kernel", ConstraintChangeKind::Major),
                (
                    PathBuf::from("src/Pyz/Zed/Cart/composer.json"),
                    "spryker/kernel",
                    ConstraintChangeKind::Minor,
                ),
            ]
        );
        assert_eq!(report.php_version_changes().len(), 1);
        assert_eq!(report.php_version_changes()[0].file, PathBuf::from("composer.json"));
        assert_eq!(report.version().bump, VersionBump::Major);
        let categories: Vec<_> = report.version().reasons.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec!["Dependency Breaking Changes", "PHP Version", "Dependency Updates"]
        );
    }

    #[test]
    fn constants_and_schema_reach_the_report() {
        let diff = "\
diff --git a/src/App/CartConstants.php b/src/App/CartConstants.php
--- a/src/App/CartConstants.php
+++ b/src/App/CartConstants.php
@@ -4,3 +4,2 @@
 {
-    public const LEGACY = 1;
     public const LIMIT = 10;
diff --git a/src/Orm/spy_cart.schema.xml b/src/Orm/spy_cart.schema.xml
--- a/src/Orm/spy_cart.schema.xml
+++ b/src/Orm/spy_cart.schema.xml
@@ -2,2 +2,3 @@
     <column name=\"id_cart\" type=\"INTEGER\"/>
+    <column name=\"store\" type=\"VARCHAR\" size=\"64\"/>
 </table>
";
        let changes = ChangeSet::new(diff)
            .with_before(
                "src/App/CartConstants.php",
                "<?php\nnamespace App;\ninterface CartConstants\n{\n    public const LEGACY = 1;\n    public const LIMIT = 10;\n}\n",
            )
            .with_after(
                "src/App/CartConstants.php",
                "<?php\nnamespace App;\ninterface CartConstants\n{\n    public const LIMIT = 10;\n}\n",
            )
            .with_before(
                "src/Orm/spy_cart.schema.xml",
                "<table name=\"spy_cart\">\n    <column name=\"id_cart\" type=\"INTEGER\"/>\n</table>\n",
            )
            .with_after(
                "src/Orm/spy_cart.schema.xml",
                "<table name=\"spy_cart\">\n    <column name=\"id_cart\" type=\"INTEGER\"/>\n    <column name=\"store\" type=\"VARCHAR\" size=\"64\"/>\n</table>\n",
            );
        let report = analyze(&changes, &ChangelensConfig::default()).unwrap();

        assert_eq!(report.constant_changes().len(), 1);
        assert_eq!(report.constant_changes()[0].name, "LEGACY");
        assert_eq!(report.constant_changes()[0].change, ConstantChangeKind::Removed);
        assert!(report.constant_changes()[0].config_or_constants);

        assert_eq!(report.schema_changes().len(), 1);
        assert_eq!(report.schema_changes()[0].element.as_deref(), Some("store"));
        assert_eq!(report.schema_changes()[0].change, SchemaChangeKind::ColumnAdded);

        assert_eq!(report.summary().constant_changes, 1);
        assert_eq!(report.summary().schema_changes, 1);
        assert_eq!(report.version().bump, VersionBump::Major);
        let categories: Vec<_> = report.version().reasons.iter().map(|r| r.category).collect();
        assert_eq!(categories, vec!["Constant Breaking Changes", "Database Enhancements"]);
    }

    #[test]
    fn identical_runs_serialize_identically() {
        let config = ChangelensConfig::default();
        let first = serde_json::to_string(&analyze(&change_set(), &config).unwrap()).unwrap();
        let second = serde_json::to_string(&analyze(&change_set(), &config).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
