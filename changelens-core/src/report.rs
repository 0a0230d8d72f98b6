//! The immutable result of one analysis run.

use std::path::PathBuf;

use serde::Serialize;

use crate::detect::StructuralChanges;
use crate::detect::dependency::DependencyChanges;
use crate::risk::{RiskAssessment, RiskInputs, assess};
use crate::config::RiskSection;
use crate::segment::{DiffUnit, FileStatus, FileType};
use crate::types::{
    ConstantChange, ConstraintChange, Diagnostic, PhpVersionChange, SchemaChange, SkippedFile,
    TransferChange, VersionChange,
};
use crate::version::{VersionRecommendation, recommend};

/// A file the diff touched, with its line counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TouchedFile {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<PathBuf>,
    pub status: FileStatus,
    pub file_type: FileType,
    pub added_lines: usize,
    pub removed_lines: usize,
}

impl From<&DiffUnit> for TouchedFile {
    fn from(unit: &DiffUnit) -> Self {
        Self {
            path: unit.path.clone(),
            old_path: unit.old_path.clone(),
            status: unit.status,
            file_type: unit.file_type,
            added_lines: unit.added_lines(),
            removed_lines: unit.removed_lines(),
        }
    }
}

/// Size of every category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub modified_public_api: usize,
    pub new_public_api: usize,
    pub modified_config_methods: usize,
    pub new_config_methods: usize,
    pub modified_communication_layer: usize,
    pub internal_with_impact: usize,
    pub internal_no_impact: usize,
    pub new_internal: usize,
    pub removed_methods: usize,
    pub new_classes: usize,
    pub removed_classes: usize,
    pub deprecated_classes: usize,
    pub transfer_changes: usize,
    pub constant_changes: usize,
    pub schema_changes: usize,
    pub dependency_changes: usize,
    pub php_version_changes: usize,
    pub touched_files: usize,
    pub skipped_files: usize,
}

/// Everything the renderers need. Built once by [`ImpactReport::assemble`];
/// only shared access is exposed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    summary: ReportSummary,
    risk: RiskAssessment,
    version: VersionRecommendation,
    #[serde(flatten)]
    changes: StructuralChanges,
    transfer_changes: Vec<TransferChange>,
    constant_changes: Vec<ConstantChange>,
    schema_changes: Vec<SchemaChange>,
    dependency_changes: Vec<VersionChange>,
    constraint_changes: Vec<ConstraintChange>,
    php_version_changes: Vec<PhpVersionChange>,
    touched_files: Vec<TouchedFile>,
    skipped_files: Vec<SkippedFile>,
    diagnostics: Vec<Diagnostic>,
}

/// Inputs of [`ImpactReport::assemble`].
#[derive(Debug, Default)]
pub struct ReportParts {
    pub changes: StructuralChanges,
    pub transfers: Vec<TransferChange>,
    pub constants: Vec<ConstantChange>,
    pub schema: Vec<SchemaChange>,
    pub dependencies: DependencyChanges,
    pub touched_files: Vec<TouchedFile>,
    pub skipped_files: Vec<SkippedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImpactReport {
    /// Score the collected changes and seal them into a report.
    pub fn assemble(parts: ReportParts, thresholds: &RiskSection) -> Self {
        let ReportParts {
            changes,
            mut transfers,
            constants,
            mut schema,
            mut dependencies,
            mut touched_files,
            mut skipped_files,
            mut diagnostics,
        } = parts;

        crate::detect::transfer::sort_transfer_changes(&mut transfers);
        schema.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.table.cmp(&b.table))
                .then_with(|| a.element.cmp(&b.element))
                .then_with(|| a.change.cmp(&b.change))
        });
        dependencies.sort();
        touched_files.sort_by(|a, b| a.path.cmp(&b.path));
        skipped_files.sort();
        skipped_files.dedup();
        diagnostics.sort();

        let risk = assess(
            RiskInputs {
                modified_config_methods: changes.modified_config_methods.len(),
                new_public_api: changes.new_public_api.len(),
                internal_with_impact: changes.internal_with_impact.len(),
            },
            thresholds,
        );
        let version = recommend(&changes, &transfers, &constants, &schema, &dependencies);

        let DependencyChanges {
            versions,
            constraints,
            php,
        } = dependencies;

        let summary = ReportSummary {
            modified_public_api: changes.modified_public_api.len(),
            new_public_api: changes.new_public_api.len(),
            modified_config_methods: changes.modified_config_methods.len(),
            new_config_methods: changes.new_config_methods.len(),
            modified_communication_layer: changes.modified_communication_layer.len(),
            internal_with_impact: changes.internal_with_impact.len(),
            internal_no_impact: changes.internal_no_impact.len(),
            new_internal: changes.new_internal.len(),
            removed_methods: changes.removed_methods.len(),
            new_classes: changes.new_classes.len(),
            removed_classes: changes.removed_classes.len(),
            deprecated_classes: changes.deprecated_classes.len(),
            transfer_changes: transfers.len(),
            constant_changes: constants.len(),
            schema_changes: schema.len(),
            dependency_changes: versions.len(),
            php_version_changes: php.len(),
            touched_files: touched_files.len(),
            skipped_files: skipped_files.len(),
        };

        Self {
            summary,
            risk,
            version,
            changes,
            transfer_changes: transfers,
            constant_changes: constants,
            schema_changes: schema,
            dependency_changes: versions,
            constraint_changes: constraints,
            php_version_changes: php,
            touched_files,
            skipped_files,
            diagnostics,
        }
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn risk(&self) -> &RiskAssessment {
        &self.risk
    }

    pub fn version(&self) -> &VersionRecommendation {
        &self.version
    }

    pub fn changes(&self) -> &StructuralChanges {
        &self.changes
    }

    pub fn transfer_changes(&self) -> &[TransferChange] {
        &self.transfer_changes
    }

    pub fn constant_changes(&self) -> &[ConstantChange] {
        &self.constant_changes
    }

    pub fn schema_changes(&self) -> &[SchemaChange] {
        &self.schema_changes
    }

    pub fn dependency_changes(&self) -> &[VersionChange] {
        &self.dependency_changes
    }

    pub fn constraint_changes(&self) -> &[ConstraintChange] {
        &self.constraint_changes
    }

    pub fn php_version_changes(&self) -> &[PhpVersionChange] {
        &self.php_version_changes
    }

    pub fn touched_files(&self) -> &[TouchedFile] {
        &self.touched_files
    }

    pub fn skipped_files(&self) -> &[SkippedFile] {
        &self.skipped_files
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when no category holds a record.
    pub fn is_empty(&self) -> bool {
        let s = &self.summary;
        s.modified_public_api
            + s.new_public_api
            + s.modified_config_methods
            + s.new_config_methods
            + s.modified_communication_layer
            + s.internal_with_impact
            + s.internal_no_impact
            + s.new_internal
            + s.removed_methods
            + s.new_classes
            + s.removed_classes
            + s.deprecated_classes
            + s.transfer_changes
            + s.constant_changes
            + s.schema_changes
            + s.dependency_changes
            + s.php_version_changes
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLevel;
    use crate::types::SkipReason;
    use crate::version::VersionBump;

    #[test]
    fn empty_parts_give_low_risk() {
        let report = ImpactReport::assemble(ReportParts::default(), &RiskSection::default());
        assert!(report.is_empty());
        assert_eq!(report.risk().level, RiskLevel::Low);
        assert_eq!(report.version().bump, VersionBump::Patch);
        assert_eq!(report.summary(), &ReportSummary::default());
    }

    #[test]
    fn skipped_files_are_sorted_and_unique() {
        let skipped = |path: &str, reason| SkippedFile {
            path: PathBuf::from(path),
            reason,
        };
        let parts = ReportParts {
            skipped_files: vec![
                skipped("src/b.php", SkipReason::ParseFailed),
                skipped("README.md", SkipReason::UnsupportedFileType),
                skipped("src/b.php", SkipReason::ParseFailed),
            ],
            ..ReportParts::default()
        };
        let report = ImpactReport::assemble(parts, &RiskSection::default());
        let paths: Vec<_> = report.skipped_files().iter().map(|s| s.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("README.md"), PathBuf::from("src/b.php")]);
        assert_eq!(report.summary().skipped_files, 2);
        assert!(report.is_empty());
    }

    #[test]
    fn manifests_stay_apart_in_the_report() {
        let change = |file: &str, package: &str| VersionChange {
            file: PathBuf::from(file),
            package: package.to_string(),
            old: Some("^1.0.0".to_string()),
            new: Some("^2.0.0".to_string()),
            change: crate::types::VersionChangeKind::Upgraded,
        };
        let parts = ReportParts {
            dependencies: DependencyChanges {
                versions: vec![
                    change("src/Pyz/Zed/Cart/composer.json", "spryker/kernel"),
                    change("composer.json", "spryker/kernel"),
                    change("composer.json", "spryker/cart"),
                ],
                ..DependencyChanges::default()
            },
            ..ReportParts::default()
        };
        let report = ImpactReport::assemble(parts, &RiskSection::default());
        let keys: Vec<_> = report
            .dependency_changes()
            .iter()
            .map(|v| (v.file.to_str().unwrap(), v.package.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("composer.json", "spryker/cart"),
                ("composer.json", "spryker/kernel"),
                ("src/Pyz/Zed/Cart/composer.json", "spryker/kernel"),
            ]
        );
        assert_eq!(report.summary().dependency_changes, 3);
        assert!(!report.is_empty());
    }

    #[test]
    fn json_flattens_categories() {
        let report = ImpactReport::assemble(ReportParts::default(), &RiskSection::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["modified_public_api"].as_array().unwrap().is_empty());
        assert!(json["modified_communication_layer"].as_array().unwrap().is_empty());
        assert!(json["schema_changes"].as_array().unwrap().is_empty());
        assert_eq!(json["risk"]["level"], "LOW");
        assert_eq!(json["version"]["bump"], "PATCH");
        assert_eq!(json["summary"]["touched_files"], 0);
    }
}
