//! Semantic version bump recommendation.

use serde::Serialize;

use crate::detect::StructuralChanges;
use crate::detect::dependency::DependencyChanges;
use crate::types::{
    ConstantChange, ConstantChangeKind, ConstraintChangeKind, InternalChange, SchemaChange,
    SchemaChangeKind, TransferChange, TransferChangeKind, VersionChangeKind, Visibility,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionBump {
    Patch,
    Minor,
    Major,
}

impl VersionBump {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patch => "PATCH",
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
        }
    }
}

impl std::fmt::Display for VersionBump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BumpReason {
    pub bump: VersionBump,
    pub category: &'static str,
    pub description: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecommendation {
    pub bump: VersionBump,
    pub confidence: Confidence,
    pub requires_manual_review: bool,
    pub reasons: Vec<BumpReason>,
    pub notes: Vec<String>,
}

#[derive(Debug, Default)]
struct Reasons(Vec<BumpReason>);

impl Reasons {
    fn push(&mut self, bump: VersionBump, category: &'static str, description: &'static str, count: usize) {
        if count > 0 {
            self.0.push(BumpReason {
                bump,
                category,
                description,
                count,
            });
        }
    }
}

/// Recommend a version bump from the detected changes.
///
/// Every reason names its category once; the bump is the highest reason.
/// With no reason at all the recommendation is a low-confidence PATCH.
pub fn recommend(
    changes: &StructuralChanges,
    transfers: &[TransferChange],
    constants: &[ConstantChange],
    schema: &[SchemaChange],
    dependencies: &DependencyChanges,
) -> VersionRecommendation {
    let mut reasons = Reasons::default();
    let mut notes = Vec::new();
    let mut requires_manual_review = false;

    let transfer_count = |kinds: &[TransferChangeKind]| {
        transfers.iter().filter(|t| kinds.contains(&t.change)).count()
    };
    let schema_count = |kinds: &[SchemaChangeKind]| {
        schema.iter().filter(|s| kinds.contains(&s.change)).count()
    };

    // ── Breaking ──
    reasons.push(
        VersionBump::Major,
        "Modified Public API",
        "Public API method signatures changed",
        changes.modified_public_api.len(),
    );
    reasons.push(
        VersionBump::Major,
        "Removed Public API",
        "Public API methods removed",
        changes.removed_methods.iter().filter(|m| m.public_api).count(),
    );
    reasons.push(
        VersionBump::Major,
        "Removed Classes",
        "Classes or interfaces removed",
        changes.removed_classes.len(),
    );
    reasons.push(
        VersionBump::Major,
        "Transfer Breaking Changes",
        "Transfer objects or properties removed, retyped or made strict",
        transfer_count(&[
            TransferChangeKind::TransferRemoved,
            TransferChangeKind::PropertyRemoved,
            TransferChangeKind::PropertyModified,
            TransferChangeKind::StrictAdded,
        ]),
    );
    reasons.push(
        VersionBump::Major,
        "Database Breaking Changes",
        "Database tables or columns removed or altered",
        schema_count(&[
            SchemaChangeKind::TableRemoved,
            SchemaChangeKind::ColumnRemoved,
            SchemaChangeKind::ColumnModified,
        ]),
    );
    reasons.push(
        VersionBump::Major,
        "Constant Breaking Changes",
        "Non-private constants removed",
        constants
            .iter()
            .filter(|c| c.change == ConstantChangeKind::Removed && c.visibility != Visibility::Private)
            .count(),
    );
    reasons.push(
        VersionBump::Major,
        "Configuration Breaking Changes",
        "Configuration method signatures changed",
        changes
            .modified_config_methods
            .iter()
            .filter(|m| m.internal == Some(InternalChange::Signature))
            .count(),
    );
    reasons.push(
        VersionBump::Major,
        "Dependency Breaking Changes",
        "Dependency constraints raised a major version or dropped alternatives",
        dependencies
            .constraints
            .iter()
            .filter(|c| matches!(c.change, ConstraintChangeKind::Major | ConstraintChangeKind::Tightened))
            .count(),
    );
    reasons.push(
        VersionBump::Major,
        "Removed Dependencies",
        "Required packages removed",
        dependencies
            .versions
            .iter()
            .filter(|v| v.change == VersionChangeKind::Removed)
            .count(),
    );
    reasons.push(
        VersionBump::Major,
        "PHP Version",
        "PHP requirement raised, added or removed",
        dependencies.php.iter().filter(|p| p.requires_major()).count(),
    );

    // ── Features ──
    reasons.push(
        VersionBump::Minor,
        "New Public API",
        "New public API methods added",
        changes.new_public_api.len(),
    );
    reasons.push(
        VersionBump::Minor,
        "New Configuration",
        "New configuration methods added",
        changes.new_config_methods.len(),
    );
    reasons.push(
        VersionBump::Minor,
        "New Classes",
        "New classes or interfaces added",
        changes.new_classes.len(),
    );
    reasons.push(
        VersionBump::Minor,
        "New Plugin Methods",
        "New methods added to plugins",
        changes
            .new_internal
            .iter()
            .filter(|m| m.owner.as_str().contains("Plugin"))
            .count(),
    );
    reasons.push(
        VersionBump::Minor,
        "Transfer Enhancements",
        "New transfer objects or properties added, or strictness relaxed",
        transfer_count(&[
            TransferChangeKind::TransferAdded,
            TransferChangeKind::PropertyAdded,
            TransferChangeKind::StrictRemoved,
        ]),
    );
    reasons.push(
        VersionBump::Minor,
        "Database Enhancements",
        "Database tables, columns or indexes added, or indexes changed",
        schema_count(&[
            SchemaChangeKind::TableAdded,
            SchemaChangeKind::ColumnAdded,
            SchemaChangeKind::IndexAdded,
            SchemaChangeKind::IndexRemoved,
            SchemaChangeKind::IndexModified,
        ]),
    );
    if !changes.internal_with_impact.is_empty() {
        reasons.push(
            VersionBump::Minor,
            "Internal Changes with Impact",
            "Internal changes reachable from public entrypoints",
            changes.internal_with_impact.len(),
        );
        requires_manual_review = true;
        notes.push(
            "Internal changes are reachable from public entrypoints; review for breaking changes"
                .to_string(),
        );
    }
    if !changes.modified_communication_layer.is_empty() {
        requires_manual_review = true;
        notes.push(
            "Controllers, forms or tables changed; review the user-facing behaviour".to_string(),
        );
    }

    // ── Safe ──
    reasons.push(
        VersionBump::Patch,
        "Internal Improvements",
        "Implementation changes with no public API impact",
        changes.internal_no_impact.len(),
    );
    reasons.push(
        VersionBump::Patch,
        "Configuration Values",
        "Configuration method bodies changed",
        changes
            .modified_config_methods
            .iter()
            .filter(|m| m.internal == Some(InternalChange::Implementation))
            .count(),
    );
    reasons.push(
        VersionBump::Patch,
        "Communication Layer",
        "Controller, form or table methods changed",
        changes.modified_communication_layer.len(),
    );
    reasons.push(
        VersionBump::Patch,
        "Constant Values",
        "Constants added or their values changed",
        constants
            .iter()
            .filter(|c| c.change != ConstantChangeKind::Removed)
            .count(),
    );
    reasons.push(
        VersionBump::Patch,
        "Dependency Updates",
        "Required package versions changed",
        dependencies.versions.len(),
    );

    if !dependencies.versions.is_empty() {
        notes.push(format!(
            "{} dependency change(s) detected; check downstream compatibility",
            dependencies.versions.len()
        ));
    }

    let reasons = reasons.0;
    let bump = reasons
        .iter()
        .map(|r| r.bump)
        .max()
        .unwrap_or(VersionBump::Patch);
    let confidence = if reasons.is_empty() {
        notes.push("No significant changes detected; verify this is intentional".to_string());
        Confidence::Low
    } else if requires_manual_review {
        Confidence::Medium
    } else {
        Confidence::High
    };

    VersionRecommendation {
        bump,
        confidence,
        requires_manual_review,
        reasons,
        notes,
    }
}
