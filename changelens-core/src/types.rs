use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use changelens_graphs::{ParamDecl as Param, TypeKind, Visibility};

// ── Typed name wrappers ────────────────────────────────────────────

/// PHP class and method names are case-insensitive. A typed name keeps the
/// declared spelling for display and compares, hashes and orders by its
/// ASCII-lowercased form.
macro_rules! typed_name {
    ($name:ident) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            display: String,
            canonical: String,
        }

        impl $name {
            fn from_display(display: String) -> Self {
                let canonical = display.to_ascii_lowercase();
                Self { display, canonical }
            }

            /// The name as declared.
            pub fn as_str(&self) -> &str {
                &self.display
            }

            /// The lowercased identity used for comparison.
            pub fn canonical(&self) -> &str {
                &self.canonical
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.canonical == other.canonical
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.canonical.hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.canonical.cmp(&other.canonical)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.display)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.display
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.display)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from_display)
            }
        }
    };
}

typed_name!(Fqn);
typed_name!(CanonicalKey);

impl Fqn {
    /// Normalize a resolved name to exactly one leading separator.
    pub fn new(name: &str) -> Self {
        Self::from_display(changelens_graphs::names::qualify(name))
    }

    /// Class name without namespace (`\A\B\FooFacade` → `FooFacade`).
    pub fn simple_name(&self) -> &str {
        changelens_graphs::names::last_segment(&self.display)
    }

    /// Whether the simple name ends with `suffix`, ignoring ASCII case.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        ends_with_ignore_case(self.simple_name(), suffix)
    }
}

pub(crate) fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

impl CanonicalKey {
    pub const SEPARATOR: &'static str = "::";

    pub fn new(owner: &Fqn, method: &str) -> Self {
        Self::from_display(format!("{owner}{}{method}", Self::SEPARATOR))
    }

    pub fn owner(&self) -> &str {
        self.display
            .rsplit_once(Self::SEPARATOR)
            .map_or(self.display.as_str(), |(owner, _)| owner)
    }

    pub fn method(&self) -> &str {
        self.display
            .rsplit_once(Self::SEPARATOR)
            .map_or("", |(_, method)| method)
    }
}

// ── Snapshot side ──────────────────────────────────────────────────

/// Which of the two snapshots a piece of data belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Index metadata ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMetadata {
    pub fqn: Fqn,
    pub kind: TypeKind,
    pub file: PathBuf,
    /// Implemented interfaces (for interfaces: extended ones), in declaration order.
    pub interfaces: Vec<Fqn>,
    pub factory: Option<Fqn>,
    pub summary: String,
    pub deprecated: bool,
    /// Class constants in declaration order.
    pub constants: Vec<ConstantMetadata>,
    /// Property name (without `$`) → resolved class type.
    pub properties: BTreeMap<String, Fqn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantMetadata {
    pub name: String,
    pub visibility: Visibility,
    /// Initializer with whitespace collapsed.
    pub value: String,
    pub line: usize,
}

/// Where a method's documentation came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "source", content = "from", rename_all = "lowercase")]
pub enum DocSource {
    Declared,
    Inherited(Fqn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodMetadata {
    pub key: CanonicalKey,
    pub owner: Fqn,
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub params: Vec<Param>,
    /// Native return type (`: ?QuoteTransfer`).
    pub return_type: Option<String>,
    /// Type expression of the `@return` annotation.
    pub return_annotation: Option<String>,
    pub doc: String,
    pub doc_source: DocSource,
    pub body_hash: Option<u64>,
    pub is_config_method: bool,
    pub is_factory_method: bool,
    pub is_api: bool,
    pub is_deprecated: bool,
    pub location: SourceLocation,
    /// Statically resolved callees. Targets outside the snapshot are kept.
    pub calls: Vec<CanonicalKey>,
}

// ── Change records ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    New,
    Modified,
    Removed,
}

/// What part of a method that exists on both sides changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalChange {
    /// Visibility, static-ness, parameters or declared return type.
    Signature,
    /// Doc text or body only.
    Implementation,
}

/// One observable signature difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "aspect", rename_all = "snake_case")]
pub enum SignatureDelta {
    Visibility { from: Visibility, to: Visibility },
    Static { from: bool, to: bool },
    Parameters { from: String, to: String },
    ReturnType { from: Option<String>, to: Option<String> },
    ReturnAnnotation { from: Option<String>, to: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodChange {
    pub key: CanonicalKey,
    pub owner: Fqn,
    pub name: String,
    pub visibility: Visibility,
    pub change: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal: Option<InternalChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signature_deltas: Vec<SignatureDelta>,
    pub public_api: bool,
    pub is_api: bool,
    pub is_deprecated: bool,
    pub is_config_method: bool,
    pub is_factory_method: bool,
    pub file: PathBuf,
    /// Public entrypoints that reach this method through the after snapshot's
    /// call graph, nearest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub impacted_entrypoints: Vec<ImpactedEntrypoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactedEntrypoint {
    pub key: CanonicalKey,
    /// Call edges between the entrypoint and the changed method.
    pub hops: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassChangeKind {
    New,
    Removed,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassChange {
    pub fqn: Fqn,
    pub kind: TypeKind,
    pub change: ClassChangeKind,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferChangeKind {
    TransferAdded,
    TransferRemoved,
    StrictAdded,
    StrictRemoved,
    PropertyAdded,
    PropertyRemoved,
    PropertyModified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferChange {
    pub owner: Fqn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub change: TransferChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_type: Option<String>,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantChange {
    pub owner: Fqn,
    pub name: String,
    pub visibility: Visibility,
    pub change: ConstantChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// Owned by a configuration or constants holder.
    pub config_or_constants: bool,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaChangeKind {
    TableAdded,
    TableRemoved,
    ColumnAdded,
    ColumnRemoved,
    ColumnModified,
    IndexAdded,
    IndexRemoved,
    IndexModified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaChange {
    pub table: String,
    /// Column or index name; absent for table-level changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    pub change: SchemaChangeKind,
    /// Compact rendering of the element's attributes on each side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionChangeKind {
    Added,
    Removed,
    Upgraded,
    Downgraded,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    /// Manifest the requirement belongs to.
    pub file: PathBuf,
    pub package: String,
    pub old: Option<String>,
    pub new: Option<String>,
    pub change: VersionChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintChangeKind {
    Major,
    Minor,
    Patch,
    Relaxed,
    Tightened,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintChange {
    pub file: PathBuf,
    pub package: String,
    pub old: Option<String>,
    pub new: Option<String>,
    pub change: ConstraintChangeKind,
}

/// A change of the `php` platform requirement of one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhpVersionChange {
    pub file: PathBuf,
    pub old: Option<String>,
    pub new: Option<String>,
    pub change: VersionChangeKind,
}

impl PhpVersionChange {
    /// Whether the change forces a major release.
    pub fn requires_major(&self) -> bool {
        matches!(
            self.change,
            VersionChangeKind::Added | VersionChangeKind::Removed | VersionChangeKind::Upgraded
        )
    }
}

// ── Local failures ─────────────────────────────────────────────────

/// Why a touched file did not contribute to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NameExtractionFailed,
    ParseFailed,
    UnsupportedFileType,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameExtractionFailed => "name_extraction_failed",
            Self::ParseFailed => "parse_failed",
            Self::UnsupportedFileType => "unsupported_file_type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// A second declaration with the same FQN or canonical key replaced the first.
    DuplicateDeclaration,
    /// A class, interface or method node had no usable name.
    UnnamedDeclaration,
    /// An interface edge pointed at a type not present in the snapshot.
    DanglingInterface,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub side: Side,
    pub subject: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqn_normalizes_leading_separator() {
        assert_eq!(Fqn::new("Pyz\\Zed\\Cart\\CartConfig").as_str(), "\\Pyz\\Zed\\Cart\\CartConfig");
        assert_eq!(Fqn::new("\\\\Foo").as_str(), "\\Foo");
        assert_eq!(Fqn::new("\\Pyz\\Zed\\Cart\\CartConfig").simple_name(), "CartConfig");
    }

    #[test]
    fn canonical_key_parts() {
        let key = CanonicalKey::new(&Fqn::new("Pyz\\Cart\\CartFacade"), "addItem");
        assert_eq!(key.as_str(), "\\Pyz\\Cart\\CartFacade::addItem");
        assert_eq!(key.owner(), "\\Pyz\\Cart\\CartFacade");
        assert_eq!(key.method(), "addItem");
    }

    #[test]
    fn names_compare_case_insensitively() {
        let declared = Fqn::new("App\\FooInterface");
        let written = Fqn::new("app\\fooInterface");
        assert_eq!(declared, written);
        assert_eq!(written.as_str(), "\\app\\fooInterface");
        assert_eq!(declared.canonical(), "\\app\\foointerface");

        let set: std::collections::HashSet<Fqn> = [declared.clone()].into();
        assert!(set.contains(&written));

        let a = CanonicalKey::new(&declared, "getItems");
        let b = CanonicalKey::new(&written, "GETITEMS");
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
        assert_eq!(b.method(), "GETITEMS");
    }

    #[test]
    fn names_serialize_as_declared() {
        let fqn = Fqn::new("Pyz\\Zed\\CartFacade");
        let json = serde_json::to_value(&fqn).unwrap();
        assert_eq!(json, "\\Pyz\\Zed\\CartFacade");
        let back: Fqn = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_str(), fqn.as_str());
        assert_eq!(back.canonical(), "\\pyz\\zed\\cartfacade");
    }

    #[test]
    fn suffix_test_ignores_case() {
        let fqn = Fqn::new("Pyz\\Zed\\Cart\\cartfacade");
        assert!(fqn.has_suffix("Facade"));
        assert!(!fqn.has_suffix("Client"));
        assert!(!Fqn::new("Ade").has_suffix("Facade"));
    }

    #[test]
    fn doc_source_serializes_tagged() {
        let json = serde_json::to_value(DocSource::Inherited(Fqn::new("A\\FooInterface"))).unwrap();
        assert_eq!(json["source"], "inherited");
        assert_eq!(json["from"], "\\A\\FooInterface");
        let json = serde_json::to_value(DocSource::Declared).unwrap();
        assert_eq!(json["source"], "declared");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_segment() -> impl Strategy<Value = String> {
            "[A-Z][A-Za-z0-9_]{0,12}"
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn fqn_normalization_is_idempotent(parts in prop::collection::vec(arb_segment(), 1..5)) {
                let name = parts.join("\\");
                let once = Fqn::new(&name);
                let twice = Fqn::new(once.as_str());
                prop_assert_eq!(&once, &twice);
                prop_assert_eq!(once.simple_name(), parts.last().unwrap().as_str());
            }

            #[test]
            fn canonical_key_splits_back(parts in prop::collection::vec(arb_segment(), 1..5), method in "[a-z][A-Za-z0-9_]{0,12}") {
                let owner = Fqn::new(&parts.join("\\"));
                let key = CanonicalKey::new(&owner, &method);
                prop_assert_eq!(key.owner(), owner.as_str());
                prop_assert_eq!(key.method(), method.as_str());
            }
        }
    }
}
