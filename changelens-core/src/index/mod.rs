//! Snapshot indexing: per-file declarations → one queryable [`CodeIndex`].
//!
//! Lifecycle: [`CodeIndexBuilder`] accumulates files, [`CodeIndexBuilder::finish`]
//! yields a [`CodeIndex`] that only the doc resolver mutates, and
//! [`CodeIndex::freeze`] produces the read-only [`FrozenIndex`] the change
//! detector consumes.

pub mod calls;
mod class;
mod method;
pub mod resolve;

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::ops::Deref;
use std::path::Path;

use changelens_graphs::docblock::MethodAnnotationMatcher;
use changelens_graphs::{FileDeclarations, TypeKind};
use tracing::debug;

use crate::config::ChangelensConfig;
use crate::error::Result;
use crate::types::{
    CanonicalKey, ClassMetadata, Diagnostic, DiagnosticCode, Fqn, MethodMetadata, Side,
};

pub use calls::CallGraph;
pub use resolve::resolve_inherited_docs;

/// Naming conventions the indexer applies, compiled once per run.
#[derive(Debug, Clone)]
pub struct IndexRules {
    pub factory_class_suffix: String,
    pub factory_method_prefixes: Vec<String>,
    pub factory_accessors: Vec<String>,
    pub factory_annotation: MethodAnnotationMatcher,
    pub config_class_suffixes: Vec<String>,
    pub config_annotation_tags: Vec<String>,
}

impl IndexRules {
    pub fn from_config(config: &ChangelensConfig) -> Result<Self> {
        Ok(Self {
            factory_class_suffix: config.factory.class_suffix.clone(),
            factory_method_prefixes: config.factory.method_prefixes.clone(),
            factory_accessors: config.factory.accessor_names.clone(),
            factory_annotation: MethodAnnotationMatcher::new(&config.factory.accessor_names)?,
            config_class_suffixes: config.config_methods.class_suffixes.clone(),
            config_annotation_tags: config
                .config_methods
                .annotation_tags
                .iter()
                .map(|t| t.trim_start_matches('@').to_string())
                .collect(),
        })
    }

    pub fn is_factory_accessor(&self, name: &str) -> bool {
        self.factory_accessors
            .iter()
            .any(|a| a.eq_ignore_ascii_case(name))
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// `$this->accessor()->factoryMethod()->method()` waiting for the factory's
/// product type, which may be declared in a later file.
#[derive(Debug)]
struct ProductCall {
    caller: CanonicalKey,
    factory_method: CanonicalKey,
    method: String,
}

#[derive(Debug)]
pub struct CodeIndexBuilder<'r> {
    side: Side,
    rules: &'r IndexRules,
    index: CodeIndex,
    product_calls: Vec<ProductCall>,
}

impl<'r> CodeIndexBuilder<'r> {
    pub fn new(side: Side, rules: &'r IndexRules) -> Self {
        Self {
            side,
            rules,
            index: CodeIndex::empty(side),
            product_calls: Vec::new(),
        }
    }

    /// Index every declaration of one file. Files should be added in a
    /// stable order; later duplicates replace earlier ones.
    pub fn add_file(&mut self, decls: &FileDeclarations) {
        for unnamed in &decls.unnamed {
            self.diagnose(
                DiagnosticCode::UnnamedDeclaration,
                format!("{}:{}", decls.file_path.display(), unnamed.span.start_line()),
                format!("{} without a name", unnamed.node_kind),
            );
        }
        for decl in &decls.types {
            let class = class::index_class(self, decl, &decls.file_path);
            for method in &decl.methods {
                method::index_method(self, &class, decl, method, &decls.file_path);
            }
        }
    }

    /// Resolve factory-product calls now that every factory is known.
    pub fn finish(mut self) -> CodeIndex {
        for call in std::mem::take(&mut self.product_calls) {
            let Some(product) = self.index.factory_products.get(&call.factory_method) else {
                continue;
            };
            let callee = CanonicalKey::new(product, &call.method);
            if let Some(caller) = self.index.methods.get_mut(&call.caller) {
                if !caller.calls.contains(&callee) {
                    caller.calls.push(callee);
                }
            }
        }
        debug!(
            side = %self.side,
            classes = self.index.classes.len(),
            methods = self.index.methods.len(),
            factory_products = self.index.factory_products.len(),
            "Snapshot indexed"
        );
        self.index
    }

    fn diagnose(&mut self, code: DiagnosticCode, subject: String, message: String) {
        self.index.diagnostics.push(Diagnostic {
            code,
            side: self.side,
            subject,
            message,
        });
    }

    fn insert_class(&mut self, class: ClassMetadata, file: &Path) {
        let fqn = class.fqn.clone();
        if let Some(previous) = self.index.classes.insert(fqn.clone(), class) {
            // The replaced declaration's members go with it.
            let owned = |key: &CanonicalKey| Fqn::new(key.owner()) == fqn;
            self.index.methods.retain(|_, m| m.owner != fqn);
            self.index.factory_edges.remove(&fqn);
            self.index.factory_products.retain(|key, _| !owned(key));
            self.product_calls.retain(|call| !owned(&call.caller));
            self.diagnose(
                DiagnosticCode::DuplicateDeclaration,
                fqn.to_string(),
                format!(
                    "declared in {} and {}; keeping the latter",
                    previous.file.display(),
                    file.display()
                ),
            );
        }
    }

    fn insert_method(&mut self, method: MethodMetadata) {
        let key = method.key.clone();
        if self.index.methods.insert(key.clone(), method).is_some() {
            self.product_calls.retain(|call| call.caller != key);
            self.diagnose(
                DiagnosticCode::DuplicateDeclaration,
                key.to_string(),
                "method declared twice; keeping the latter".to_string(),
            );
        }
    }
}

// ── Index ──────────────────────────────────────────────────────────

/// Classes, methods and their edges for one snapshot.
#[derive(Debug, Clone)]
pub struct CodeIndex {
    side: Side,
    classes: BTreeMap<Fqn, ClassMetadata>,
    methods: BTreeMap<CanonicalKey, MethodMetadata>,
    factory_edges: BTreeMap<Fqn, Fqn>,
    /// Factory `create*`/`get*` method → class it returns.
    factory_products: BTreeMap<CanonicalKey, Fqn>,
    diagnostics: Vec<Diagnostic>,
}

impl CodeIndex {
    fn empty(side: Side) -> Self {
        Self {
            side,
            classes: BTreeMap::new(),
            methods: BTreeMap::new(),
            factory_edges: BTreeMap::new(),
            factory_products: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn classes(&self) -> &BTreeMap<Fqn, ClassMetadata> {
        &self.classes
    }

    pub fn methods(&self) -> &BTreeMap<CanonicalKey, MethodMetadata> {
        &self.methods
    }

    pub fn class(&self, fqn: &Fqn) -> Option<&ClassMetadata> {
        self.classes.get(fqn)
    }

    pub fn method(&self, key: &CanonicalKey) -> Option<&MethodMetadata> {
        self.methods.get(key)
    }

    pub fn methods_of<'a>(&'a self, owner: &'a Fqn) -> impl Iterator<Item = &'a MethodMetadata> {
        self.methods.values().filter(move |m| &m.owner == owner)
    }

    /// The factory class an owner obtains through its factory accessor.
    pub fn factory_of(&self, owner: &Fqn) -> Option<&Fqn> {
        self.factory_edges.get(owner)
    }

    /// The class a factory method creates or returns.
    pub fn factory_product(&self, factory_method: &CanonicalKey) -> Option<&Fqn> {
        self.factory_products.get(factory_method)
    }

    /// Declared interfaces of a class (extended interfaces for an interface).
    pub fn interfaces_of(&self, fqn: &Fqn) -> &[Fqn] {
        self.classes
            .get(fqn)
            .map_or(&[], |c| c.interfaces.as_slice())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every interface reachable from `fqn` through interface edges, breadth
    /// first: direct interfaces in declaration order, then the interfaces
    /// they extend. Cycles are cut by a visited set; `fqn` itself is never
    /// yielded.
    pub fn interface_closure(&self, fqn: &Fqn) -> Vec<Fqn> {
        let mut visited: HashSet<&Fqn> = HashSet::from([fqn]);
        let mut queue: VecDeque<&Fqn> = self.interfaces_of(fqn).iter().collect();
        let mut order = Vec::new();

        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            order.push(next.clone());
            queue.extend(self.interfaces_of(next));
        }
        order
    }

    /// The nearest interface in the closure of `owner` that declares `method`.
    pub fn declaring_interface(&self, owner: &Fqn, method: &str) -> Option<Fqn> {
        self.interface_closure(owner).into_iter().find(|iface| {
            self.classes
                .get(iface)
                .is_some_and(|c| c.kind == TypeKind::Interface)
                && self.methods.contains_key(&CanonicalKey::new(iface, method))
        })
    }

    pub(crate) fn method_mut(&mut self, key: &CanonicalKey) -> Option<&mut MethodMetadata> {
        self.methods.get_mut(key)
    }

    /// Prune dangling interface edges and seal the index.
    pub fn freeze(mut self) -> FrozenIndex {
        let known: BTreeSet<Fqn> = self.classes.keys().cloned().collect();
        let mut dangling = Vec::new();

        for class in self.classes.values_mut() {
            let fqn = &class.fqn;
            class.interfaces.retain(|iface| {
                let present = known.contains(iface);
                if !present {
                    dangling.push((fqn.clone(), iface.clone()));
                }
                present
            });
        }

        for (fqn, iface) in dangling {
            self.diagnostics.push(Diagnostic {
                code: DiagnosticCode::DanglingInterface,
                side: self.side,
                subject: fqn.to_string(),
                message: format!("interface {iface} is not part of the snapshot"),
            });
        }
        self.diagnostics.sort();

        FrozenIndex { inner: self }
    }
}

/// A sealed [`CodeIndex`]. Only shared access is possible.
#[derive(Debug, Clone)]
pub struct FrozenIndex {
    inner: CodeIndex,
}

impl Deref for FrozenIndex {
    type Target = CodeIndex;

    fn deref(&self) -> &CodeIndex {
        &self.inner
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use changelens_graphs::{LanguageRegistry, extract_file};

    use super::*;

    /// Index `(path, source)` pairs with default rules.
    pub fn index_sources(side: Side, files: &[(&str, &str)]) -> CodeIndex {
        let rules = IndexRules::from_config(&ChangelensConfig::default()).unwrap();
        index_with_rules(side, &rules, files)
    }

    pub fn index_with_rules(side: Side, rules: &IndexRules, files: &[(&str, &str)]) -> CodeIndex {
        let registry = LanguageRegistry::new();
        let mut builder = CodeIndexBuilder::new(side, rules);
        for (path, source) in files {
            let decls = extract_file(&registry, Path::new(path), source).unwrap();
            builder.add_file(&decls);
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::index_sources;
    use super::*;

    const IFACE: &str = "<?php\nnamespace App;\ninterface FooInterface extends BaseInterface {\n    public function run();\n}\n";
    const BASE: &str = "<?php\nnamespace App;\ninterface BaseInterface {\n    public function base();\n}\n";
    const FOO: &str = "<?php\nnamespace App;\nclass Foo implements FooInterface, \\Missing\\Thing {\n    public function run() {}\n    public function base() {}\n}\n";

    #[test]
    fn closure_is_breadth_first() {
        let index = index_sources(
            Side::After,
            &[("src/Foo.php", FOO), ("src/FooInterface.php", IFACE), ("src/BaseInterface.php", BASE)],
        );
        let closure = index.interface_closure(&Fqn::new("App\\Foo"));
        assert_eq!(
            closure,
            vec![
                Fqn::new("App\\FooInterface"),
                Fqn::new("Missing\\Thing"),
                Fqn::new("App\\BaseInterface"),
            ]
        );
        assert_eq!(
            index.declaring_interface(&Fqn::new("App\\Foo"), "base"),
            Some(Fqn::new("App\\BaseInterface"))
        );
        assert_eq!(index.declaring_interface(&Fqn::new("App\\Foo"), "other"), None);
    }

    #[test]
    fn cyclic_interfaces_terminate() {
        let index = index_sources(
            Side::Before,
            &[
                ("src/AInterface.php", "<?php\ninterface AInterface extends BInterface {}\n"),
                ("src/BInterface.php", "<?php\ninterface BInterface extends AInterface {}\n"),
            ],
        );
        let closure = index.interface_closure(&Fqn::new("AInterface"));
        assert_eq!(closure, vec![Fqn::new("BInterface")]);
    }

    #[test]
    fn freeze_prunes_dangling_edges() {
        let index = index_sources(Side::After, &[("src/Foo.php", FOO), ("src/FooInterface.php", IFACE)]);
        let frozen = index.freeze();

        assert_eq!(frozen.interfaces_of(&Fqn::new("App\\Foo")), &[Fqn::new("App\\FooInterface")]);
        assert!(frozen.interfaces_of(&Fqn::new("App\\FooInterface")).is_empty());

        let dangling: Vec<_> = frozen
            .diagnostics()
            .iter()
            .filter(|d| d.code == DiagnosticCode::DanglingInterface)
            .map(|d| d.subject.as_str())
            .collect();
        assert_eq!(dangling, vec!["\\App\\Foo", "\\App\\FooInterface"]);
    }

    #[test]
    fn duplicate_class_replaces_members() {
        let index = index_sources(
            Side::After,
            &[
                ("a/Dup.php", "<?php\nclass Dup { public function old() {} }\n"),
                ("b/Dup.php", "<?php\nclass Dup { public function fresh() {} }\n"),
            ],
        );
        assert_eq!(index.classes().len(), 1);
        assert_eq!(index.class(&Fqn::new("Dup")).unwrap().file, Path::new("b/Dup.php"));
        let names: Vec<_> = index.methods().values().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["fresh"]);
        assert_eq!(index.diagnostics().len(), 1);
        assert_eq!(index.diagnostics()[0].code, DiagnosticCode::DuplicateDeclaration);
        assert_eq!(index.diagnostics()[0].subject, "\\Dup");
    }

    #[test]
    fn duplicate_method_keeps_latter() {
        let index = index_sources(
            Side::After,
            &[("a/Dup.php", "<?php\nclass Dup {\n  public function f() {}\n  private function f() {}\n}\n")],
        );
        assert_eq!(index.methods().len(), 1);
        let method = index.methods().values().next().unwrap();
        assert_eq!(method.visibility, changelens_graphs::Visibility::Private);
        assert_eq!(index.diagnostics()[0].subject, "\\Dup::f");
    }
}
