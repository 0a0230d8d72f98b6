//! Change detection: joins two frozen indexes on canonical keys and sorts
//! every difference into exactly one category.

pub mod constant;
pub mod dependency;
pub mod schema;
pub mod transfer;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::ChangelensConfig;
use crate::index::{CallGraph, FrozenIndex};
use crate::types::{
    ChangeKind, ClassChange, ClassChangeKind, Fqn, InternalChange, MethodChange, MethodMetadata,
    Param, SignatureDelta, TypeKind, Visibility, ends_with_ignore_case,
};

/// Naming rules that sort method changes into categories.
#[derive(Debug, Clone)]
pub struct DetectionRules {
    public_api_suffixes: Vec<String>,
    communication_directory: String,
    communication_suffixes: Vec<String>,
}

impl DetectionRules {
    pub fn from_config(config: &ChangelensConfig) -> Self {
        Self {
            public_api_suffixes: config.public_api.class_suffixes.clone(),
            communication_directory: config.communication_layer.directory.clone(),
            communication_suffixes: config.communication_layer.class_suffixes.clone(),
        }
    }

    /// The owner is an API class by name (`FooFacade`, `FooFacadeInterface`).
    fn is_api_class(&self, owner: &Fqn) -> bool {
        let simple = owner.simple_name();
        let base = if ends_with_ignore_case(simple, "Interface") {
            &simple[..simple.len() - "Interface".len()]
        } else {
            simple
        };
        self.public_api_suffixes
            .iter()
            .any(|s| ends_with_ignore_case(base, s))
    }

    /// Public visibility, and the owner is an API class by name, is itself an
    /// interface, or implements an interface that declares the method.
    pub fn is_public_api(&self, index: &FrozenIndex, method: &MethodMetadata) -> bool {
        if method.visibility != Visibility::Public {
            return false;
        }
        if self.is_api_class(&method.owner) {
            return true;
        }
        if index
            .class(&method.owner)
            .is_some_and(|c| c.kind == TypeKind::Interface)
        {
            return true;
        }
        index.declaring_interface(&method.owner, &method.name).is_some()
    }

    /// A public method of an API class, where callers outside the module enter.
    pub fn is_entrypoint(&self, method: &MethodMetadata) -> bool {
        method.visibility == Visibility::Public && self.is_api_class(&method.owner)
    }

    /// A non-private method of a controller, form or table inside the
    /// Communication layer directory.
    pub fn is_communication_layer(&self, method: &MethodMetadata) -> bool {
        method.visibility != Visibility::Private
            && method
                .location
                .file
                .components()
                .any(|c| c.as_os_str() == self.communication_directory.as_str())
            && self
                .communication_suffixes
                .iter()
                .any(|s| method.owner.has_suffix(s))
    }
}

/// Method and class changes, one vector per category, each sorted by owner
/// FQN then canonical key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralChanges {
    pub modified_public_api: Vec<MethodChange>,
    pub new_public_api: Vec<MethodChange>,
    pub modified_config_methods: Vec<MethodChange>,
    pub new_config_methods: Vec<MethodChange>,
    pub modified_communication_layer: Vec<MethodChange>,
    pub internal_with_impact: Vec<MethodChange>,
    pub internal_no_impact: Vec<MethodChange>,
    pub new_internal: Vec<MethodChange>,
    pub removed_methods: Vec<MethodChange>,
    pub new_classes: Vec<ClassChange>,
    pub removed_classes: Vec<ClassChange>,
    pub deprecated_classes: Vec<ClassChange>,
}

impl StructuralChanges {
    fn sort(&mut self) {
        for category in [
            &mut self.modified_public_api,
            &mut self.new_public_api,
            &mut self.modified_config_methods,
            &mut self.new_config_methods,
            &mut self.modified_communication_layer,
            &mut self.internal_with_impact,
            &mut self.internal_no_impact,
            &mut self.new_internal,
            &mut self.removed_methods,
        ] {
            category.sort_by(|a, b| a.owner.cmp(&b.owner).then_with(|| a.key.cmp(&b.key)));
        }
        for category in [
            &mut self.new_classes,
            &mut self.removed_classes,
            &mut self.deprecated_classes,
        ] {
            category.sort_by(|a, b| a.fqn.cmp(&b.fqn));
        }
    }
}

/// Compare two snapshots. Only frozen indexes are accepted, so resolution
/// has finished on both sides.
///
/// A signature change outside configuration, the Communication layer and the
/// public API is checked against the after snapshot's call graph: it has
/// impact when a public entrypoint reaches it.
#[instrument(skip_all, name = "detect_changes")]
pub fn detect_changes(
    before: &FrozenIndex,
    after: &FrozenIndex,
    rules: &DetectionRules,
) -> StructuralChanges {
    let mut out = StructuralChanges::default();
    let calls = CallGraph::build(after);

    for (fqn, class) in after.classes() {
        match before.class(fqn) {
            None => out.new_classes.push(class_change(fqn, class.kind, ClassChangeKind::New, &class.file)),
            Some(old) if !old.deprecated && class.deprecated => out.deprecated_classes.push(
                class_change(fqn, class.kind, ClassChangeKind::Deprecated, &class.file),
            ),
            Some(_) => {}
        }
    }
    for (fqn, class) in before.classes() {
        if after.class(fqn).is_none() {
            out.removed_classes
                .push(class_change(fqn, class.kind, ClassChangeKind::Removed, &class.file));
        }
    }

    for (key, new) in after.methods() {
        match before.method(key) {
            None => {
                let public_api = rules.is_public_api(after, new);
                let record = method_change(new, ChangeKind::New, None, Vec::new(), public_api);
                if new.is_config_method {
                    out.new_config_methods.push(record);
                } else if public_api {
                    out.new_public_api.push(record);
                } else {
                    out.new_internal.push(record);
                }
            }
            Some(old) => {
                let deltas = signature_deltas(old, new);
                let internal = if !deltas.is_empty() {
                    InternalChange::Signature
                } else if implementation_changed(old, new) {
                    InternalChange::Implementation
                } else {
                    continue;
                };
                let public_api =
                    rules.is_public_api(before, old) || rules.is_public_api(after, new);
                let mut record =
                    method_change(new, ChangeKind::Modified, Some(internal), deltas, public_api);

                if old.is_config_method || new.is_config_method {
                    out.modified_config_methods.push(record);
                } else if rules.is_communication_layer(old) || rules.is_communication_layer(new) {
                    out.modified_communication_layer.push(record);
                } else if internal == InternalChange::Signature && public_api {
                    out.modified_public_api.push(record);
                } else if internal == InternalChange::Signature {
                    record.impacted_entrypoints =
                        calls.entrypoints_reaching(after, key, |m| rules.is_entrypoint(m));
                    if record.impacted_entrypoints.is_empty() {
                        out.internal_no_impact.push(record);
                    } else {
                        out.internal_with_impact.push(record);
                    }
                } else {
                    out.internal_no_impact.push(record);
                }
            }
        }
    }
    for (key, old) in before.methods() {
        if after.method(key).is_none() {
            let public_api = rules.is_public_api(before, old);
            out.removed_methods
                .push(method_change(old, ChangeKind::Removed, None, Vec::new(), public_api));
        }
    }

    out.sort();
    debug!(
        modified_public_api = out.modified_public_api.len(),
        new_public_api = out.new_public_api.len(),
        modified_config = out.modified_config_methods.len(),
        communication_layer = out.modified_communication_layer.len(),
        with_impact = out.internal_with_impact.len(),
        removed = out.removed_methods.len(),
        "Structural changes detected"
    );
    out
}

fn class_change(
    fqn: &Fqn,
    kind: TypeKind,
    change: ClassChangeKind,
    file: &std::path::Path,
) -> ClassChange {
    ClassChange {
        fqn: fqn.clone(),
        kind,
        change,
        file: file.to_path_buf(),
    }
}

fn method_change(
    meta: &MethodMetadata,
    change: ChangeKind,
    internal: Option<InternalChange>,
    signature_deltas: Vec<SignatureDelta>,
    public_api: bool,
) -> MethodChange {
    MethodChange {
        key: meta.key.clone(),
        owner: meta.owner.clone(),
        name: meta.name.clone(),
        visibility: meta.visibility,
        change,
        internal,
        signature_deltas,
        public_api,
        is_api: meta.is_api,
        is_deprecated: meta.is_deprecated,
        is_config_method: meta.is_config_method,
        is_factory_method: meta.is_factory_method,
        file: meta.location.file.clone(),
        impacted_entrypoints: Vec::new(),
    }
}

fn signature_deltas(old: &MethodMetadata, new: &MethodMetadata) -> Vec<SignatureDelta> {
    let mut deltas = Vec::new();
    if old.visibility != new.visibility {
        deltas.push(SignatureDelta::Visibility {
            from: old.visibility,
            to: new.visibility,
        });
    }
    if old.is_static != new.is_static {
        deltas.push(SignatureDelta::Static {
            from: old.is_static,
            to: new.is_static,
        });
    }
    if old.params != new.params {
        deltas.push(SignatureDelta::Parameters {
            from: render_params(&old.params),
            to: render_params(&new.params),
        });
    }
    if old.return_type != new.return_type {
        deltas.push(SignatureDelta::ReturnType {
            from: old.return_type.clone(),
            to: new.return_type.clone(),
        });
    }
    if old.return_annotation != new.return_annotation {
        deltas.push(SignatureDelta::ReturnAnnotation {
            from: old.return_annotation.clone(),
            to: new.return_annotation.clone(),
        });
    }
    deltas
}

fn implementation_changed(old: &MethodMetadata, new: &MethodMetadata) -> bool {
    old.doc != new.doc || old.body_hash != new.body_hash
}

/// `(Foo $a, int &...$rest = [])` style rendering for reports.
pub fn render_params(params: &[Param]) -> String {
    let rendered: Vec<String> = params
        .iter()
        .map(|p| {
            let mut out = String::new();
            if let Some(ty) = &p.type_hint {
                out.push_str(ty);
                out.push(' ');
            }
            if p.by_ref {
                out.push('&');
            }
            if p.variadic {
                out.push_str("...");
            }
            out.push_str(&p.name);
            if let Some(default) = &p.default {
                out.push_str(" = ");
                out.push_str(default);
            }
            out
        })
        .collect();
    format!("({})", rendered.join(", "))
}
