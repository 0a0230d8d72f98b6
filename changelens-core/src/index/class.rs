use std::path::Path;

use changelens_graphs::docblock::{self, DocBlock};
use changelens_graphs::{TypeDecl, names};

use super::CodeIndexBuilder;
use crate::types::{ClassMetadata, ConstantMetadata, Fqn};

/// Record a class or interface and its edges; returns the stored metadata.
pub(super) fn index_class(
    builder: &mut CodeIndexBuilder<'_>,
    decl: &TypeDecl,
    file: &Path,
) -> ClassMetadata {
    let fqn = Fqn::new(&names::join(&decl.namespace, &decl.name));
    let doc = decl
        .doc
        .as_ref()
        .map(|d| DocBlock::parse(&d.text))
        .unwrap_or_default();

    let interfaces = decl
        .interfaces
        .iter()
        .filter_map(|name| resolve_type(decl, name))
        .collect();
    let constants = decl
        .constants
        .iter()
        .map(|c| ConstantMetadata {
            name: c.name.clone(),
            visibility: c.visibility,
            value: c.value.clone(),
            line: c.span.start_line(),
        })
        .collect();
    let properties = decl
        .properties
        .iter()
        .filter_map(|p| Some((p.name.clone(), resolve_type(decl, &p.type_name)?)))
        .collect();

    let class = ClassMetadata {
        fqn: fqn.clone(),
        kind: decl.kind,
        file: file.to_path_buf(),
        interfaces,
        factory: owned_factory(builder, decl),
        summary: doc.summary().to_string(),
        deprecated: doc.has_tag("deprecated"),
        constants,
        properties,
    };

    builder.insert_class(class.clone(), file);
    if let Some(factory) = &class.factory {
        builder
            .index
            .factory_edges
            .insert(fqn, factory.clone());
    }
    class
}

/// The factory named by a class-level `@method <Type> <accessor>()` tag, or
/// else by the `@return` of an accessor method.
fn owned_factory(builder: &CodeIndexBuilder<'_>, decl: &TypeDecl) -> Option<Fqn> {
    let rules = builder.rules;

    let from_class_doc = decl
        .doc
        .as_ref()
        .and_then(|d| rules.factory_annotation.find_type(&d.text))
        .map(str::to_string);

    let from_accessor = || {
        decl.methods
            .iter()
            .filter(|m| rules.is_factory_accessor(&m.name))
            .find_map(|m| {
                let doc = DocBlock::parse(&m.doc.as_ref()?.text);
                doc.return_annotation().map(str::to_string)
            })
    };

    let annotation = from_class_doc.or_else(from_accessor)?;
    let type_name = docblock::first_class_type(&annotation)?;
    resolve_type(decl, type_name)
}

/// Resolve a type name as written inside `decl` to an FQN.
pub(super) fn resolve_type(decl: &TypeDecl, name: &str) -> Option<Fqn> {
    decl.aliases
        .resolve(name, &decl.namespace)
        .map(|resolved| Fqn::new(&resolved))
}
