use std::path::Path;

use changelens_graphs::docblock::{self, DocBlock};
use changelens_graphs::{CallReceiver, MethodDecl, TypeDecl, Visibility};

use super::class::resolve_type;
use super::{CodeIndexBuilder, IndexRules, ProductCall};
use crate::types::{CanonicalKey, ClassMetadata, DocSource, Fqn, MethodMetadata, SourceLocation};

pub(super) fn index_method(
    builder: &mut CodeIndexBuilder<'_>,
    owner: &ClassMetadata,
    type_decl: &TypeDecl,
    decl: &MethodDecl,
    file: &Path,
) {
    let doc_text = decl.doc.as_ref().map(|d| d.text.clone()).unwrap_or_default();
    let doc = DocBlock::parse(&doc_text);
    let rules = builder.rules;
    let key = CanonicalKey::new(&owner.fqn, &decl.name);
    let is_factory_method = is_factory_method(rules, owner, &decl.name);

    if is_factory_method {
        let product = doc
            .return_annotation()
            .and_then(docblock::first_class_type)
            .or_else(|| decl.return_type.as_deref().and_then(docblock::first_class_type))
            .and_then(|name| resolve_type(type_decl, name));
        if let Some(product) = product {
            builder.index.factory_products.insert(key.clone(), product);
        }
    }

    let mut calls = Vec::new();
    let mut product_calls = Vec::new();
    for site in &decl.calls {
        let target = match &site.receiver {
            CallReceiver::This => Some(owner.fqn.clone()),
            CallReceiver::Property(name) => owner.properties.get(name).cloned(),
            CallReceiver::Typed(type_name) => resolve_type(type_decl, type_name),
            CallReceiver::Scoped(scope) => match scope.to_ascii_lowercase().as_str() {
                "self" | "static" => Some(owner.fqn.clone()),
                "parent" => None,
                _ => resolve_type(type_decl, scope),
            },
            CallReceiver::Accessor(accessor) if rules.is_factory_accessor(accessor) => {
                owner.factory.clone()
            }
            CallReceiver::Accessor(_) => None,
            CallReceiver::FactoryProduct {
                accessor,
                factory_method,
            } => {
                if let Some(factory) = owner.factory.as_ref().filter(|_| rules.is_factory_accessor(accessor)) {
                    product_calls.push(ProductCall {
                        caller: key.clone(),
                        factory_method: CanonicalKey::new(factory, factory_method),
                        method: site.method.clone(),
                    });
                }
                None
            }
        };
        if let Some(target) = target {
            push_call(&mut calls, &target, &site.method);
        }
    }

    let method = MethodMetadata {
        key,
        owner: owner.fqn.clone(),
        name: decl.name.clone(),
        visibility: decl.visibility,
        is_static: decl.is_static,
        params: decl.params.clone(),
        return_type: decl.return_type.clone(),
        return_annotation: doc.return_annotation().map(str::to_string),
        is_config_method: is_config_method(rules, owner, decl.visibility, &doc),
        is_factory_method,
        is_api: doc.has_tag("api"),
        is_deprecated: doc.has_tag("deprecated"),
        doc: doc_text,
        doc_source: DocSource::Declared,
        body_hash: decl.body_hash,
        location: SourceLocation {
            file: file.to_path_buf(),
            start_line: decl.span.start_line(),
            end_line: decl.span.end_line(),
        },
        calls,
    };
    builder.insert_method(method);
    builder.product_calls.extend(product_calls);
}

fn push_call(calls: &mut Vec<CanonicalKey>, target: &Fqn, method: &str) {
    let callee = CanonicalKey::new(target, method);
    if !calls.contains(&callee) {
        calls.push(callee);
    }
}

/// Public and either owned by a configuration class or tagged as configuration.
fn is_config_method(
    rules: &IndexRules,
    owner: &ClassMetadata,
    visibility: Visibility,
    doc: &DocBlock,
) -> bool {
    if visibility != Visibility::Public {
        return false;
    }
    rules
        .config_class_suffixes
        .iter()
        .any(|suffix| owner.fqn.has_suffix(suffix))
        || rules.config_annotation_tags.iter().any(|tag| doc.has_tag(tag))
}

fn is_factory_method(rules: &IndexRules, owner: &ClassMetadata, name: &str) -> bool {
    owner.fqn.has_suffix(&rules.factory_class_suffix)
        && rules
            .factory_method_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
}
