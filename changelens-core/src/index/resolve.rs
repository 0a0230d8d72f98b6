//! Documentation inheritance from interfaces to implementations.

use changelens_graphs::TypeKind;
use changelens_graphs::docblock::DocBlock;
use tracing::{debug, instrument};

use super::CodeIndex;
use crate::types::{CanonicalKey, DocSource, Fqn, MethodMetadata};

/// Fill missing method docs of concrete classes from the interfaces they
/// implement and return how many methods were resolved.
///
/// A method is a target when its summary is empty or `{@inheritDoc}`, or it
/// has no `@return` annotation, and its docs are still its own. Candidates
/// are visited breadth first through the interface hierarchy; the first
/// interface declaring the method with a real summary wins. Interfaces are
/// never modified, so running this again resolves nothing new.
#[instrument(skip_all, name = "resolve_inherited_docs", fields(side = %index.side()))]
pub fn resolve_inherited_docs(index: &mut CodeIndex) -> usize {
    let targets: Vec<CanonicalKey> = index
        .methods()
        .values()
        .filter(|m| is_target(index, m))
        .map(|m| m.key.clone())
        .collect();

    let mut resolved = 0;
    for key in targets {
        let Some(found) = index
            .method(&key)
            .and_then(|m| find_documented_source(index, &m.owner, &m.name))
        else {
            continue;
        };
        let (interface, source) = found;
        if let Some(method) = index.method_mut(&key) {
            method.doc = source.doc;
            method.return_annotation = source.return_annotation;
            method.is_api |= source.is_api;
            method.is_deprecated |= source.is_deprecated;
            method.doc_source = DocSource::Inherited(interface);
            resolved += 1;
        }
    }

    debug!(resolved, "Inherited documentation resolved");
    resolved
}

fn is_target(index: &CodeIndex, method: &MethodMetadata) -> bool {
    if method.doc_source != DocSource::Declared {
        return false;
    }
    let concrete = index
        .class(&method.owner)
        .is_some_and(|c| c.kind == TypeKind::Class);
    if !concrete {
        return false;
    }
    let doc = DocBlock::parse(&method.doc);
    doc.needs_inherited_summary() || method.return_annotation.is_none()
}

fn find_documented_source(
    index: &CodeIndex,
    owner: &Fqn,
    name: &str,
) -> Option<(Fqn, MethodMetadata)> {
    index.interface_closure(owner).into_iter().find_map(|iface| {
        let is_interface = index
            .class(&iface)
            .is_some_and(|c| c.kind == TypeKind::Interface);
        if !is_interface {
            return None;
        }
        let candidate = index.method(&CanonicalKey::new(&iface, name))?;
        let adequate = candidate.doc_source == DocSource::Declared
            && DocBlock::parse(&candidate.doc).has_adequate_summary();
        adequate.then(|| (iface, candidate.clone()))
    })
}
