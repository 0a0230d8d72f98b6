//! Reverse call graph over one frozen snapshot, used to decide whether an
//! internal change can surface through a public entrypoint.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use changelens_graphs::TypeKind;

use super::CodeIndex;
use crate::types::{CanonicalKey, ImpactedEntrypoint, MethodMetadata};

/// Callee → callers. An implementation method also lists the interface
/// methods it fulfils as callers, so a call through an interface reaches it.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    callers: BTreeMap<CanonicalKey, BTreeSet<CanonicalKey>>,
}

impl CallGraph {
    pub fn build(index: &CodeIndex) -> Self {
        let mut graph = Self::default();

        for method in index.methods().values() {
            for callee in &method.calls {
                graph.link(callee, &method.key);
            }
        }

        for class in index.classes().values() {
            if class.kind == TypeKind::Interface {
                continue;
            }
            let interfaces = index.interface_closure(&class.fqn);
            for method in index.methods_of(&class.fqn) {
                for iface in &interfaces {
                    let declared = CanonicalKey::new(iface, &method.name);
                    if index.method(&declared).is_some() {
                        graph.link(&method.key, &declared);
                    }
                }
            }
        }
        graph
    }

    fn link(&mut self, callee: &CanonicalKey, caller: &CanonicalKey) {
        if callee != caller {
            self.callers
                .entry(callee.clone())
                .or_default()
                .insert(caller.clone());
        }
    }

    pub fn callers(&self, key: &CanonicalKey) -> impl Iterator<Item = &CanonicalKey> {
        self.callers.get(key).into_iter().flatten()
    }

    /// Breadth-first walk up the callers of `target`. Every reached method
    /// that satisfies `is_entrypoint` is returned with its distance, sorted by
    /// distance then key. `target` itself is never returned.
    pub fn entrypoints_reaching(
        &self,
        index: &CodeIndex,
        target: &CanonicalKey,
        is_entrypoint: impl Fn(&MethodMetadata) -> bool,
    ) -> Vec<ImpactedEntrypoint> {
        let mut seen: BTreeSet<&CanonicalKey> = BTreeSet::from([target]);
        let mut queue: VecDeque<(&CanonicalKey, usize)> = VecDeque::from([(target, 0)]);
        let mut found = Vec::new();

        while let Some((key, hops)) = queue.pop_front() {
            for caller in self.callers(key) {
                if !seen.insert(caller) {
                    continue;
                }
                if index.method(caller).is_some_and(&is_entrypoint) {
                    found.push(ImpactedEntrypoint {
                        key: caller.clone(),
                        hops: hops + 1,
                    });
                }
                queue.push_back((caller, hops + 1));
            }
        }

        found.sort_by(|a, b| a.hops.cmp(&b.hops).then_with(|| a.key.cmp(&b.key)));
        found
    }
}
