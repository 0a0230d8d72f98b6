//! Transfer definition (`*.transfer.xml`) comparison.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Fqn, TransferChange, TransferChangeKind};

/// Namespace of the classes generated from transfer definitions.
pub const TRANSFER_NAMESPACE: &str = "Generated\\Shared\\Transfer";

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<!--.*?-->").expect("valid regex")
});

static TRANSFER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<transfer\b([^>]*?)(?:/>|>(.*?)</transfer\s*>)").expect("valid regex")
});

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<property\b([^>]*?)/?>").expect("valid regex")
});

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferProperty {
    pub type_name: Option<String>,
    pub strict: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferDefinition {
    pub strict: bool,
    pub properties: BTreeMap<String, TransferProperty>,
}

/// Parse every `<transfer>` of a definition file, keyed by transfer name.
/// Definitions without a `name` attribute are ignored.
pub fn parse_transfers(xml: &str) -> BTreeMap<String, TransferDefinition> {
    let xml = strip_comments(xml);
    let mut transfers = BTreeMap::new();

    for caps in TRANSFER_RE.captures_iter(&xml) {
        let attrs = attributes(caps.get(1).map_or("", |m| m.as_str()));
        let Some(name) = attrs.get("name").filter(|n| !n.is_empty()) else {
            continue;
        };

        let mut definition = TransferDefinition {
            strict: is_true(attrs.get("strict")),
            properties: BTreeMap::new(),
        };
        if let Some(body) = caps.get(2) {
            for prop in PROPERTY_RE.captures_iter(body.as_str()) {
                let prop_attrs = attributes(prop.get(1).map_or("", |m| m.as_str()));
                let Some(prop_name) = prop_attrs.get("name").filter(|n| !n.is_empty()) else {
                    continue;
                };
                definition.properties.insert(
                    prop_name.clone(),
                    TransferProperty {
                        type_name: prop_attrs.get("type").cloned(),
                        strict: is_true(prop_attrs.get("strict")),
                    },
                );
            }
        }
        transfers.insert(name.clone(), definition);
    }
    transfers
}

pub(super) fn strip_comments(xml: &str) -> std::borrow::Cow<'_, str> {
    COMMENT_RE.replace_all(xml, "")
}

/// `name="x" type='y'` → `{name: x, type: y}`, values trimmed.
pub(super) fn attributes(text: &str) -> BTreeMap<String, String> {
    ATTRIBUTE_RE
        .captures_iter(text)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str());
            (caps[1].to_string(), value.trim().to_string())
        })
        .collect()
}

fn is_true(value: Option<&String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// `Quote` → `\Generated\Shared\Transfer\QuoteTransfer`.
pub fn transfer_fqn(name: &str) -> Fqn {
    Fqn::new(&format!("{TRANSFER_NAMESPACE}\\{name}Transfer"))
}

/// Compare the definitions of one file. Either side may be absent (file
/// added or deleted).
pub fn compare_transfers(
    file: &Path,
    before: Option<&str>,
    after: Option<&str>,
) -> Vec<TransferChange> {
    let old = before.map(parse_transfers).unwrap_or_default();
    let new = after.map(parse_transfers).unwrap_or_default();
    let mut changes = Vec::new();

    let record = |name: &str, property: Option<&str>, change, old_type: Option<&String>, new_type: Option<&String>| {
        TransferChange {
            owner: transfer_fqn(name),
            property: property.map(str::to_string),
            change,
            old_type: old_type.cloned(),
            new_type: new_type.cloned(),
            file: file.to_path_buf(),
        }
    };

    for (name, new_def) in &new {
        let Some(old_def) = old.get(name) else {
            changes.push(record(name, None, TransferChangeKind::TransferAdded, None, None));
            continue;
        };

        if old_def.strict != new_def.strict {
            let kind = if new_def.strict {
                TransferChangeKind::StrictAdded
            } else {
                TransferChangeKind::StrictRemoved
            };
            changes.push(record(name, None, kind, None, None));
        }

        for (prop, new_prop) in &new_def.properties {
            let Some(old_prop) = old_def.properties.get(prop) else {
                changes.push(record(
                    name,
                    Some(prop),
                    TransferChangeKind::PropertyAdded,
                    None,
                    new_prop.type_name.as_ref(),
                ));
                continue;
            };
            if old_prop.strict != new_prop.strict {
                let kind = if new_prop.strict {
                    TransferChangeKind::StrictAdded
                } else {
                    TransferChangeKind::StrictRemoved
                };
                changes.push(record(name, Some(prop), kind, None, None));
            }
            if old_prop.type_name != new_prop.type_name {
                changes.push(record(
                    name,
                    Some(prop),
                    TransferChangeKind::PropertyModified,
                    old_prop.type_name.as_ref(),
                    new_prop.type_name.as_ref(),
                ));
            }
        }
        for (prop, old_prop) in &old_def.properties {
            if !new_def.properties.contains_key(prop) {
                changes.push(record(
                    name,
                    Some(prop),
                    TransferChangeKind::PropertyRemoved,
                    old_prop.type_name.as_ref(),
                    None,
                ));
            }
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            changes.push(record(name, None, TransferChangeKind::TransferRemoved, None, None));
        }
    }

    sort_transfer_changes(&mut changes);
    changes
}

/// Owner FQN, then property (transfer-level first), then change kind.
pub fn sort_transfer_changes(changes: &mut [TransferChange]) {
    changes.sort_by(|a, b| {
        a.owner
            .cmp(&b.owner)
            .then_with(|| a.property.cmp(&b.property))
            .then_with(|| a.change.cmp(&b.change))
            .then_with(|| a.file.cmp(&b.file))
    });
}
