//! Propel database schema (`*.schema.xml`) comparison.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::transfer::{attributes, strip_comments};
use crate::types::{SchemaChange, SchemaChangeKind};

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<table\b([^>]*?)(?:/>|>(.*?)</table\s*>)").expect("valid regex")
});

static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<column\b([^>]*?)/?>").expect("valid regex")
});

// `<index>` and `<unique>` must not match `<index-column>`.
static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<(index|unique)(\s[^>]*?)?(?:/>|>(.*?)</(?:index|unique)\s*>)")
        .expect("valid regex")
});

static INDEX_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<(?:index|unique)-column\b([^>]*?)/?>").expect("valid regex")
});

/// Column attributes that do not change the stored data.
const IGNORED_COLUMN_ATTRIBUTES: &[&str] = &["name", "description", "phpName"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDefinition {
    /// Column name → rendered attributes (`type=VARCHAR size=255`).
    pub columns: BTreeMap<String, String>,
    /// Index name → rendered definition (`unique(fk_cart, sku)`).
    pub indexes: BTreeMap<String, String>,
}

/// Parse every `<table>` of a schema file, keyed by table name.
pub fn parse_schema(xml: &str) -> BTreeMap<String, TableDefinition> {
    let xml = strip_comments(xml);
    let mut tables = BTreeMap::new();

    for caps in TABLE_RE.captures_iter(&xml) {
        let attrs = attributes(caps.get(1).map_or("", |m| m.as_str()));
        let Some(name) = attrs.get("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let body = caps.get(2).map_or("", |m| m.as_str());

        let mut table = TableDefinition::default();
        for column in COLUMN_RE.captures_iter(body) {
            let column_attrs = attributes(column.get(1).map_or("", |m| m.as_str()));
            let Some(column_name) = column_attrs.get("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            table
                .columns
                .insert(column_name.clone(), render_column(&column_attrs));
        }
        for index in INDEX_RE.captures_iter(body) {
            let kind = &index[1];
            let index_attrs = attributes(index.get(2).map_or("", |m| m.as_str()));
            let columns: Vec<String> = INDEX_COLUMN_RE
                .captures_iter(index.get(3).map_or("", |m| m.as_str()))
                .filter_map(|c| attributes(&c[1]).remove("name"))
                .collect();
            let rendered = format!("{kind}({})", columns.join(", "));
            let key = index_attrs
                .get("name")
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| rendered.clone());
            table.indexes.insert(key, rendered);
        }
        tables.insert(name.clone(), table);
    }
    tables
}

fn render_column(attrs: &BTreeMap<String, String>) -> String {
    attrs
        .iter()
        .filter(|(key, _)| !IGNORED_COLUMN_ATTRIBUTES.contains(&key.as_str()))
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compare the tables of one schema file. Either side may be absent (file
/// added or deleted). Added and removed tables are reported once, without
/// their columns.
pub fn compare_schemas(file: &Path, before: Option<&str>, after: Option<&str>) -> Vec<SchemaChange> {
    let old = before.map(parse_schema).unwrap_or_default();
    let new = after.map(parse_schema).unwrap_or_default();
    let mut changes = Vec::new();

    let record = |table: &str, element: Option<&String>, change, old: Option<&String>, new: Option<&String>| {
        SchemaChange {
            table: table.to_string(),
            element: element.cloned(),
            change,
            old: old.cloned(),
            new: new.cloned(),
            file: file.to_path_buf(),
        }
    };

    for (name, new_table) in &new {
        let Some(old_table) = old.get(name) else {
            changes.push(record(name, None, SchemaChangeKind::TableAdded, None, None));
            continue;
        };
        for (kinds, old_items, new_items) in [
            (
                [SchemaChangeKind::ColumnAdded, SchemaChangeKind::ColumnRemoved, SchemaChangeKind::ColumnModified],
                &old_table.columns,
                &new_table.columns,
            ),
            (
                [SchemaChangeKind::IndexAdded, SchemaChangeKind::IndexRemoved, SchemaChangeKind::IndexModified],
                &old_table.indexes,
                &new_table.indexes,
            ),
        ] {
            let [added, removed, modified] = kinds;
            for (item, rendered) in new_items {
                match old_items.get(item) {
                    None => changes.push(record(name, Some(item), added, None, Some(rendered))),
                    Some(previous) if previous != rendered => {
                        changes.push(record(name, Some(item), modified, Some(previous), Some(rendered)));
                    }
                    Some(_) => {}
                }
            }
            for (item, rendered) in old_items {
                if !new_items.contains_key(item) {
                    changes.push(record(name, Some(item), removed, Some(rendered), None));
                }
            }
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            changes.push(record(name, None, SchemaChangeKind::TableRemoved, None, None));
        }
    }

    changes.sort_by(|a, b| {
        a.table
            .cmp(&b.table)
            .then_with(|| a.element.cmp(&b.element))
            .then_with(|| a.change.cmp(&b.change))
    });
    changes
}
