//! Class constant comparison.

use crate::config::ChangelensConfig;
use crate::index::FrozenIndex;
use crate::types::{ClassMetadata, ConstantChange, ConstantChangeKind, ConstantMetadata};

/// Which owners count as configuration or constants holders.
#[derive(Debug, Clone)]
pub struct ConstantRules {
    class_suffixes: Vec<String>,
    directories: Vec<String>,
}

impl ConstantRules {
    pub fn from_config(config: &ChangelensConfig) -> Self {
        Self {
            class_suffixes: config.constants.class_suffixes.clone(),
            directories: config.constants.directories.clone(),
        }
    }

    /// `FooConfig`, `FooConstants`, or any class under a `Config/` directory.
    pub fn is_config_or_constants(&self, class: &ClassMetadata) -> bool {
        self.class_suffixes.iter().any(|s| class.fqn.has_suffix(s))
            || class.file.components().any(|c| {
                self.directories
                    .iter()
                    .any(|d| c.as_os_str() == d.as_str())
            })
    }
}

/// Compare the constants of every class present in both snapshots. Classes
/// that appear or disappear are reported as class changes instead.
pub fn detect_constant_changes(
    before: &FrozenIndex,
    after: &FrozenIndex,
    rules: &ConstantRules,
) -> Vec<ConstantChange> {
    let mut changes = Vec::new();

    for (fqn, new_class) in after.classes() {
        let Some(old_class) = before.class(fqn) else {
            continue;
        };
        let holder = rules.is_config_or_constants(old_class) || rules.is_config_or_constants(new_class);
        let record = |constant: &ConstantMetadata, change, old: Option<&str>, new: Option<&str>| ConstantChange {
            owner: new_class.fqn.clone(),
            name: constant.name.clone(),
            visibility: constant.visibility,
            change,
            old_value: old.map(str::to_string),
            new_value: new.map(str::to_string),
            config_or_constants: holder,
            file: new_class.file.clone(),
        };

        for constant in &new_class.constants {
            match find(old_class, &constant.name) {
                None => changes.push(record(constant, ConstantChangeKind::Added, None, Some(&constant.value))),
                Some(old) if old.value != constant.value => changes.push(record(
                    constant,
                    ConstantChangeKind::Modified,
                    Some(&old.value),
                    Some(&constant.value),
                )),
                Some(_) => {}
            }
        }
        for constant in &old_class.constants {
            if find(new_class, &constant.name).is_none() {
                changes.push(record(constant, ConstantChangeKind::Removed, Some(&constant.value), None));
            }
        }
    }

    changes.sort_by(|a, b| {
        a.owner
            .cmp(&b.owner)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.change.cmp(&b.change))
    });
    changes
}

/// PHP constant names are case-sensitive.
fn find<'a>(class: &'a ClassMetadata, name: &str) -> Option<&'a ConstantMetadata> {
    class.constants.iter().find(|c| c.name == name)
}
