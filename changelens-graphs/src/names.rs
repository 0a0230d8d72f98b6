// Namespace alias tables built from `use` statements, and name resolution
// against them.

use std::collections::BTreeMap;

pub const NAMESPACE_SEPARATOR: char = '\\';

/// Import aliases visible at one point of a file.
///
/// Keys are lowercased aliases (class names are case-insensitive), values are
/// the imported names without a leading separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, alias: &str, target: &str) {
        let target = target.trim().trim_start_matches(NAMESPACE_SEPARATOR);
        let alias = alias.trim();
        if alias.is_empty() || target.is_empty() {
            return;
        }
        self.entries
            .insert(alias.to_ascii_lowercase(), target.to_string());
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .get(&alias.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Record every class import of a `use` statement and return how many
    /// aliases were added. Handles comma lists, `as` aliases and group
    /// imports (`use A\{B, C as D};`). `use function` and `use const` import
    /// no class names and are ignored.
    pub fn add_use_statement(&mut self, statement: &str) -> usize {
        let body = statement.trim().trim_end_matches(';').trim();
        let Some(body) = strip_keyword(body, "use") else {
            return 0;
        };
        if strip_keyword(body, "function").is_some() || strip_keyword(body, "const").is_some() {
            return 0;
        }

        let mut added = 0;
        if let Some(open) = body.find('{') {
            let prefix = body[..open].trim().trim_end_matches(NAMESPACE_SEPARATOR);
            let inner = body[open + 1..].trim().trim_end_matches('}');
            for item in inner.split(',') {
                let item = item.trim();
                if item.is_empty()
                    || strip_keyword(item, "function").is_some()
                    || strip_keyword(item, "const").is_some()
                {
                    continue;
                }
                if self.add_item(&format!("{prefix}{NAMESPACE_SEPARATOR}{item}")) {
                    added += 1;
                }
            }
        } else {
            for item in body.split(',') {
                if self.add_item(item) {
                    added += 1;
                }
            }
        }
        added
    }

    fn add_item(&mut self, item: &str) -> bool {
        let tokens: Vec<&str> = item.split_whitespace().collect();
        let (target, alias) = match tokens.as_slice() {
            [target] => (*target, last_segment(target)),
            [target, kw, alias] if kw.eq_ignore_ascii_case("as") => (*target, *alias),
            _ => return false,
        };
        if alias.is_empty() {
            return false;
        }
        self.insert(alias, target);
        true
    }

    /// Resolve a class name as written in `namespace` to a fully-qualified
    /// name with a leading separator.
    ///
    /// Order: already-qualified names pass through, `namespace\` relative
    /// names bind to the current namespace, the first segment is looked up in
    /// the alias table, anything else is relative to the current namespace.
    pub fn resolve(&self, name: &str, namespace: &str) -> Option<String> {
        let raw = name.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.starts_with(NAMESPACE_SEPARATOR) {
            let bare = raw.trim_start_matches(NAMESPACE_SEPARATOR);
            return (!bare.is_empty()).then(|| qualify(bare));
        }

        if let Some(rest) = raw
            .strip_prefix("namespace\\")
            .or_else(|| raw.strip_prefix("Namespace\\"))
        {
            return Some(join(namespace, rest));
        }

        let (head, tail) = match raw.split_once(NAMESPACE_SEPARATOR) {
            Some((head, tail)) => (head, Some(tail)),
            None => (raw, None),
        };

        if let Some(mapped) = self.get(head) {
            return Some(match tail {
                Some(tail) => qualify(&format!("{mapped}{NAMESPACE_SEPARATOR}{tail}")),
                None => qualify(mapped),
            });
        }

        Some(join(namespace, raw))
    }
}

/// Join a namespace and a relative name into a fully-qualified name.
pub fn join(namespace: &str, name: &str) -> String {
    let namespace = namespace.trim().trim_matches(NAMESPACE_SEPARATOR);
    if namespace.is_empty() {
        qualify(name)
    } else {
        qualify(&format!("{namespace}{NAMESPACE_SEPARATOR}{name}"))
    }
}

/// Ensure exactly one leading separator.
pub fn qualify(name: &str) -> String {
    format!(
        "{NAMESPACE_SEPARATOR}{}",
        name.trim().trim_start_matches(NAMESPACE_SEPARATOR)
    )
}

/// Last segment of a namespaced name (`\A\B\Foo` → `Foo`).
pub fn last_segment(name: &str) -> &str {
    name.rsplit(NAMESPACE_SEPARATOR).next().unwrap_or(name)
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    rest.starts_with(char::is_whitespace).then(|| rest.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_and_aliased_imports() {
        let mut table = AliasTable::new();
        assert_eq!(table.add_use_statement("use Spryker\\Zed\\Kernel\\AbstractFacade;"), 1);
        assert_eq!(
            table.add_use_statement("use Generated\\Shared\\Transfer\\QuoteTransfer as Quote, Foo\\Bar;"),
            2
        );

        assert_eq!(table.get("abstractfacade"), Some("Spryker\\Zed\\Kernel\\AbstractFacade"));
        assert_eq!(table.get("Quote"), Some("Generated\\Shared\\Transfer\\QuoteTransfer"));
        assert_eq!(table.get("Bar"), Some("Foo\\Bar"));
    }

    #[test]
    fn group_imports_expand_prefix() {
        let mut table = AliasTable::new();
        let added = table.add_use_statement("use Pyz\\Zed\\Cart\\{CartConfig, Business\\CartFacade as Facade};");
        assert_eq!(added, 2);
        assert_eq!(table.get("CartConfig"), Some("Pyz\\Zed\\Cart\\CartConfig"));
        assert_eq!(table.get("Facade"), Some("Pyz\\Zed\\Cart\\Business\\CartFacade"));
    }

    #[test]
    fn function_and_const_imports_are_ignored() {
        let mut table = AliasTable::new();
        assert_eq!(table.add_use_statement("use function Foo\\bar;"), 0);
        assert_eq!(table.add_use_statement("use const Foo\\BAZ;"), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn resolution_order() {
        let mut table = AliasTable::new();
        table.add_use_statement("use Spryker\\Zed\\Cart\\Business\\CartFacadeInterface;");
        table.add_use_statement("use Spryker\\Shared\\Kernel as K;");

        let ns = "Pyz\\Zed\\Cart";
        assert_eq!(
            table.resolve("\\Some\\Absolute", ns).as_deref(),
            Some("\\Some\\Absolute")
        );
        assert_eq!(
            table.resolve("cartfacadeinterface", ns).as_deref(),
            Some("\\Spryker\\Zed\\Cart\\Business\\CartFacadeInterface")
        );
        assert_eq!(
            table.resolve("K\\Store", ns).as_deref(),
            Some("\\Spryker\\Shared\\Kernel\\Store")
        );
        assert_eq!(
            table.resolve("Business\\CartFacade", ns).as_deref(),
            Some("\\Pyz\\Zed\\Cart\\Business\\CartFacade")
        );
        assert_eq!(
            table.resolve("namespace\\Local", ns).as_deref(),
            Some("\\Pyz\\Zed\\Cart\\Local")
        );
        assert_eq!(table.resolve("Global", "").as_deref(), Some("\\Global"));
        assert_eq!(table.resolve("  ", ns), None);
        assert_eq!(table.resolve("\\", ns), None);
    }
}
