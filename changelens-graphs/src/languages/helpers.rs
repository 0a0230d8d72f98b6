use tree_sitter::Node;

use crate::{DocCommentData, TextRange};

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.kind() == kind)
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Extract a block doc comment (/** ... */) from the preceding sibling.
///
/// Attributes (`#[...]`) between the comment and the declaration are skipped.
pub fn extract_block_doc_comment(node: Node<'_>, source: &str) -> Option<DocCommentData> {
    let mut prev = node.prev_sibling()?;
    while prev.kind() == "attribute_list" {
        prev = prev.prev_sibling()?;
    }
    if prev.kind() != "comment" {
        return None;
    }

    let text = node_text(prev, source);
    if !text.starts_with("/**") {
        return None;
    }

    // Strip /** prefix and */ suffix, clean up * at start of lines
    let body = text.strip_prefix("/**").unwrap_or(text);
    let body = body.strip_suffix("*/").unwrap_or(body);
    let inner = body
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix("* ")
                .or(trimmed.strip_prefix('*'))
                .unwrap_or(trimmed)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if inner.is_empty() {
        return None;
    }

    let content_hash = hash_string(&inner);
    Some(DocCommentData {
        text: inner,
        content_hash,
    })
}

/// Convert a tree-sitter node to a `TextRange`.
pub fn node_range(node: Node<'_>) -> TextRange {
    node.range().into()
}

/// Simple string hash for content dedup.
pub fn hash_string(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Hash of the text with all whitespace runs removed, so reformatting a body
/// does not count as a change.
pub fn hash_normalized(s: &str) -> u64 {
    let compact: String = s.split_whitespace().collect();
    hash_string(&compact)
}

/// Collapse internal whitespace runs to single spaces.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_hash_ignores_layout() {
        assert_eq!(
            hash_normalized("{\n    return $this->x;\n}"),
            hash_normalized("{ return $this->x; }")
        );
        assert_ne!(
            hash_normalized("{ return $this->x; }"),
            hash_normalized("{ return $this->y; }")
        );
    }

    #[test]
    fn squash_keeps_single_spaces() {
        assert_eq!(squash_whitespace("  ?Foo   $bar\n = null "), "?Foo $bar = null");
    }
}
