//! Docblock pattern layer.
//!
//! Everything here works on the cleaned doc text produced by the extractor
//! (no `/**`, `*/` or leading `*`). Malformed or absent annotations yield
//! `None`; nothing in this module fails.

use std::sync::LazyLock;

use regex::Regex;

static TAG_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^@([A-Za-z][\w\-\\]*)(?:\s+(.*))?$").expect("valid regex")
});

static INHERIT_DOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^\{?@inheritdoc\}?$").expect("valid regex")
});

/// One `@tag value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub name: String,
    pub value: String,
}

/// A parsed docblock: free-text summary followed by tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    summary: String,
    tags: Vec<DocTag>,
}

impl DocBlock {
    pub fn parse(text: &str) -> Self {
        let mut summary_lines = Vec::new();
        let mut tags: Vec<DocTag> = Vec::new();
        let mut in_tags = false;

        for line in text.lines() {
            let line = line.trim();
            if let Some(caps) = TAG_LINE_RE.captures(line) {
                in_tags = true;
                tags.push(DocTag {
                    name: caps[1].to_string(),
                    value: caps
                        .get(2)
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default(),
                });
            } else if in_tags {
                // Continuation of a multi-line tag description.
                if let (Some(last), false) = (tags.last_mut(), line.is_empty()) {
                    if !last.value.is_empty() {
                        last.value.push(' ');
                    }
                    last.value.push_str(line);
                }
            } else if !line.is_empty() {
                summary_lines.push(line);
            }
        }

        Self {
            summary: summary_lines.join(" "),
            tags,
        }
    }

    /// Free text before the first tag, lines joined with a space.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn tags(&self) -> &[DocTag] {
        &self.tags
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.name.eq_ignore_ascii_case(name))
            .map(|t| t.value.as_str())
    }

    /// The type expression of the first `@return` tag (`FooTransfer|null`).
    pub fn return_annotation(&self) -> Option<&str> {
        self.tag_values("return")
            .next()
            .and_then(|v| v.split_whitespace().next())
    }

    /// The summary is missing or only defers to the parent (`{@inheritDoc}`).
    pub fn needs_inherited_summary(&self) -> bool {
        self.summary.is_empty() || is_inherit_doc(&self.summary)
    }

    /// The summary carries real documentation of its own.
    pub fn has_adequate_summary(&self) -> bool {
        !self.needs_inherited_summary()
    }
}

/// `{@inheritDoc}` or `@inheritDoc`, any case.
pub fn is_inherit_doc(summary: &str) -> bool {
    INHERIT_DOC_RE.is_match(summary.trim())
}

/// Pick the class-like member of a union type annotation: the first member
/// that is not an array, not a scalar pseudo-type and not `null`.
pub fn first_class_type(annotation: &str) -> Option<&str> {
    annotation
        .split('|')
        .map(|member| member.trim().trim_start_matches('?'))
        .find(|member| {
            !member.is_empty()
                && !member.ends_with("[]")
                && !matches!(
                    member.to_ascii_lowercase().as_str(),
                    "null" | "void" | "mixed" | "array" | "string" | "int" | "float" | "bool"
                        | "true" | "false" | "static" | "self" | "$this" | "object" | "callable"
                        | "iterable"
                )
        })
}

/// Matches `@method <Type> <accessor>(` class annotations for a fixed set of
/// accessor names.
#[derive(Debug, Clone)]
pub struct MethodAnnotationMatcher {
    re: Option<Regex>,
}

impl MethodAnnotationMatcher {
    pub fn new<S: AsRef<str>>(accessor_names: &[S]) -> crate::Result<Self> {
        let alternatives = accessor_names
            .iter()
            .map(|name| regex::escape(name.as_ref().trim()))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        if alternatives.is_empty() {
            return Ok(Self { re: None });
        }
        let re = Regex::new(&format!(
            r"(?m)@method\s+(?:static\s+)?(\S+)\s+(?:{alternatives})\s*\("
        ))?;
        Ok(Self { re: Some(re) })
    }

    /// Type expression of the first matching `@method` annotation.
    pub fn find_type<'a>(&self, doc_text: &'a str) -> Option<&'a str> {
        self.re
            .as_ref()?
            .captures(doc_text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_and_tags() {
        let doc = DocBlock::parse(
            "Specification:\n- Adds items to the cart.\n\n@api\n\n@param \\Generated\\Shared\\Transfer\\CartChangeTransfer $cartChange\n  the change\n@return \\Generated\\Shared\\Transfer\\QuoteTransfer",
        );
        assert_eq!(doc.summary(), "Specification: - Adds items to the cart.");
        assert!(doc.has_tag("api"));
        assert!(doc.has_tag("API"));
        assert!(!doc.has_tag("deprecated"));
        assert_eq!(
            doc.tag_values("param").next(),
            Some("\\Generated\\Shared\\Transfer\\CartChangeTransfer $cartChange the change")
        );
        assert_eq!(
            doc.return_annotation(),
            Some("\\Generated\\Shared\\Transfer\\QuoteTransfer")
        );
        assert!(doc.has_adequate_summary());
    }

    #[test]
    fn inherit_doc_markers() {
        assert!(DocBlock::parse("{@inheritDoc}").needs_inherited_summary());
        assert!(DocBlock::parse("{@inheritdoc}\n\n@api").needs_inherited_summary());
        assert!(DocBlock::parse("@return void").needs_inherited_summary());
        assert!(DocBlock::parse("").needs_inherited_summary());
        assert!(!DocBlock::parse("Does something.").needs_inherited_summary());
        assert!(is_inherit_doc(" @InheritDoc "));
    }

    #[test]
    fn return_annotation_absent() {
        let doc = DocBlock::parse("Summary only.\n@param int $x");
        assert_eq!(doc.return_annotation(), None);
    }

    #[test]
    fn union_member_selection() {
        assert_eq!(first_class_type("FooFactory"), Some("FooFactory"));
        assert_eq!(
            first_class_type("\\Foo\\Bar[]|null|\\Foo\\BarFactory"),
            Some("\\Foo\\BarFactory")
        );
        assert_eq!(first_class_type("?QuoteTransfer"), Some("QuoteTransfer"));
        assert_eq!(first_class_type("array|null"), None);
        assert_eq!(first_class_type(""), None);
    }

    #[test]
    fn method_annotation_matcher() {
        let matcher = MethodAnnotationMatcher::new(&["getFactory", "getBusinessFactory"]).unwrap();
        let doc = "@method \\Pyz\\Zed\\Cart\\Business\\CartBusinessFactory getFactory()\n@method CartConfig getConfig()";
        assert_eq!(
            matcher.find_type(doc),
            Some("\\Pyz\\Zed\\Cart\\Business\\CartBusinessFactory")
        );
        assert_eq!(matcher.find_type("@method CartConfig getConfig()"), None);
        assert_eq!(matcher.find_type("@method getFactory()"), None);

        let empty = MethodAnnotationMatcher::new::<&str>(&[]).unwrap();
        assert_eq!(empty.find_type(doc), None);
    }
}
